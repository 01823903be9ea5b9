//! Client for the Qanary orchestration service.
//!
//! One call starts one pipeline run: the question, its language and the
//! component list are form-posted to `/startquestionansweringwithtextquestion`,
//! and the service answers with the endpoint and graphs the run wrote into.
//! Runs are expensive and leave annotations behind, so nothing here retries.

use std::time::Duration;

use qanary_gerbil_shared::{
    GerbilError, InvocationDescriptor, PipelineConfig, Result, sparql_iri,
};
use reqwest::Client;
use tracing::{debug, info, instrument};
use url::Url;

/// Path of the orchestration service's synchronous execution endpoint.
const START_PATH: &str = "/startquestionansweringwithtextquestion";

/// User-Agent string for orchestration requests.
const USER_AGENT: &str = concat!("qanary-gerbil/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// PipelineClient
// ---------------------------------------------------------------------------

/// Synchronous-per-request client for the orchestration service.
#[derive(Debug, Clone)]
pub struct PipelineClient {
    client: Client,
    start_url: Url,
}

impl PipelineClient {
    /// Create a client from the `[pipeline]` config section.
    pub fn new(config: &PipelineConfig) -> Result<Self> {
        Self::with_timeout(config.base_url()?, config.timeout())
    }

    /// Create a client for the service at `base` with an explicit timeout.
    pub fn with_timeout(base: Url, timeout: Duration) -> Result<Self> {
        let mut start_url = base;
        start_url.set_path(START_PATH);

        Ok(Self {
            client: build_client(timeout)?,
            start_url,
        })
    }

    /// The URL runs are started at.
    pub fn start_url(&self) -> &Url {
        &self.start_url
    }

    /// Run the pipeline once and return where it stored its results.
    ///
    /// `components` is forwarded verbatim as the single `componentlist[]`
    /// value; the orchestration service splits it.
    #[instrument(skip_all, fields(language = %language, components = %components))]
    pub async fn run(
        &self,
        question: &str,
        language: &str,
        components: &str,
    ) -> Result<InvocationDescriptor> {
        info!("starting pipeline run");

        let response = self
            .client
            .post(self.start_url.clone())
            .form(&[
                ("question", question),
                ("language", language),
                ("componentlist[]", components),
            ])
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(GerbilError::InvalidPipelineResponse(format!(
                "orchestration service answered HTTP {status}"
            )));
        }

        let body = response.text().await.map_err(transport_error)?;
        let descriptor = parse_descriptor(&body)?;

        debug!(
            endpoint = %descriptor.endpoint,
            in_graph = %descriptor.in_graph,
            out_graph = %descriptor.out_graph,
            "pipeline run finished"
        );

        Ok(descriptor)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Build a reqwest client with appropriate settings.
fn build_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
        .map_err(|e| GerbilError::unreachable(format!("failed to build HTTP client: {e}")))
}

fn transport_error(e: reqwest::Error) -> GerbilError {
    if e.is_timeout() {
        GerbilError::timed_out(format!("orchestration call timed out: {e}"))
    } else {
        GerbilError::unreachable(format!("orchestration call failed: {e}"))
    }
}

/// Parse the orchestration response body into a run descriptor.
fn parse_descriptor(body: &str) -> Result<InvocationDescriptor> {
    let value: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| GerbilError::InvalidPipelineResponse(format!("body is not JSON: {e}")))?;

    if !value.is_object() {
        return Err(GerbilError::InvalidPipelineResponse(
            "body is not a JSON object".into(),
        ));
    }

    let descriptor: InvocationDescriptor = serde_json::from_value(value)
        .map_err(|e| GerbilError::InvalidPipelineResponse(e.to_string()))?;

    for (field, graph) in [("inGraph", &descriptor.in_graph), ("outGraph", &descriptor.out_graph)] {
        if let Err(c) = sparql_iri(graph) {
            return Err(GerbilError::InvalidPipelineResponse(format!(
                "{field} contains {c:?}, which cannot appear in a SPARQL IRI"
            )));
        }
    }

    Ok(descriptor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn descriptor_fixture() -> String {
        std::fs::read_to_string("../../../fixtures/json/pipeline-response.fixture.json")
            .expect("read pipeline fixture")
    }

    fn client_for(server: &MockServer, timeout: Duration) -> PipelineClient {
        let base = Url::parse(&server.uri()).unwrap();
        PipelineClient::with_timeout(base, timeout).unwrap()
    }

    #[test]
    fn start_url_replaces_base_path() {
        let base = Url::parse("http://qanary.example.org:8080/").unwrap();
        let client = PipelineClient::with_timeout(base, Duration::from_secs(5)).unwrap();
        assert_eq!(
            client.start_url().as_str(),
            "http://qanary.example.org:8080/startquestionansweringwithtextquestion"
        );
    }

    #[test]
    fn parse_descriptor_rejects_non_objects() {
        assert!(matches!(
            parse_descriptor("[1, 2]"),
            Err(GerbilError::InvalidPipelineResponse(_))
        ));
        assert!(matches!(
            parse_descriptor("<html>oops</html>"),
            Err(GerbilError::InvalidPipelineResponse(_))
        ));
    }

    #[test]
    fn parse_descriptor_rejects_non_uri_fields() {
        let body = r#"{"endpoint": 42, "inGraph": "urn:g", "outGraph": "urn:g"}"#;
        assert!(matches!(
            parse_descriptor(body),
            Err(GerbilError::InvalidPipelineResponse(_))
        ));
    }

    #[test]
    fn parse_descriptor_rejects_graphs_that_break_sparql_iris() {
        let body = r#"{
            "endpoint": "http://localhost:8890/sparql",
            "inGraph": "urn:graph:ok",
            "outGraph": "urn:graph:x> } # "
        }"#;
        match parse_descriptor(body) {
            Err(GerbilError::InvalidPipelineResponse(msg)) => assert!(msg.contains("outGraph")),
            other => panic!("expected InvalidPipelineResponse, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn run_posts_form_and_parses_descriptor() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(START_PATH))
            .and(header("content-type", "application/x-www-form-urlencoded"))
            .and(body_string_contains("question=Who+is+the+president+of+France%3F"))
            .and(body_string_contains("language=en"))
            .and(body_string_contains(
                "componentlist%5B%5D=wdaqua-core0%2C+QueryExecuter",
            ))
            .respond_with(ResponseTemplate::new(200).set_body_string(descriptor_fixture()))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, Duration::from_secs(5));
        let descriptor = client
            .run(
                "Who is the president of France?",
                "en",
                "wdaqua-core0, QueryExecuter",
            )
            .await
            .unwrap();

        assert_eq!(descriptor.endpoint.as_str(), "http://localhost:8890/sparql");
        assert_eq!(
            descriptor.out_graph.as_str(),
            "urn:graph:6ddc7aa5-2b9c-4c8e-9f39-4f5f0f6bb6f1"
        );
    }

    #[tokio::test]
    async fn missing_field_is_invalid_response() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(START_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"endpoint": "http://localhost:8890/sparql", "inGraph": "urn:g"}"#,
            ))
            .mount(&server)
            .await;

        let client = client_for(&server, Duration::from_secs(5));
        let err = client.run("q", "en", "A").await.unwrap_err();
        match err {
            GerbilError::InvalidPipelineResponse(msg) => assert!(msg.contains("outGraph")),
            other => panic!("expected InvalidPipelineResponse, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn server_error_is_invalid_response() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(START_PATH))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = client_for(&server, Duration::from_secs(5));
        let err = client.run("q", "en", "A").await.unwrap_err();
        assert!(matches!(err, GerbilError::InvalidPipelineResponse(_)));
    }

    #[tokio::test]
    async fn slow_pipeline_times_out() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(START_PATH))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(descriptor_fixture())
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let client = client_for(&server, Duration::from_millis(200));
        let err = client.run("q", "en", "A").await.unwrap_err();
        assert!(matches!(
            err,
            GerbilError::PipelineUnreachable {
                timed_out: true,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn closed_port_is_unreachable() {
        // Bind and release a port so nothing is listening on it.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        let base = Url::parse(&format!("http://127.0.0.1:{port}")).unwrap();

        let client = PipelineClient::with_timeout(base, Duration::from_secs(2)).unwrap();
        let err = client.run("q", "en", "A").await.unwrap_err();
        assert!(matches!(err, GerbilError::PipelineUnreachable { .. }));
    }
}
