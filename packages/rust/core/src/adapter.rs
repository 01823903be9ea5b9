//! The two operations the adapter exposes: endpoint generation and
//! benchmark execution.

use std::sync::Arc;

use qanary_gerbil_pipeline::PipelineClient;
use qanary_gerbil_shared::{AppConfig, BenchmarkResponse, GerbilError, Result};
use qanary_gerbil_triplestore::{ResultStore, SparqlResultStore};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::assembler::assemble;
use crate::endpoint::{EndpointBuilder, GeneratedEndpoint};
use crate::extractor::ArtifactExtractor;

/// Composes endpoint building, pipeline invocation, artifact extraction and
/// response assembly.
///
/// Holds no per-request state; one instance serves concurrent requests.
#[derive(Clone)]
pub struct GerbilAdapter {
    endpoints: EndpointBuilder,
    pipeline: PipelineClient,
    extractor: ArtifactExtractor,
}

impl GerbilAdapter {
    pub fn new(
        endpoints: EndpointBuilder,
        pipeline: PipelineClient,
        store: Arc<dyn ResultStore>,
    ) -> Self {
        Self {
            endpoints,
            pipeline,
            extractor: ArtifactExtractor::new(store),
        }
    }

    /// Wire the adapter against the configured orchestration service and
    /// the SPARQL result store.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let endpoints = EndpointBuilder::from_config(&config.pipeline)?;
        let pipeline = PipelineClient::new(&config.pipeline)?;
        let store = SparqlResultStore::new(&config.store)?;
        Ok(Self::new(endpoints, pipeline, Arc::new(store)))
    }

    /// Execution URL for `selection`, or the no-selection sentinel.
    /// Never touches the network.
    pub fn generate_endpoint<S: AsRef<str>>(&self, selection: &[S]) -> Result<GeneratedEndpoint> {
        self.endpoints.build(selection)
    }

    /// Run the pipeline once for `question` and report its artifacts.
    #[instrument(skip_all, fields(request_id = %Uuid::now_v7(), components = %components))]
    pub async fn execute_benchmark(
        &self,
        question: &str,
        language: &str,
        components: &str,
    ) -> Result<BenchmarkResponse> {
        if question.trim().is_empty() {
            return Err(GerbilError::validation("question must not be empty"));
        }
        if components.trim().is_empty() {
            return Err(GerbilError::validation("component list must not be empty"));
        }

        info!(question, language, "asked question");

        let run = self.pipeline.run(question, language, components).await?;
        let record = self.extractor.extract(&run).await?;
        Ok(assemble(record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use qanary_gerbil_triplestore::{Accessor, StaticResultStore};
    use url::Url;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const DESCRIPTOR: &str = r#"{
        "endpoint": "http://localhost:8890/sparql",
        "inGraph": "urn:graph:run-1",
        "outGraph": "urn:graph:run-1"
    }"#;

    async fn pipeline_server(body: &str, expected_calls: u64) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/startquestionansweringwithtextquestion"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .expect(expected_calls)
            .mount(&server)
            .await;
        server
    }

    fn adapter(server: &MockServer, store: StaticResultStore) -> GerbilAdapter {
        let base = Url::parse(&server.uri()).unwrap();
        let endpoints = EndpointBuilder::new(&server.uri(), base.port().unwrap()).unwrap();
        let pipeline = PipelineClient::with_timeout(base, Duration::from_secs(5)).unwrap();
        GerbilAdapter::new(endpoints, pipeline, Arc::new(store))
    }

    #[tokio::test]
    async fn documented_example_end_to_end() {
        let server = pipeline_server(DESCRIPTOR, 1).await;
        let store = StaticResultStore::new("Who is the president of France?")
            .with_query("SELECT ?x WHERE {...}")
            .with_answer(r#"{"x":"Emmanuel Macron"}"#);
        let adapter = adapter(&server, store);

        let endpoint = adapter
            .generate_endpoint(&["wdaqua-core0", "QueryExecuter"])
            .unwrap();
        match &endpoint {
            GeneratedEndpoint::Url(url) => {
                assert_eq!(url.path(), "/gerbil-execute/wdaqua-core0,%20QueryExecuter/")
            }
            GeneratedEndpoint::NoSelection => panic!("expected a URL"),
        }

        let response = adapter
            .execute_benchmark(
                "Who is the president of France?",
                "en",
                "wdaqua-core0, QueryExecuter",
            )
            .await
            .unwrap();

        assert_eq!(
            serde_json::to_string(&response).unwrap(),
            r#"{"questions":[{"question":[{"language":"en","string":"Who is the president of France?"}],"query":{"sparql":"SELECT ?x WHERE {...}"},"answers":[{"x":"Emmanuel Macron"}]}]}"#
        );
    }

    #[tokio::test]
    async fn generate_endpoint_without_selection() {
        let server = pipeline_server(DESCRIPTOR, 0).await;
        let adapter = adapter(&server, StaticResultStore::new("q"));
        let endpoint = adapter.generate_endpoint::<String>(&[]).unwrap();
        assert_eq!(endpoint.to_string(), "Select components!");
    }

    #[tokio::test]
    async fn empty_question_never_reaches_pipeline() {
        let server = pipeline_server(DESCRIPTOR, 0).await;
        let adapter = adapter(&server, StaticResultStore::new("q"));
        let err = adapter.execute_benchmark("  ", "en", "A").await.unwrap_err();
        assert!(err.is_client_error());
    }

    #[tokio::test]
    async fn malformed_answer_fails_the_request() {
        let server = pipeline_server(DESCRIPTOR, 1).await;
        let adapter = adapter(&server, StaticResultStore::new("q").with_answer("{oops"));
        let err = adapter.execute_benchmark("q", "en", "A").await.unwrap_err();
        assert!(matches!(err, GerbilError::MalformedAnswerPayload(_)));
    }

    #[tokio::test]
    async fn language_failure_still_answers() {
        let server = pipeline_server(DESCRIPTOR, 1).await;
        let store = StaticResultStore::new("q").failing(Accessor::Language, "no annotation graph");
        let response = adapter(&server, store)
            .execute_benchmark("q", "fr", "A")
            .await
            .unwrap();
        assert_eq!(response.questions[0].question[0].language, "en");
    }

    #[tokio::test]
    async fn invalid_pipeline_response_is_not_retried() {
        let server = pipeline_server("{}", 1).await;
        let adapter = adapter(&server, StaticResultStore::new("q"));
        let err = adapter.execute_benchmark("q", "en", "A").await.unwrap_err();
        assert!(matches!(err, GerbilError::InvalidPipelineResponse(_)));
    }
}
