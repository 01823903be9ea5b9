//! Read access to the triple store a pipeline run writes its annotations into.
//!
//! The [`ResultStore`] trait is the capability the artifact extractor is
//! given; [`SparqlResultStore`] implements it over the SPARQL 1.1 protocol
//! and [`StaticResultStore`] serves fixed artifacts for tests and dry runs.
//!
//! All accessors are read-only. The store serializes its own writes upstream.

mod queries;

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use qanary_gerbil_shared::{GerbilError, InvocationDescriptor, Result, StoreConfig};
use reqwest::Client;
use reqwest::header::ACCEPT;
use tracing::{debug, instrument};
use url::Url;

/// Media type of SPARQL SELECT results we ask the endpoint for.
const SPARQL_RESULTS_JSON: &str = "application/sparql-results+json";

/// User-Agent string for result-store requests.
const USER_AGENT: &str = concat!("qanary-gerbil/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// The four artifacts the adapter reads back from a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Accessor {
    Language,
    QuestionText,
    QueryText,
    AnswerPayload,
}

impl Accessor {
    /// Human-readable accessor name for tracing.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Language => "language",
            Self::QuestionText => "question_text",
            Self::QueryText => "query_text",
            Self::AnswerPayload => "answer_payload",
        }
    }
}

impl fmt::Display for Accessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read operations over one run's stored results.
///
/// `Ok(None)` means the run did not produce the artifact; `Err` means the
/// store could not be asked.
#[async_trait]
pub trait ResultStore: Send + Sync {
    /// Language annotated on the question.
    async fn language(&self, run: &InvocationDescriptor) -> Result<Option<String>>;

    /// Textual representation of the question.
    async fn question_text(&self, run: &InvocationDescriptor) -> Result<Option<String>>;

    /// SPARQL query generated by the pipeline.
    async fn query_text(&self, run: &InvocationDescriptor) -> Result<Option<String>>;

    /// JSON answer text generated by the pipeline.
    async fn answer_payload(&self, run: &InvocationDescriptor) -> Result<Option<String>>;
}

// ---------------------------------------------------------------------------
// SparqlResultStore
// ---------------------------------------------------------------------------

/// [`ResultStore`] backed by the SPARQL endpoint named in each descriptor.
#[derive(Debug, Clone)]
pub struct SparqlResultStore {
    client: Client,
}

impl SparqlResultStore {
    /// Create a store client from the `[store]` config section.
    pub fn new(config: &StoreConfig) -> Result<Self> {
        Self::with_timeout(config.timeout())
    }

    /// Create a store client whose every request is bounded by `timeout`.
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| GerbilError::ResultStore(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }

    /// Run a SELECT query and return the first value bound to `var`.
    async fn select_one(&self, endpoint: &Url, query: String, var: &str) -> Result<Option<String>> {
        let response = self
            .client
            .post(endpoint.clone())
            .header(ACCEPT, SPARQL_RESULTS_JSON)
            .form(&[("query", query)])
            .send()
            .await
            .map_err(store_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(GerbilError::ResultStore(format!(
                "SPARQL endpoint answered HTTP {status}"
            )));
        }

        let body = response.text().await.map_err(store_error)?;
        queries::first_binding(&body, var)
    }

    /// The question resource of the run, if one was stored.
    async fn question_uri(&self, run: &InvocationDescriptor) -> Result<Option<Url>> {
        let value = self
            .select_one(
                &run.endpoint,
                queries::question_resource(&run.in_graph)?,
                queries::QUESTION_VAR,
            )
            .await?;

        let Some(raw) = value else {
            return Ok(None);
        };
        let question = Url::parse(&raw).map_err(|e| {
            GerbilError::ResultStore(format!("question resource is not an IRI: {e}"))
        })?;
        queries::iri(&question)?;
        Ok(Some(question))
    }
}

#[async_trait]
impl ResultStore for SparqlResultStore {
    #[instrument(skip_all, fields(graph = %run.out_graph))]
    async fn language(&self, run: &InvocationDescriptor) -> Result<Option<String>> {
        let Some(question) = self.question_uri(run).await? else {
            return Ok(None);
        };
        self.select_one(
            &run.endpoint,
            queries::question_language(&run.out_graph, &question)?,
            queries::LANGUAGE_VAR,
        )
        .await
    }

    #[instrument(skip_all, fields(graph = %run.in_graph))]
    async fn question_text(&self, run: &InvocationDescriptor) -> Result<Option<String>> {
        let Some(question) = self.question_uri(run).await? else {
            return Ok(None);
        };

        let raw_url = raw_data_url(&question)?;
        debug!(%raw_url, "fetching raw question");

        let response = self.client.get(raw_url).send().await.map_err(store_error)?;
        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(GerbilError::ResultStore(format!(
                "question resource answered HTTP {status}"
            )));
        }

        let text = response.text().await.map_err(store_error)?;
        Ok(Some(text).filter(|t| !t.is_empty()))
    }

    #[instrument(skip_all, fields(graph = %run.out_graph))]
    async fn query_text(&self, run: &InvocationDescriptor) -> Result<Option<String>> {
        self.select_one(
            &run.endpoint,
            queries::generated_query(&run.out_graph)?,
            queries::SPARQL_VAR,
        )
        .await
    }

    #[instrument(skip_all, fields(graph = %run.out_graph))]
    async fn answer_payload(&self, run: &InvocationDescriptor) -> Result<Option<String>> {
        self.select_one(
            &run.endpoint,
            queries::answer_json(&run.out_graph)?,
            queries::JSON_VAR,
        )
        .await
    }
}

/// `<question>/raw`, where the stored question exposes its text.
fn raw_data_url(question: &Url) -> Result<Url> {
    let base = question.as_str().trim_end_matches('/');
    Url::parse(&format!("{base}/raw"))
        .map_err(|e| GerbilError::ResultStore(format!("invalid raw question URL: {e}")))
}

fn store_error(e: reqwest::Error) -> GerbilError {
    if e.is_timeout() {
        GerbilError::ResultStore(format!("result store query timed out: {e}"))
    } else {
        GerbilError::ResultStore(format!("result store query failed: {e}"))
    }
}

// ---------------------------------------------------------------------------
// StaticResultStore
// ---------------------------------------------------------------------------

type Lookup = std::result::Result<Option<String>, String>;

/// [`ResultStore`] that answers every run with the same fixed artifacts.
///
/// Unset artifacts are absent; [`StaticResultStore::failing`] makes an
/// accessor return a store error instead.
#[derive(Debug, Clone)]
pub struct StaticResultStore {
    language: Lookup,
    question_text: Lookup,
    query_text: Lookup,
    answer_payload: Lookup,
}

impl StaticResultStore {
    /// A store holding only the question text.
    pub fn new(question_text: impl Into<String>) -> Self {
        Self {
            language: Ok(None),
            question_text: Ok(Some(question_text.into())),
            query_text: Ok(None),
            answer_payload: Ok(None),
        }
    }

    /// A store in which the run left nothing behind.
    pub fn empty() -> Self {
        Self {
            question_text: Ok(None),
            ..Self::new("")
        }
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Ok(Some(language.into()));
        self
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query_text = Ok(Some(query.into()));
        self
    }

    pub fn with_answer(mut self, answer: impl Into<String>) -> Self {
        self.answer_payload = Ok(Some(answer.into()));
        self
    }

    /// Make `accessor` fail with a store error carrying `message`.
    pub fn failing(mut self, accessor: Accessor, message: impl Into<String>) -> Self {
        let failure = Err(message.into());
        match accessor {
            Accessor::Language => self.language = failure,
            Accessor::QuestionText => self.question_text = failure,
            Accessor::QueryText => self.query_text = failure,
            Accessor::AnswerPayload => self.answer_payload = failure,
        }
        self
    }

    fn lookup(value: &Lookup) -> Result<Option<String>> {
        value.clone().map_err(GerbilError::ResultStore)
    }
}

#[async_trait]
impl ResultStore for StaticResultStore {
    async fn language(&self, _run: &InvocationDescriptor) -> Result<Option<String>> {
        Self::lookup(&self.language)
    }

    async fn question_text(&self, _run: &InvocationDescriptor) -> Result<Option<String>> {
        Self::lookup(&self.question_text)
    }

    async fn query_text(&self, _run: &InvocationDescriptor) -> Result<Option<String>> {
        Self::lookup(&self.query_text)
    }

    async fn answer_payload(&self, _run: &InvocationDescriptor) -> Result<Option<String>> {
        Self::lookup(&self.answer_payload)
    }
}
