//! Core domain types shared between the pipeline client, the result store
//! and the benchmark response assembler.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use url::Url;

/// Language reported when the result store has no usable annotation.
pub const DEFAULT_LANGUAGE: &str = "en";

// ---------------------------------------------------------------------------
// InvocationDescriptor
// ---------------------------------------------------------------------------

/// Where one completed pipeline run wrote its results.
///
/// Returned by the orchestration service; owned by the request that started
/// the run and never reused across requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvocationDescriptor {
    /// SPARQL endpoint of the result store.
    pub endpoint: Url,
    /// Named graph holding the run's input annotations.
    pub in_graph: Url,
    /// Named graph holding the run's output annotations.
    pub out_graph: Url,
}

/// Check that `iri` can be written between `<` and `>` in a SPARQL query.
///
/// Opaque URLs such as `urn:` keep `>`, spaces and braces unescaped, so a
/// parsed [`Url`] alone is not enough. Returns the first character the
/// `IRIREF` production forbids.
pub fn sparql_iri(iri: &Url) -> std::result::Result<&str, char> {
    let text = iri.as_str();
    match text.chars().find(|&c| {
        matches!(c, '<' | '>' | '"' | '{' | '}' | '|' | '^' | '`' | '\\')
            || c.is_whitespace()
            || c.is_control()
    }) {
        Some(c) => Err(c),
        None => Ok(text),
    }
}

// ---------------------------------------------------------------------------
// ResultRecord
// ---------------------------------------------------------------------------

/// Artifacts extracted from the result store for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultRecord {
    /// Language of the question, already defaulted.
    pub language: String,
    /// Textual representation of the question.
    pub question_text: String,
    /// Generated SPARQL query, empty when no component produced one.
    pub query_text: String,
    /// Parsed answer object, empty when no component produced one.
    pub answer: Map<String, Value>,
}

// ---------------------------------------------------------------------------
// BenchmarkResponse
// ---------------------------------------------------------------------------

/// Top-level document returned to the benchmarking harness.
///
/// Field declaration order is the serialization order the harness expects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkResponse {
    pub questions: Vec<BenchmarkQuestion>,
}

/// One answered question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkQuestion {
    pub question: Vec<QuestionString>,
    pub query: QueryObject,
    pub answers: Vec<Map<String, Value>>,
}

/// A question in one language.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionString {
    /// ISO 639-1 language tag.
    pub language: String,
    pub string: String,
}

/// The generated query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryObject {
    pub sparql: String,
}
