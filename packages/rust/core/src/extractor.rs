//! Artifact extraction: read a finished run's outputs back from the result store.
//!
//! Lookups happen in a fixed order: language, question text, query text,
//! answer payload. Only the language lookup recovers from failure.

use std::sync::Arc;

use qanary_gerbil_shared::{
    DEFAULT_LANGUAGE, GerbilError, InvocationDescriptor, Result, ResultRecord,
};
use qanary_gerbil_triplestore::ResultStore;
use serde_json::{Map, Value};
use tracing::{debug, instrument, warn};

/// Pulls the four benchmark artifacts of a run out of a [`ResultStore`].
#[derive(Clone)]
pub struct ArtifactExtractor {
    store: Arc<dyn ResultStore>,
}

impl ArtifactExtractor {
    pub fn new(store: Arc<dyn ResultStore>) -> Self {
        Self { store }
    }

    /// Build the result record for `run`.
    #[instrument(skip_all, fields(out_graph = %run.out_graph))]
    pub async fn extract(&self, run: &InvocationDescriptor) -> Result<ResultRecord> {
        let language = resolve_language(self.annotated_language(run).await);

        let question_text = match self.store.question_text(run).await {
            Ok(Some(text)) if !text.is_empty() => text,
            Ok(_) => {
                return Err(GerbilError::MissingQuestionText(
                    "run has no textual representation of the question".into(),
                ));
            }
            Err(e) => return Err(GerbilError::MissingQuestionText(e.to_string())),
        };

        let query_text = self.store.query_text(run).await?.unwrap_or_default();
        let answer = parse_answer(self.store.answer_payload(run).await?.as_deref())?;

        debug!(
            %language,
            has_query = !query_text.is_empty(),
            has_answer = !answer.is_empty(),
            "artifacts extracted"
        );

        Ok(ResultRecord {
            language,
            question_text,
            query_text,
            answer,
        })
    }

    /// Annotated language, or `None` when it is missing or unreadable.
    async fn annotated_language(&self, run: &InvocationDescriptor) -> Option<String> {
        match self.store.language(run).await {
            Ok(language) => language,
            Err(e) => {
                warn!(error = %e, "could not retrieve language, using \"{DEFAULT_LANGUAGE}\"");
                None
            }
        }
    }
}

/// Apply the `"en"` fallback to an absent or empty annotated language.
pub fn resolve_language(annotated: Option<String>) -> String {
    annotated
        .filter(|lang| !lang.is_empty())
        .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string())
}

/// Parse a stored answer: absent or empty means `{}`, anything else must be
/// a JSON object. Numbers keep their literal text (`arbitrary_precision`).
pub fn parse_answer(payload: Option<&str>) -> Result<Map<String, Value>> {
    let Some(payload) = payload.filter(|p| !p.is_empty()) else {
        return Ok(Map::new());
    };

    match serde_json::from_str(payload) {
        Ok(Value::Object(answer)) => Ok(answer),
        Ok(other) => Err(GerbilError::MalformedAnswerPayload(format!(
            "expected a JSON object, found {}",
            json_kind(&other)
        ))),
        Err(e) => Err(GerbilError::MalformedAnswerPayload(e.to_string())),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
