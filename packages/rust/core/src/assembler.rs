//! Maps a [`ResultRecord`] onto the GERBIL QA response document.

use qanary_gerbil_shared::{
    BenchmarkQuestion, BenchmarkResponse, QueryObject, QuestionString, ResultRecord,
};

/// Build the single-question response the harness expects.
///
/// ```text
/// {"questions":[{"question":[{"language":..,"string":..}],
///                "query":{"sparql":..},
///                "answers":[{..}]}]}
/// ```
pub fn assemble(record: ResultRecord) -> BenchmarkResponse {
    BenchmarkResponse {
        questions: vec![BenchmarkQuestion {
            question: vec![QuestionString {
                language: record.language,
                string: record.question_text,
            }],
            query: QueryObject {
                sparql: record.query_text,
            },
            answers: vec![record.answer],
        }],
    }
}
