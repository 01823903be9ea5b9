//! SPARQL templates for the annotations Qanary components write, and the
//! `application/sparql-results+json` reader.
//!
//! IRIs are interpolated only after [`sparql_iri`] accepts them. Opaque URLs
//! like `urn:` can still carry `>` or braces after parsing.

use std::collections::HashMap;

use qanary_gerbil_shared::{GerbilError, Result, sparql_iri};
use serde::Deserialize;
use url::Url;

const PREFIXES: &str = "PREFIX qa: <http://www.wdaqua.eu/qa#>\n\
                        PREFIX oa: <http://www.w3.org/ns/openannotation/core/>\n\
                        PREFIX rdf: <http://www.w3.org/1999/02/22-rdf-syntax-ns#>\n";

/// Projected variable names, shared by the templates and the reader.
pub(crate) const QUESTION_VAR: &str = "question";
pub(crate) const LANGUAGE_VAR: &str = "lang";
pub(crate) const SPARQL_VAR: &str = "sparql";
pub(crate) const JSON_VAR: &str = "json";

/// `url` as IRIREF text, or a store error when it would escape its brackets.
pub(crate) fn iri(url: &Url) -> Result<&str> {
    sparql_iri(url).map_err(|c| {
        GerbilError::ResultStore(format!("{c:?} in <{url}> is not allowed in a SPARQL IRI"))
    })
}

/// The question resource of a run.
pub(crate) fn question_resource(in_graph: &Url) -> Result<String> {
    let in_graph = iri(in_graph)?;
    Ok(format!(
        "{PREFIXES}SELECT ?{QUESTION_VAR} FROM <{in_graph}> WHERE {{\n\
         \x20 ?{QUESTION_VAR} a qa:Question .\n\
         }}\n\
         LIMIT 1"
    ))
}

/// Language annotated on the question by a language-detection component.
pub(crate) fn question_language(out_graph: &Url, question: &Url) -> Result<String> {
    let out_graph = iri(out_graph)?;
    let question = iri(question)?;
    Ok(format!(
        "{PREFIXES}SELECT ?{LANGUAGE_VAR} FROM <{out_graph}> WHERE {{\n\
         \x20 ?annotation a qa:AnnotationOfQuestionLanguage ;\n\
         \x20   oa:hasTarget <{question}> ;\n\
         \x20   oa:hasBody ?{LANGUAGE_VAR} .\n\
         }}\n\
         LIMIT 1"
    ))
}

/// Best-scored SPARQL query produced by a query-builder component.
pub(crate) fn generated_query(out_graph: &Url) -> Result<String> {
    let out_graph = iri(out_graph)?;
    Ok(format!(
        "{PREFIXES}SELECT ?{SPARQL_VAR} FROM <{out_graph}> WHERE {{\n\
         \x20 ?annotation a qa:AnnotationOfAnswerSPARQL ;\n\
         \x20   oa:hasBody ?{SPARQL_VAR} .\n\
         \x20 OPTIONAL {{ ?annotation qa:score ?score . }}\n\
         }}\n\
         ORDER BY DESC(?score)\n\
         LIMIT 1"
    ))
}

/// JSON answer produced by a query-executor component.
pub(crate) fn answer_json(out_graph: &Url) -> Result<String> {
    let out_graph = iri(out_graph)?;
    Ok(format!(
        "{PREFIXES}SELECT ?{JSON_VAR} FROM <{out_graph}> WHERE {{\n\
         \x20 ?annotation a qa:AnnotationOfAnswerJSON ;\n\
         \x20   oa:hasBody ?body .\n\
         \x20 ?body rdf:value ?{JSON_VAR} .\n\
         }}\n\
         LIMIT 1"
    ))
}

// ---------------------------------------------------------------------------
// Result reader
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct SparqlResults {
    results: Bindings,
}

#[derive(Debug, Deserialize)]
struct Bindings {
    bindings: Vec<HashMap<String, Term>>,
}

#[derive(Debug, Deserialize)]
struct Term {
    value: String,
}

/// Value of `var` in the first solution, or `None` when there is none.
pub(crate) fn first_binding(body: &str, var: &str) -> Result<Option<String>> {
    let parsed: SparqlResults = serde_json::from_str(body)
        .map_err(|e| GerbilError::ResultStore(format!("unreadable SPARQL results: {e}")))?;

    Ok(parsed
        .results
        .bindings
        .into_iter()
        .next()
        .and_then(|mut row| row.remove(var))
        .map(|term| term.value))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph() -> Url {
        Url::parse("urn:graph:6ddc7aa5").unwrap()
    }

    #[test]
    fn templates_target_the_given_graph() {
        let question = Url::parse("http://localhost:8080/question/q1/").unwrap();
        assert!(question_resource(&graph()).unwrap().contains("FROM <urn:graph:6ddc7aa5>"));
        let lang = question_language(&graph(), &question).unwrap();
        assert!(lang.contains("oa:hasTarget <http://localhost:8080/question/q1/>"));
        assert!(generated_query(&graph()).unwrap().contains("ORDER BY DESC(?score)"));
        assert!(answer_json(&graph()).unwrap().contains("rdf:value ?json"));
    }

    #[test]
    fn templates_refuse_iris_that_close_the_bracket() {
        let hostile = Url::parse("urn:graph:x> } # ").unwrap();
        for query in [
            question_resource(&hostile),
            question_language(&graph(), &hostile),
            generated_query(&hostile),
            answer_json(&hostile),
        ] {
            assert!(matches!(query, Err(GerbilError::ResultStore(_))));
        }
    }

    #[test]
    fn first_binding_reads_value() {
        let body = std::fs::read_to_string("../../../fixtures/sparql/language.fixture.json")
            .expect("read language fixture");
        assert_eq!(first_binding(&body, LANGUAGE_VAR).unwrap(), Some("fr".into()));
    }

    #[test]
    fn first_binding_without_solutions_is_none() {
        let body = r#"{"head":{"vars":["sparql"]},"results":{"bindings":[]}}"#;
        assert_eq!(first_binding(body, SPARQL_VAR).unwrap(), None);
    }

    #[test]
    fn first_binding_with_unbound_variable_is_none() {
        let body = r#"{"head":{"vars":["sparql"]},"results":{"bindings":[{}]}}"#;
        assert_eq!(first_binding(body, SPARQL_VAR).unwrap(), None);
    }

    #[test]
    fn first_binding_rejects_non_results_documents() {
        let err = first_binding("<html/>", SPARQL_VAR).unwrap_err();
        assert!(matches!(err, GerbilError::ResultStore(_)));
    }
}
