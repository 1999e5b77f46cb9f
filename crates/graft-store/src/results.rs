//! Parsing of `application/sparql-results+json` bodies

use std::collections::HashMap;

use graft_core::{Iri, Literal, Term};
use serde::Deserialize;

use crate::error::StoreError;
use crate::query::{Solution, Var};

#[derive(Debug, Deserialize)]
struct SparqlResults {
    results: Option<ResultSet>,
}

#[derive(Debug, Deserialize)]
struct ResultSet {
    bindings: Vec<HashMap<String, RawTerm>>,
}

#[derive(Debug, Deserialize)]
struct RawTerm {
    #[serde(rename = "type")]
    kind: String,
    value: String,
    datatype: Option<String>,
    #[serde(rename = "xml:lang")]
    language: Option<String>,
}

impl RawTerm {
    fn into_term(self) -> Result<Term, StoreError> {
        match self.kind.as_str() {
            "uri" => Ok(Term::Iri(Iri::new(self.value))),
            "bnode" => Ok(Term::BlankNode(self.value)),
            "literal" | "typed-literal" => Ok(Term::Literal(Literal {
                value: self.value,
                datatype: self.datatype.map(Iri::new),
                language: self.language,
            })),
            other => Err(StoreError::MalformedResponse(format!(
                "unknown term type {:?}",
                other
            ))),
        }
    }
}

/// Parse a select response. A body that is not SPARQL JSON is an error.
pub fn parse_solutions(body: &str) -> Result<Vec<Solution>, StoreError> {
    let parsed: SparqlResults = serde_json::from_str(body)
        .map_err(|e| StoreError::MalformedResponse(e.to_string()))?;

    let Some(results) = parsed.results else {
        return Err(StoreError::MalformedResponse(
            "response has no results member".to_string(),
        ));
    };

    results
        .bindings
        .into_iter()
        .map(|row| {
            let mut solution = Solution::new();
            for (name, raw) in row {
                solution.insert(Var::new(name), raw.into_term()?);
            }
            Ok(solution)
        })
        .collect()
}
