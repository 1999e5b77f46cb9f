//! Core data structures for graph terms

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::vocab;

/// An absolute IRI identifying a resource, predicate, type or graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Iri(String);

impl Iri {
    pub fn new(value: impl Into<String>) -> Self {
        Iri(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Derive a sibling IRI by appending a path suffix.
    pub fn join(&self, suffix: &str) -> Iri {
        Iri(format!("{}/{}", self.0.trim_end_matches('/'), suffix))
    }
}

impl fmt::Display for Iri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Iri {
    fn from(value: &str) -> Self {
        Iri::new(value)
    }
}

impl From<String> for Iri {
    fn from(value: String) -> Self {
        Iri(value)
    }
}

impl From<&Iri> for Iri {
    fn from(value: &Iri) -> Self {
        value.clone()
    }
}

/// A literal value with an optional datatype or language tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Literal {
    pub value: String,
    pub datatype: Option<Iri>,
    pub language: Option<String>,
}

impl Literal {
    pub fn plain(value: impl Into<String>) -> Self {
        Literal {
            value: value.into(),
            datatype: None,
            language: None,
        }
    }

    pub fn typed(value: impl Into<String>, datatype: impl Into<Iri>) -> Self {
        Literal {
            value: value.into(),
            datatype: Some(datatype.into()),
            language: None,
        }
    }

    pub fn tagged(value: impl Into<String>, language: impl Into<String>) -> Self {
        Literal {
            value: value.into(),
            datatype: None,
            language: Some(language.into()),
        }
    }

    pub fn integer(value: i64) -> Self {
        Literal::typed(value.to_string(), vocab::XSD_INTEGER)
    }

    pub fn boolean(value: bool) -> Self {
        Literal::typed(value.to_string(), vocab::XSD_BOOLEAN)
    }

    /// Parse the lexical form as an integer, whatever the declared datatype.
    pub fn as_integer(&self) -> Option<i64> {
        self.value.trim().parse().ok()
    }
}

/// Any term that can appear in a triple.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Term {
    Iri(Iri),
    Literal(Literal),
    BlankNode(String),
}

impl Term {
    pub fn iri(value: impl Into<Iri>) -> Self {
        Term::Iri(value.into())
    }

    pub fn literal(value: impl Into<String>) -> Self {
        Term::Literal(Literal::plain(value))
    }

    pub fn as_iri(&self) -> Option<&Iri> {
        match self {
            Term::Iri(iri) => Some(iri),
            _ => None,
        }
    }

    pub fn as_literal(&self) -> Option<&Literal> {
        match self {
            Term::Literal(literal) => Some(literal),
            _ => None,
        }
    }

    pub fn is_iri(&self) -> bool {
        matches!(self, Term::Iri(_))
    }
}

impl From<Iri> for Term {
    fn from(value: Iri) -> Self {
        Term::Iri(value)
    }
}

impl From<&Iri> for Term {
    fn from(value: &Iri) -> Self {
        Term::Iri(value.clone())
    }
}

impl From<Literal> for Term {
    fn from(value: Literal) -> Self {
        Term::Literal(value)
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Iri(iri) => write!(f, "<{}>", iri),
            Term::BlankNode(id) => write!(f, "_:{}", id),
            Term::Literal(literal) => {
                write!(f, "\"{}\"", literal.value)?;
                if let Some(language) = &literal.language {
                    write!(f, "@{}", language)
                } else if let Some(datatype) = &literal.datatype {
                    write!(f, "^^<{}>", datatype)
                } else {
                    Ok(())
                }
            }
        }
    }
}

/// A single fact. Predicates are always IRIs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Triple {
    pub subject: Term,
    pub predicate: Iri,
    pub object: Term,
}

impl Triple {
    pub fn new(
        subject: impl Into<Term>,
        predicate: impl Into<Iri>,
        object: impl Into<Term>,
    ) -> Self {
        Triple {
            subject: subject.into(),
            predicate: predicate.into(),
            object: object.into(),
        }
    }
}

impl fmt::Display for Triple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <{}> {}", self.subject, self.predicate, self.object)
    }
}
