//! Change notifications as delivered by the delta notifier

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::model::{Iri, Literal, Term, Triple};
use crate::vocab;

/// One term of a delta triple, in SPARQL JSON results shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeltaTerm {
    pub value: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datatype: Option<String>,
    #[serde(rename = "xml:lang", default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

impl DeltaTerm {
    pub fn uri(value: impl Into<String>) -> Self {
        DeltaTerm {
            value: value.into(),
            kind: Some("uri".to_string()),
            datatype: None,
            language: None,
        }
    }

    pub fn literal(value: impl Into<String>) -> Self {
        DeltaTerm {
            value: value.into(),
            kind: Some("literal".to_string()),
            datatype: None,
            language: None,
        }
    }

    /// True when the term names a resource rather than carrying a value.
    pub fn is_identifier(&self) -> bool {
        self.kind.as_deref() == Some("uri")
    }

    pub fn to_term(&self) -> Term {
        match self.kind.as_deref() {
            Some("uri") => Term::Iri(Iri::new(&self.value)),
            Some("bnode") => Term::BlankNode(self.value.clone()),
            _ => Term::Literal(Literal {
                value: self.value.clone(),
                datatype: self.datatype.as_deref().map(Iri::new),
                language: self.language.clone(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeltaTriple {
    pub subject: DeltaTerm,
    pub predicate: DeltaTerm,
    pub object: DeltaTerm,
}

impl DeltaTriple {
    pub fn new(subject: &str, predicate: &str, object: DeltaTerm) -> Self {
        DeltaTriple {
            subject: DeltaTerm::uri(subject),
            predicate: DeltaTerm::uri(predicate),
            object,
        }
    }

    pub fn to_triple(&self) -> Triple {
        let subject = match self.subject.kind.as_deref() {
            Some("bnode") => Term::BlankNode(self.subject.value.clone()),
            _ => Term::Iri(Iri::new(&self.subject.value)),
        };
        Triple {
            subject,
            predicate: Iri::new(&self.predicate.value),
            object: self.object.to_term(),
        }
    }

    fn subject_iri(&self) -> Option<Iri> {
        match self.subject.kind.as_deref() {
            Some("bnode") | Some("literal") | Some("typed-literal") => None,
            _ => Some(Iri::new(&self.subject.value)),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Changeset {
    #[serde(default)]
    pub inserts: Vec<DeltaTriple>,
    #[serde(default)]
    pub deletes: Vec<DeltaTriple>,
}

impl Changeset {
    pub fn triples(&self) -> impl Iterator<Item = &DeltaTriple> {
        self.inserts.iter().chain(self.deletes.iter())
    }

    pub fn is_empty(&self) -> bool {
        self.inserts.is_empty() && self.deletes.is_empty()
    }
}

/// The changesets delivered by one notification, in arrival order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChangeBatch {
    pub changesets: Vec<Changeset>,
}

impl ChangeBatch {
    pub fn new(changesets: Vec<Changeset>) -> Self {
        ChangeBatch { changesets }
    }

    pub fn triples(&self) -> impl Iterator<Item = &DeltaTriple> {
        self.changesets.iter().flat_map(Changeset::triples)
    }

    pub fn triple_count(&self) -> usize {
        self.changesets
            .iter()
            .map(|c| c.inserts.len() + c.deletes.len())
            .sum()
    }
}

/// Every subject identifier and every identifier-valued object mentioned by
/// the batches, inserts and deletes alike.
pub fn candidate_identifiers<'a>(
    batches: impl IntoIterator<Item = &'a ChangeBatch>,
) -> BTreeSet<Iri> {
    let mut candidates = BTreeSet::new();
    for triple in batches.into_iter().flat_map(ChangeBatch::triples) {
        if let Some(subject) = triple.subject_iri() {
            candidates.insert(subject);
        }
        if triple.object.is_identifier() {
            candidates.insert(Iri::new(&triple.object.value));
        }
    }
    candidates
}

/// Types asserted or retracted by `rdf:type` triples within the batches.
pub fn declared_types<'a>(
    batches: impl IntoIterator<Item = &'a ChangeBatch>,
) -> BTreeMap<Iri, BTreeSet<Iri>> {
    let mut types: BTreeMap<Iri, BTreeSet<Iri>> = BTreeMap::new();
    for triple in batches.into_iter().flat_map(ChangeBatch::triples) {
        if triple.predicate.value != vocab::RDF_TYPE || !triple.object.is_identifier() {
            continue;
        }
        if let Some(subject) = triple.subject_iri() {
            types
                .entry(subject)
                .or_default()
                .insert(Iri::new(&triple.object.value));
        }
    }
    types
}
