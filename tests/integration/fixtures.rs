//! Shared source data and helpers

use std::collections::BTreeSet;
use std::sync::Arc;

use graft_core::{ChangeBatch, Changeset, DeltaTerm, DeltaTriple, Iri, Literal, Term, Triple, vocab};
use graft_distributor::model::*;
use graft_distributor::{Distributor, DistributorSettings, build_model, get_audience};
use graft_store::{GraphStore, MemoryStore};

pub const SOURCE: &str = "http://mu.semte.ch/graphs/organizations/kanselarij";
pub const MINISTER: &str = "http://mu.semte.ch/graphs/organizations/minister";
pub const TITLE: &str = "http://purl.org/dc/terms/title";

pub fn iri(value: &str) -> Iri {
    Iri::new(value)
}

pub fn fact(subject: &str, predicate: &str, object: &str) -> Triple {
    Triple::new(iri(subject), predicate, Term::iri(object))
}

pub fn typed(subject: &str, type_iri: &str) -> Triple {
    fact(subject, vocab::RDF_TYPE, type_iri)
}

pub fn titled(subject: &str, title: &str) -> Triple {
    Triple::new(iri(subject), TITLE, Literal::plain(title))
}

pub fn lineage(resource: &str, root: &str) -> Triple {
    fact(resource, vocab::LINEAGE, root)
}

/// An agenda `n` with one item, a treatment, a decision and a piece.
pub fn agenda(n: u32) -> Vec<Triple> {
    let agenda = format!("http://ex/agenda/{n}");
    let item = format!("http://ex/item/{n}");
    let treatment = format!("http://ex/treatment/{n}");
    let decision = format!("http://ex/decision/{n}");
    let piece = format!("http://ex/piece/{n}");
    vec![
        typed(&agenda, AGENDA),
        typed(&item, AGENDAITEM),
        fact(&agenda, HAS_PART, &item),
        titled(&item, &format!("Item {n}")),
        typed(&treatment, TREATMENT),
        fact(&treatment, SUBJECT, &item),
        typed(&decision, DECISION_ACTIVITY),
        fact(&treatment, HAS_DECISION, &decision),
        typed(&piece, PIECE),
        fact(&item, AGENDA_PIECE, &piece),
    ]
}

pub async fn store_with(triples: Vec<Triple>) -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    store.insert_triples(&iri(SOURCE), triples).await;
    store
}

pub fn minister(store: &Arc<MemoryStore>) -> Distributor {
    let model = build_model().unwrap();
    let audience = get_audience("minister", &model).unwrap();
    let store: Arc<dyn GraphStore> = store.clone();
    Distributor::new(store, &model, audience, DistributorSettings::new(SOURCE))
}

pub async fn view(store: &MemoryStore) -> BTreeSet<Triple> {
    store.triples(&iri(MINISTER)).await
}

pub fn inserts(triples: Vec<DeltaTriple>) -> ChangeBatch {
    ChangeBatch::new(vec![Changeset {
        inserts: triples,
        deletes: Vec::new(),
    }])
}

pub fn deletes(triples: Vec<DeltaTriple>) -> ChangeBatch {
    ChangeBatch::new(vec![Changeset {
        inserts: Vec::new(),
        deletes: triples,
    }])
}

pub fn link(subject: &str, predicate: &str, object: &str) -> DeltaTriple {
    DeltaTriple::new(subject, predicate, DeltaTerm::uri(object))
}
