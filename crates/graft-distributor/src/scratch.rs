//! Scratch graphs: per-run staging areas and their recovery after a crash

use chrono::{DateTime, SecondsFormat, Utc};
use graft_core::{Iri, Literal, Term, Triple, vocab};
use graft_store::{GraphStore, Pattern, Privilege, Select, StoreError, Update, Var, select_iris};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::Result;

/// A uniquely named staging graph plus the ledger of triples already
/// committed from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScratchGraph {
    iri: Iri,
    ledger: Iri,
}

impl ScratchGraph {
    pub fn generate() -> Self {
        Self::from_iri(Iri::new(format!("{}{}", vocab::TEMP_GRAPH_BASE, Uuid::new_v4())))
    }

    pub fn from_iri(iri: Iri) -> Self {
        let ledger = iri.join("committed");
        Self { iri, ledger }
    }

    pub fn iri(&self) -> &Iri {
        &self.iri
    }

    pub fn ledger(&self) -> &Iri {
        &self.ledger
    }

    /// The facts that mark this graph as scratch space.
    pub fn marker(&self, created: DateTime<Utc>) -> Vec<Triple> {
        vec![
            Triple::new(self.iri.clone(), vocab::RDF_TYPE, Term::iri(vocab::TEMP_GRAPH)),
            Triple::new(
                self.iri.clone(),
                vocab::DCT_CREATED,
                Literal::typed(
                    created.to_rfc3339_opts(SecondsFormat::Millis, true),
                    vocab::XSD_DATE_TIME,
                ),
            ),
        ]
    }

    /// Drop the scratch graph and its ledger.
    pub async fn drop_all(&self, store: &dyn GraphStore) -> std::result::Result<(), StoreError> {
        store.update(&Update::drop_graph(&self.iri), Privilege::Sudo).await?;
        store.update(&Update::drop_graph(&self.ledger), Privilege::Sudo).await
    }
}

/// Every graph that describes itself as scratch space.
pub async fn find_scratch_graphs(store: &dyn GraphStore) -> Result<Vec<ScratchGraph>> {
    let g = Var::new("g");
    let query = Select::vars([&g]).distinct().pattern(Pattern::graph(
        &g,
        vec![Pattern::triple(&g, vocab::RDF_TYPE, Iri::new(vocab::TEMP_GRAPH))],
    ));
    let graphs = select_iris(store, &query, &g, Privilege::Sudo).await?;
    Ok(graphs.into_iter().map(ScratchGraph::from_iri).collect())
}

/// Drop scratch graphs left behind by runs that never reached teardown.
/// Returns how many were dropped.
pub async fn reconcile_orphaned_scratch_graphs(store: &dyn GraphStore) -> Result<usize> {
    let orphans = find_scratch_graphs(store).await?;
    if orphans.is_empty() {
        info!("No orphaned scratch graphs found");
        return Ok(0);
    }

    for scratch in &orphans {
        warn!("Dropping orphaned scratch graph {}", scratch.iri());
        scratch.drop_all(store).await?;
    }
    info!("Dropped {} orphaned scratch graphs", orphans.len());
    Ok(orphans.len())
}
