//! Startup: scratch graph recovery and configured initial syncs

use std::io::Write;
use std::sync::Arc;

use graft_core::{SyncConfig, vocab};
use graft_distributor::{ScratchGraph, SyncService, find_scratch_graphs};
use graft_store::GraphStore;

use crate::fixtures::*;

const CONFIG: &str = r#"
sparql_endpoint = "memory:"
source_graph = "http://mu.semte.ch/graphs/organizations/kanselarij"
audiences = ["minister", "public"]
batch_size = 50

[[startup]]
audience = "minister"

[[startup]]
audience = "public"
roots = ["http://ex/agenda/1"]
"#;

fn config_file() -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(CONFIG.as_bytes()).unwrap();
    file
}

async fn leave_scratch_graph(store: &graft_store::MemoryStore) -> ScratchGraph {
    let scratch = ScratchGraph::generate();
    store
        .insert_triples(
            scratch.iri(),
            [
                fact(scratch.iri().as_str(), vocab::RDF_TYPE, vocab::TEMP_GRAPH),
                lineage("http://ex/item/1", "http://ex/agenda/1"),
            ],
        )
        .await;
    store
        .insert_triples(scratch.ledger(), [lineage("http://ex/item/1", "http://ex/agenda/1")])
        .await;
    scratch
}

#[test]
fn test_config_file_is_loaded_and_valid() {
    let file = config_file();
    let config = SyncConfig::from_file(file.path()).unwrap();
    config.validate().unwrap();

    assert_eq!(config.audiences, ["minister", "public"]);
    assert_eq!(config.batch_size, 50);
    assert_eq!(config.startup.len(), 2);
    assert_eq!(config.startup[0].roots, None);
    assert_eq!(
        config.startup[1].roots.as_deref(),
        Some(&["http://ex/agenda/1".to_string()][..])
    );
}

#[tokio::test]
async fn test_startup_recovers_scratch_graphs_then_syncs() {
    let store = store_with(agenda(1)).await;
    let leftover = leave_scratch_graph(&store).await;
    let config = SyncConfig::from_file(config_file().path()).unwrap();

    let dyn_store: Arc<dyn GraphStore> = store.clone();
    let service = SyncService::from_config(dyn_store, &config).unwrap();
    service.startup(true, &config.startup).await.unwrap();

    let graphs = store.graph_names().await;
    assert!(!graphs.contains(leftover.iri()));
    assert!(!graphs.contains(leftover.ledger()));
    assert!(find_scratch_graphs(store.as_ref()).await.unwrap().is_empty());
    assert!(view(&store).await.contains(&lineage("http://ex/item/1", "http://ex/agenda/1")));
}

#[tokio::test]
async fn test_startup_can_skip_scratch_recovery() {
    let store = store_with(agenda(1)).await;
    let leftover = leave_scratch_graph(&store).await;
    let dyn_store: Arc<dyn GraphStore> = store.clone();
    let config = SyncConfig {
        source_graph: SOURCE.to_string(),
        ..Default::default()
    };
    let service = SyncService::from_config(dyn_store, &config).unwrap();

    service.startup(false, &[]).await.unwrap();

    let found = find_scratch_graphs(store.as_ref()).await.unwrap();
    assert_eq!(found, vec![leftover]);
}
