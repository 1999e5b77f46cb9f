//! Pipeline runs against the minister audience

use std::collections::BTreeSet;
use std::sync::Arc;

use graft_core::{ChangeBatch, Changeset, Literal, Term, Triple, vocab};
use graft_distributor::model::*;
use graft_distributor::{ChangeReducer, Scope, build_model, find_scratch_graphs};
use graft_store::GraphStore;

use crate::fixtures::*;

#[tokio::test]
async fn test_root_and_child_are_published_then_removed() {
    let store = store_with(vec![
        typed("http://ex/R1", AGENDA),
        typed("http://ex/C1", AGENDAITEM),
        fact("http://ex/R1", HAS_PART, "http://ex/C1"),
        Triple::new(iri("http://ex/C1"), "http://ex/p", Literal::plain("v")),
    ])
    .await;
    let distributor = minister(&store);
    let scope = Scope::roots(["http://ex/R1"]);

    distributor.run(&scope).await.unwrap();
    let published = view(&store).await;
    for expected in [
        typed("http://ex/C1", AGENDAITEM),
        Triple::new(iri("http://ex/C1"), "http://ex/p", Literal::plain("v")),
        lineage("http://ex/C1", "http://ex/R1"),
        typed("http://ex/R1", AGENDA),
        lineage("http://ex/R1", "http://ex/R1"),
    ] {
        assert!(published.contains(&expected), "missing {}", expected);
    }

    store
        .remove_triples(&iri(SOURCE), [fact("http://ex/R1", HAS_PART, "http://ex/C1")])
        .await;
    let report = distributor.run(&scope).await.unwrap();

    let published = view(&store).await;
    let child = Term::iri("http://ex/C1");
    assert!(
        published
            .iter()
            .all(|triple| triple.subject != child && triple.object != child),
        "C1 still published: {:?}",
        published
    );
    assert_eq!(
        published,
        BTreeSet::from([typed("http://ex/R1", AGENDA), lineage("http://ex/R1", "http://ex/R1")])
    );
    assert!(report.triples_removed >= 4);
}

#[tokio::test]
async fn test_full_rebuild_over_empty_source_empties_the_view() {
    let store = store_with(agenda(1)).await;
    let distributor = minister(&store);
    distributor.run(&Scope::All).await.unwrap();
    assert!(!view(&store).await.is_empty());

    store.remove_triples(&iri(SOURCE), agenda(1)).await;
    distributor.run(&Scope::All).await.unwrap();

    assert!(view(&store).await.is_empty());
    assert!(find_scratch_graphs(store.as_ref()).await.unwrap().is_empty());
    assert!(
        store
            .graph_names()
            .await
            .iter()
            .all(|graph| !graph.as_str().starts_with(vocab::TEMP_GRAPH_BASE))
    );
}

#[tokio::test]
async fn test_every_published_subject_traces_to_a_source_root() {
    let mut triples = agenda(1);
    triples.extend(agenda(2));
    let store = store_with(triples).await;
    minister(&store).run(&Scope::All).await.unwrap();

    let published = view(&store).await;
    let source = store.triples(&iri(SOURCE)).await;
    let subjects: BTreeSet<_> = published.iter().map(|triple| triple.subject.clone()).collect();
    for subject in subjects {
        let traced = published.iter().any(|triple| {
            triple.subject == subject
                && triple.predicate.as_str() == vocab::LINEAGE
                && source.contains(&Triple::new(
                    triple.object.clone(),
                    vocab::RDF_TYPE,
                    iri(AGENDA),
                ))
        });
        assert!(traced, "{} has no lineage to a source agenda", subject);
    }
}

#[tokio::test]
async fn test_second_run_changes_nothing() {
    let mut triples = agenda(1);
    triples.extend(agenda(2));
    let store = store_with(triples).await;
    let distributor = minister(&store);

    distributor.run(&Scope::All).await.unwrap();
    let first = view(&store).await;

    let report = distributor.run(&Scope::All).await.unwrap();
    assert_eq!(report.triples_removed, 0);
    assert_eq!(view(&store).await, first);

    let report = distributor
        .run(&Scope::roots(["http://ex/agenda/1"]))
        .await
        .unwrap();
    assert_eq!(report.triples_removed, 0);
    assert_eq!(view(&store).await, first);
}

#[tokio::test]
async fn test_property_updates_replace_old_values() {
    let store = store_with(agenda(1)).await;
    let distributor = minister(&store);
    let scope = Scope::roots(["http://ex/agenda/1"]);
    distributor.run(&scope).await.unwrap();

    store
        .remove_triples(&iri(SOURCE), [titled("http://ex/item/1", "Item 1")])
        .await;
    store
        .insert_triples(&iri(SOURCE), [titled("http://ex/item/1", "Renamed")])
        .await;
    distributor.run(&scope).await.unwrap();

    let published = view(&store).await;
    assert!(published.contains(&titled("http://ex/item/1", "Renamed")));
    assert!(!published.contains(&titled("http://ex/item/1", "Item 1")));
}

#[tokio::test]
async fn test_incremental_run_leaves_other_agendas_alone() {
    let mut triples = agenda(1);
    triples.extend(agenda(2));
    let store = store_with(triples).await;
    let distributor = minister(&store);
    distributor.run(&Scope::All).await.unwrap();

    store
        .insert_triples(
            &iri(SOURCE),
            [fact("http://ex/agenda/1", AGENDA_STATUS, AGENDA_STATUS_DRAFT)],
        )
        .await;
    distributor
        .run(&Scope::roots(["http://ex/agenda/1"]))
        .await
        .unwrap();

    let published = view(&store).await;
    assert!(
        published
            .iter()
            .all(|triple| triple.subject != Term::iri("http://ex/item/1"))
    );
    assert!(published.contains(&lineage("http://ex/item/2", "http://ex/agenda/2")));
    assert!(published.contains(&titled("http://ex/item/2", "Item 2")));
}

#[tokio::test]
async fn test_shared_piece_survives_while_another_agenda_owns_it() {
    let mut triples = agenda(1);
    triples.extend(agenda(2));
    triples.push(fact("http://ex/item/2", AGENDA_PIECE, "http://ex/piece/1"));
    let store = store_with(triples).await;
    let distributor = minister(&store);
    distributor.run(&Scope::All).await.unwrap();
    assert!(view(&store).await.contains(&lineage("http://ex/piece/1", "http://ex/agenda/2")));

    store
        .insert_triples(
            &iri(SOURCE),
            [fact("http://ex/agenda/1", AGENDA_STATUS, AGENDA_STATUS_DRAFT)],
        )
        .await;
    distributor
        .run(&Scope::roots(["http://ex/agenda/1"]))
        .await
        .unwrap();

    let published = view(&store).await;
    assert!(published.contains(&typed("http://ex/piece/1", PIECE)));
    assert!(published.contains(&lineage("http://ex/piece/1", "http://ex/agenda/2")));
    assert!(!published.contains(&lineage("http://ex/piece/1", "http://ex/agenda/1")));
    assert!(!published.contains(&fact("http://ex/item/1", AGENDA_PIECE, "http://ex/piece/1")));
}

#[tokio::test]
async fn test_failed_run_is_torn_down_and_retried() {
    let store = store_with(agenda(1)).await;
    let distributor = minister(&store);

    // Marker and seed go through, the first collection step does not.
    store.fail_updates_after(2);
    let result = distributor.run(&Scope::All).await;
    assert!(result.is_err());
    assert!(find_scratch_graphs(store.as_ref()).await.unwrap().is_empty());
    assert!(view(&store).await.is_empty());

    store.heal();
    distributor.run(&Scope::All).await.unwrap();
    assert!(view(&store).await.contains(&lineage("http://ex/piece/1", "http://ex/agenda/1")));
}

#[tokio::test]
async fn test_affected_roots_ignore_delivery_order() {
    let mut triples = agenda(1);
    triples.extend(agenda(2));
    triples.extend(agenda(3));
    let store = store_with(triples).await;
    let dyn_store: Arc<dyn GraphStore> = store.clone();
    let reducer = ChangeReducer::new(dyn_store, Arc::new(build_model().unwrap()), iri(SOURCE), 2);

    let changes = vec![
        link("http://ex/treatment/1", HAS_DECISION, "http://ex/decision/1"),
        link("http://ex/item/3", AGENDA_PIECE, "http://ex/piece/3"),
        link("http://ex/unrelated", "http://ex/p", "http://ex/other"),
        link("http://ex/agenda/gone", vocab::RDF_TYPE, AGENDA),
    ];
    let forward = vec![inserts(changes[..2].to_vec()), deletes(changes[2..].to_vec())];
    let mut reversed_changes = changes.clone();
    reversed_changes.reverse();
    let backward = vec![
        deletes(vec![reversed_changes[0].clone()]),
        ChangeBatch::new(vec![
            Changeset {
                inserts: vec![reversed_changes[2].clone(), reversed_changes[3].clone()],
                deletes: Vec::new(),
            },
            Changeset {
                inserts: Vec::new(),
                deletes: vec![reversed_changes[1].clone()],
            },
        ]),
    ];

    let a = reducer.resolve_affected_roots(&forward).await.unwrap();
    let b = reducer.resolve_affected_roots(&backward).await.unwrap();
    assert_eq!(a, b);
    assert_eq!(
        a,
        BTreeSet::from([
            iri("http://ex/agenda/1"),
            iri("http://ex/agenda/3"),
            iri("http://ex/agenda/gone"),
        ])
    );
}
