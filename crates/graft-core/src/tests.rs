//! Unit tests for graft-core

use crate::*;
use std::sync::Arc;

const ROOT: &str = "http://ex/Agenda";
const ITEM: &str = "http://ex/Item";
const PIECE: &str = "http://ex/Piece";
const FILE: &str = "http://ex/File";

fn sample_model() -> PathModel {
    PathModel::new(
        ROOT,
        vec![
            TypeSegment::new(ITEM, PropertyPath::inverse_of("http://ex/hasPart"), ROOT),
            TypeSegment::new(PIECE, PropertyPath::inverse_of("http://ex/agendaPiece"), ITEM),
            TypeSegment::direct(PIECE, PropertyPath::predicate("http://ex/directAgenda")),
            TypeSegment::new(FILE, PropertyPath::inverse_of("http://ex/value"), PIECE),
        ],
    )
    .unwrap()
}

#[test]
fn test_root_compiles_to_identity() {
    let model = sample_model();
    let resolution = model.compile(&Iri::new(ROOT));
    assert_eq!(resolution, Resolution::Relevant(Arc::new(vec![CompiledPath::identity()])));
    assert!(resolution.paths()[0].is_identity());
}

#[test]
fn test_unconfigured_type_is_not_relevant() {
    let model = sample_model();
    assert_eq!(model.compile(&Iri::new("http://ex/Unknown")), Resolution::NotRelevant);
    assert!(model.compile(&Iri::new("http://ex/Unknown")).paths().is_empty());
}

#[test]
fn test_recursive_compilation_unions_alternatives() {
    let model = sample_model();
    let resolution = model.compile(&Iri::new(FILE));
    let rendered: Vec<String> = resolution.paths().iter().map(|p| p.to_string()).collect();

    insta::assert_debug_snapshot!(rendered, @r#"
    [
        "^<http://ex/value>/^<http://ex/agendaPiece>/^<http://ex/hasPart>",
        "^<http://ex/value>/<http://ex/directAgenda>",
    ]
    "#);
}

#[test]
fn test_compilation_is_memoized() {
    let model = sample_model();
    let Resolution::Relevant(first) = model.compile(&Iri::new(PIECE)) else {
        panic!("piece should be relevant");
    };
    let Resolution::Relevant(second) = model.compile(&Iri::new(PIECE)) else {
        panic!("piece should be relevant");
    };
    assert!(Arc::ptr_eq(&first, &second));
}

#[test]
fn test_cycle_fails_at_build_time() {
    let result = PathModel::new(
        ROOT,
        vec![
            TypeSegment::new("http://ex/A", PropertyPath::predicate("http://ex/p"), "http://ex/B"),
            TypeSegment::new("http://ex/B", PropertyPath::predicate("http://ex/q"), "http://ex/A"),
        ],
    );
    assert!(matches!(result, Err(ModelError::Cycle { .. })));
}

#[test]
fn test_undeclared_parent_fails_at_build_time() {
    let result = PathModel::new(
        ROOT,
        vec![TypeSegment::new(ITEM, PropertyPath::predicate("http://ex/p"), "http://ex/Missing")],
    );
    assert_eq!(
        result.unwrap_err(),
        ModelError::UndeclaredParent {
            type_iri: Iri::new(ITEM),
            parent: Iri::new("http://ex/Missing"),
        }
    );
}

#[test]
fn test_root_segments_and_empty_segments_are_rejected() {
    let root_segment = PathModel::new(
        ROOT,
        vec![TypeSegment::direct(ROOT, PropertyPath::predicate("http://ex/p"))],
    );
    assert!(matches!(root_segment, Err(ModelError::RootHasSegments(_))));

    let empty = PathModel::new(
        ROOT,
        vec![TypeSegment::direct(ITEM, PropertyPath::Sequence(vec![]))],
    );
    assert!(matches!(empty, Err(ModelError::EmptySegment(_))));
}

#[test]
fn test_segment_between_merges_declarations() {
    let model = sample_model();
    assert_eq!(
        model.segment_between(&Iri::new(PIECE), &Iri::new(ITEM)),
        Some(PropertyPath::inverse_of("http://ex/agendaPiece"))
    );
    assert_eq!(
        model.segment_between(&Iri::new(PIECE), &Iri::new(ROOT)),
        Some(PropertyPath::predicate("http://ex/directAgenda"))
    );
    assert_eq!(model.segment_between(&Iri::new(FILE), &Iri::new(ITEM)), None);
}

#[test]
fn test_delta_parsing_and_candidates() {
    let body = r#"[
        {
            "inserts": [
                {"subject": {"type": "uri", "value": "http://ex/c1"},
                 "predicate": {"type": "uri", "value": "http://ex/p"},
                 "object": {"type": "literal", "value": "v"}},
                {"subject": {"type": "uri", "value": "http://ex/c1"},
                 "predicate": {"type": "uri", "value": "http://www.w3.org/1999/02/22-rdf-syntax-ns#type"},
                 "object": {"type": "uri", "value": "http://ex/Item"}}
            ],
            "deletes": [
                {"subject": {"type": "uri", "value": "http://ex/c2"},
                 "predicate": {"type": "uri", "value": "http://ex/rel"},
                 "object": {"type": "uri", "value": "http://ex/r1"}}
            ]
        }
    ]"#;
    let batch: ChangeBatch = serde_json::from_str(body).unwrap();
    assert_eq!(batch.triple_count(), 3);

    let candidates: Vec<String> = candidate_identifiers([&batch])
        .into_iter()
        .map(|iri| iri.to_string())
        .collect();
    assert_eq!(
        candidates,
        vec!["http://ex/Item", "http://ex/c1", "http://ex/c2", "http://ex/r1"]
    );

    let types = declared_types([&batch]);
    assert_eq!(types.len(), 1);
    assert!(types[&Iri::new("http://ex/c1")].contains(&Iri::new(ITEM)));
}

#[test]
fn test_delta_literal_terms_keep_datatype_and_language() {
    let term = DeltaTerm {
        value: "hallo".to_string(),
        kind: Some("literal".to_string()),
        datatype: None,
        language: Some("nl".to_string()),
    };
    assert_eq!(term.to_term(), Term::Literal(Literal::tagged("hallo", "nl")));
    assert!(!term.is_identifier());
}

#[test]
fn test_config_layers() {
    let mut config = SyncConfig::from_toml_str(
        r#"
        interval_ms = 2500
        audiences = ["public"]

        [[startup]]
        audience = "public"
        "#,
    )
    .unwrap();
    assert_eq!(config.interval_ms, 2500);
    assert_eq!(config.batch_size, SyncConfig::default().batch_size);
    assert_eq!(config.startup[0].roots, None);

    config
        .apply_env_from(|key| match key {
            "GRAFT_BATCH_SIZE" => Some("50".to_string()),
            "GRAFT_KEEP_SCRATCH_GRAPHS" => Some("yes".to_string()),
            _ => None,
        })
        .unwrap();
    assert_eq!(config.batch_size, 50);
    assert!(config.keep_scratch_graphs);
    assert!(config.validate().is_ok());
}

#[test]
fn test_config_rejects_bad_values() {
    let mut config = SyncConfig::default();
    let err = config
        .apply_env_from(|key| (key == "GRAFT_INTERVAL_MS").then(|| "soon".to_string()))
        .unwrap_err();
    assert!(matches!(err, ConfigError::InvalidEnv { .. }));

    let config = SyncConfig {
        batch_size: 0,
        ..SyncConfig::default()
    };
    assert!(config.validate().is_err());

    let config = SyncConfig {
        audiences: vec!["public".to_string()],
        startup: vec![StartupSync {
            audience: "minister".to_string(),
            roots: None,
        }],
        ..SyncConfig::default()
    };
    assert!(config.validate().is_err());

    let config = SyncConfig {
        audiences: vec!["press".to_string()],
        ..SyncConfig::default()
    };
    assert!(config.validate().is_err());
}

#[test]
fn test_config_from_file() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("graft.toml");
    std::fs::write(&path, "batch_size = 42\nport = 8080\n").unwrap();

    let config = SyncConfig::from_file(&path).unwrap();
    assert_eq!(config.batch_size, 42);
    assert_eq!(config.port, 8080);

    let missing = SyncConfig::from_file(&dir.path().join("missing.toml"));
    assert!(matches!(missing, Err(ConfigError::Io { .. })));
}
