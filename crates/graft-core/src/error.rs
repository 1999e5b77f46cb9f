//! Error types for model and configuration loading

use std::path::PathBuf;

use thiserror::Error;

use crate::model::Iri;

/// Invalid path model declarations. Always fatal at startup.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModelError {
    #[error("type {type_iri} declares parent {parent}, which is neither declared nor the root type")]
    UndeclaredParent { type_iri: Iri, parent: Iri },

    #[error("type declarations form a cycle through {type_iri}")]
    Cycle { type_iri: Iri },

    #[error("root type {0} must not declare segments")]
    RootHasSegments(Iri),

    #[error("type {0} declares an empty segment")]
    EmptySegment(Iri),

    #[error("no segment declared from {child} to {parent}")]
    MissingSegment { child: Iri, parent: Iri },
}

/// Problems reading or validating the service configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value {value:?} for environment variable {key}")]
    InvalidEnv { key: String, value: String },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// An error followed by each of its sources, `: `-separated.
pub fn error_chain(error: &dyn std::error::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
