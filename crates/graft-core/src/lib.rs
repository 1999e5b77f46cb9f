//! Graft Core: graph terms, property paths, the path model and configuration

pub mod config;
pub mod delta;
pub mod error;
pub mod model;
pub mod path;
pub mod path_model;
pub mod vocab;

#[cfg(test)]
pub mod tests;

pub use config::{StartupSync, SyncConfig};
pub use delta::{
    ChangeBatch, Changeset, DeltaTerm, DeltaTriple, candidate_identifiers, declared_types,
};
pub use error::{ConfigError, ModelError, error_chain};
pub use model::{Iri, Literal, Term, Triple};
pub use path::PropertyPath;
pub use path_model::{CompiledPath, PathModel, Resolution, TypeSegment};
