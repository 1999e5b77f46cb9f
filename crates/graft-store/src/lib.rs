//! Quad store access for graft
//!
//! This crate provides the typed query algebra used by the distributor,
//! its rendering to SPARQL text, an HTTP client for SPARQL endpoints with
//! bounded retries, and an in-memory store for tests and dry runs.

pub mod error;
pub mod providers;
pub mod query;
pub mod results;
pub mod retry;
pub mod sparql;
pub mod store;


pub use error::StoreError;
pub use providers::{MemoryStore, SparqlClient, create_store};
pub use query::{
    Expression, Pattern, Projection, QuadTemplate, Select, Solution, TermPattern, Update, Var, Verb,
};
pub use retry::RetryPolicy;
pub use store::{GraphStore, Privilege, count, count_graph, select_iris};
