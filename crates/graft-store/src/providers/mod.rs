//! Store implementations

pub mod http;
pub mod memory;

use std::sync::Arc;

use crate::error::StoreError;
use crate::retry::RetryPolicy;
use crate::store::GraphStore;

pub use http::SparqlClient;
pub use memory::MemoryStore;

/// Factory function to create a store from an endpoint setting.
///
/// `memory:` gives a fresh in-memory store, anything starting with
/// `http://` or `https://` a SPARQL protocol client.
pub fn create_store(endpoint: &str, retry: RetryPolicy) -> Result<Arc<dyn GraphStore>, StoreError> {
    match endpoint {
        "memory:" | "memory" => Ok(Arc::new(MemoryStore::new())),
        url if url.starts_with("http://") || url.starts_with("https://") => {
            Ok(Arc::new(SparqlClient::new(url, retry)))
        }
        other => Err(StoreError::UnknownKind(other.to_string())),
    }
}
