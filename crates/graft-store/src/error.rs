//! Error types for store access

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("request to {endpoint} failed")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("store answered {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed store response: {0}")]
    MalformedResponse(String),

    #[error("giving up after {attempts} attempts")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        last: Box<StoreError>,
    },

    #[error("invalid IRI {0:?}")]
    InvalidIri(String),

    #[error("invalid variable name {0:?}")]
    InvalidVariable(String),

    #[error("unexpected binding: {0}")]
    UnexpectedBinding(String),

    #[error("injected failure: {0}")]
    Injected(String),

    #[error("unknown store kind: {0}")]
    UnknownKind(String),
}

impl StoreError {
    /// Whether repeating the same request may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            StoreError::Transport { .. } => true,
            StoreError::Status { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}
