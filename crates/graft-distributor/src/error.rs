//! Error types for root resolution and distribution runs

use graft_core::ModelError;
use graft_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DistributeError {
    #[error("store request failed")]
    Store(#[from] StoreError),

    #[error("invalid path model")]
    Model(#[from] ModelError),

    #[error("unknown audience: {0}")]
    UnknownAudience(String),
}

pub type Result<T> = std::result::Result<T, DistributeError>;
