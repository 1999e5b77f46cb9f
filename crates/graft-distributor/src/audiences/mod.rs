//! Audience definitions

pub mod cabinet;
pub mod common;
pub mod government;
pub mod minister;
pub mod public;

use graft_core::PathModel;
use graft_core::config::DEFAULT_AUDIENCES;

use crate::audience::Audience;
use crate::error::DistributeError;

/// Every audience this service knows how to build.
pub fn audience_names() -> &'static [&'static str] {
    &DEFAULT_AUDIENCES
}

/// Build the audience with the given name against the path model.
pub fn get_audience(name: &str, model: &PathModel) -> Result<Audience, DistributeError> {
    let audience = match name {
        "minister" => minister::audience(model)?,
        "cabinet" => cabinet::audience(model)?,
        "government" => government::audience(model)?,
        "public" => public::audience(model)?,
        _ => return Err(DistributeError::UnknownAudience(name.to_string())),
    };
    Ok(audience)
}
