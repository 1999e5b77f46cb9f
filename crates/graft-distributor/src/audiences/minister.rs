//! Ministers see every agenda that is not a draft, in full.

use graft_core::{ModelError, PathModel};

use super::common;
use crate::audience::Audience;

pub const TARGET_GRAPH: &str = "http://mu.semte.ch/graphs/organizations/minister";

pub fn audience(model: &PathModel) -> Result<Audience, ModelError> {
    let mut steps = common::agenda_structure(model)?;
    steps.extend(common::decisions(model, Vec::new())?);
    steps.extend(common::news_items(model, Vec::new())?);
    steps.extend(common::documents(model, Vec::new())?);

    Ok(Audience::new("minister", TARGET_GRAPH)
        .with_root_filter(common::not_draft())
        .with_steps(steps))
}
