//! Cabinet staff: everything ministers see except confidential pieces.

use graft_core::{ModelError, PathModel};

use super::common;
use crate::audience::Audience;

pub const TARGET_GRAPH: &str = "http://mu.semte.ch/graphs/organizations/intern-regering";

pub fn audience(model: &PathModel) -> Result<Audience, ModelError> {
    let mut steps = common::agenda_structure(model)?;
    steps.extend(common::decisions(model, Vec::new())?);
    steps.extend(common::news_items(model, Vec::new())?);
    steps.extend(common::documents(model, common::not_confidential())?);

    Ok(Audience::new("cabinet", TARGET_GRAPH)
        .with_root_filter(common::not_draft())
        .with_steps(steps))
}
