//! The public: only agendas whose decisions are released, news items that
//! made the newsletter, and public documents once documents are released.

use graft_core::{ModelError, PathModel};

use super::common;
use crate::audience::Audience;
use crate::model::ACCESS_LEVEL_PUBLIC;

pub const TARGET_GRAPH: &str = "http://mu.semte.ch/graphs/public";

pub fn audience(model: &PathModel) -> Result<Audience, ModelError> {
    let mut roots = common::not_draft();
    roots.extend(common::decisions_released());

    let mut pieces = common::documents_released();
    pieces.extend(common::access_level_in(&[ACCESS_LEVEL_PUBLIC]));

    let mut steps = common::agenda_structure(model)?;
    steps.extend(common::decisions(model, Vec::new())?);
    steps.extend(common::news_items(model, common::in_newsletter())?);
    steps.extend(common::documents(model, pieces)?);

    Ok(Audience::new("public", TARGET_GRAPH)
        .with_root_filter(roots)
        .with_steps(steps))
}
