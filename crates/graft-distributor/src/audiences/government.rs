//! Government administrations: decisions once released, and documents
//! meant for the administration or the public once documents are released.

use graft_core::{ModelError, PathModel};

use super::common;
use crate::audience::Audience;
use crate::model::{ACCESS_LEVEL_GOVERNMENT, ACCESS_LEVEL_PUBLIC};

pub const TARGET_GRAPH: &str = "http://mu.semte.ch/graphs/organizations/intern-overheid";

pub fn audience(model: &PathModel) -> Result<Audience, ModelError> {
    let mut pieces = common::documents_released();
    pieces.extend(common::access_level_in(&[ACCESS_LEVEL_GOVERNMENT, ACCESS_LEVEL_PUBLIC]));

    let mut steps = common::agenda_structure(model)?;
    steps.extend(common::decisions(model, common::decisions_released())?);
    steps.extend(common::news_items(model, common::decisions_released())?);
    steps.extend(common::documents(model, pieces)?);

    Ok(Audience::new("government", TARGET_GRAPH)
        .with_root_filter(common::not_draft())
        .with_steps(steps))
}
