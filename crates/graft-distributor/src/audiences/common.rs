//! Filters and step groups shared by several audiences

use graft_core::{Iri, Literal, ModelError, PathModel};
use graft_store::{Pattern, Var};

use crate::audience::{CollectionStep, vars};
use crate::model::*;

/// Drafts never leave the secretariat.
pub fn not_draft() -> Vec<Pattern> {
    vec![Pattern::not_exists(vec![Pattern::triple(
        &vars::root(),
        AGENDA_STATUS,
        Iri::new(AGENDA_STATUS_DRAFT),
    )])]
}

/// The meeting of `?root` has released its decisions.
pub fn decisions_released() -> Vec<Pattern> {
    released(RELEASED_DECISIONS)
}

/// The meeting of `?root` has released its documents.
pub fn documents_released() -> Vec<Pattern> {
    released(RELEASED_DOCUMENTS)
}

fn released(predicate: &str) -> Vec<Pattern> {
    let meeting = Var::new("releaseMeeting");
    vec![Pattern::exists(vec![
        Pattern::triple(&vars::root(), IS_AGENDA_FOR, &meeting),
        Pattern::triple(&meeting, predicate, &Var::new("releasedAt")),
    ])]
}

/// `?resource` carries one of the given access levels.
pub fn access_level_in(levels: &[&str]) -> Vec<Pattern> {
    let level = Var::new("accessLevel");
    vec![Pattern::exists(vec![
        Pattern::triple(&vars::resource(), ACCESS_LEVEL, &level),
        Pattern::values(&level, levels.iter().map(|level| Iri::new(*level))),
    ])]
}

pub fn not_confidential() -> Vec<Pattern> {
    vec![Pattern::not_exists(vec![Pattern::triple(
        &vars::resource(),
        ACCESS_LEVEL,
        Iri::new(ACCESS_LEVEL_CONFIDENTIAL),
    )])]
}

pub fn in_newsletter() -> Vec<Pattern> {
    vec![Pattern::exists(vec![Pattern::triple(
        &vars::resource(),
        IN_NEWSLETTER,
        Literal::boolean(true),
    )])]
}

/// Meeting, agenda items, their mandatees and treatments.
pub fn agenda_structure(model: &PathModel) -> Result<Vec<CollectionStep>, ModelError> {
    Ok(vec![
        CollectionStep::descend(model, AGENDA, MEETING)?,
        CollectionStep::descend(model, AGENDA, AGENDAITEM)?,
        CollectionStep::descend(model, AGENDAITEM, MANDATEE)?,
        CollectionStep::descend(model, AGENDAITEM, TREATMENT)?,
    ])
}

pub fn decisions(
    model: &PathModel,
    filter: Vec<Pattern>,
) -> Result<Vec<CollectionStep>, ModelError> {
    Ok(vec![
        CollectionStep::descend(model, TREATMENT, DECISION_ACTIVITY)?.with_filter(filter),
    ])
}

pub fn news_items(
    model: &PathModel,
    filter: Vec<Pattern>,
) -> Result<Vec<CollectionStep>, ModelError> {
    Ok(vec![
        CollectionStep::descend(model, TREATMENT, NEWS_ITEM)?.with_filter(filter),
    ])
}

/// Pieces on the agenda and decision reports, then their containers and
/// files. Must come after [`decisions`].
pub fn documents(
    model: &PathModel,
    piece_filter: Vec<Pattern>,
) -> Result<Vec<CollectionStep>, ModelError> {
    Ok(vec![
        CollectionStep::descend(model, AGENDAITEM, PIECE)?.with_filter(piece_filter.clone()),
        CollectionStep::descend(model, DECISION_ACTIVITY, PIECE)?.with_filter(piece_filter),
        CollectionStep::descend(model, PIECE, DOCUMENT_CONTAINER)?,
        CollectionStep::descend(model, PIECE, FILE)?,
    ])
}
