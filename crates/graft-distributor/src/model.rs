//! The agenda data model: types, predicates and the type→segment table
//!
//! Every segment leads from an instance of the declared type towards its
//! parent, ending at the agenda. The same table drives root resolution for
//! incoming changes and, inverted, the collection steps of every audience.

use graft_core::{ModelError, PathModel, PropertyPath, TypeSegment};

// ── Types ───────────────────────────────────────────────
pub const AGENDA: &str = "https://data.vlaanderen.be/ns/besluitvorming#Agenda";
pub const MEETING: &str = "http://data.vlaanderen.be/ns/besluit#Vergaderactiviteit";
pub const AGENDAITEM: &str = "http://data.vlaanderen.be/ns/besluit#Agendapunt";
pub const TREATMENT: &str = "http://data.vlaanderen.be/ns/besluit#BehandelingVanAgendapunt";
pub const DECISION_ACTIVITY: &str = "https://data.vlaanderen.be/ns/besluitvorming#Beslissingsactiviteit";
pub const NEWS_ITEM: &str = "http://mu.semte.ch/vocabularies/ext/Nieuwsbericht";
pub const MANDATEE: &str = "http://data.vlaanderen.be/ns/mandaat#Mandataris";
pub const PIECE: &str = "https://data.vlaanderen.be/ns/dossier#Stuk";
pub const DOCUMENT_CONTAINER: &str = "https://data.vlaanderen.be/ns/dossier#Serie";
pub const FILE: &str = "http://www.semanticdesktop.org/ontologies/2007/03/22/nfo#FileDataObject";

// ── Relations ───────────────────────────────────────────
pub const IS_AGENDA_FOR: &str = "https://data.vlaanderen.be/ns/besluitvorming#isAgendaVoor";
pub const HAS_PART: &str = "http://purl.org/dc/terms/hasPart";
pub const SUBJECT: &str = "http://purl.org/dc/terms/subject";
pub const HAS_DECISION: &str = "https://data.vlaanderen.be/ns/besluitvorming#heeftBeslissing";
pub const GENERATED: &str = "http://www.w3.org/ns/prov#generated";
pub const HAS_MANDATEE: &str = "http://mu.semte.ch/vocabularies/ext/heeftBevoegdeVoorAgendapunt";
pub const AGENDA_PIECE: &str = "https://data.vlaanderen.be/ns/besluitvorming#geagendeerdStuk";
pub const REPORT: &str = "https://data.vlaanderen.be/ns/besluitvorming#genereertVerslag";
pub const CONTAINS: &str = "https://data.vlaanderen.be/ns/dossier#Collectie.bestaatUit";
pub const VALUE: &str = "http://www.w3.org/ns/prov#value";
pub const PRIMARY_SOURCE: &str = "http://www.w3.org/ns/prov#hadPrimarySource";

// ── Attributes used by release filters ──────────────────
pub const AGENDA_STATUS: &str = "https://data.vlaanderen.be/ns/besluitvorming#agendaStatus";
pub const ACCESS_LEVEL: &str = "https://data.vlaanderen.be/ns/besluitvorming#vertrouwelijkheidsniveau";
pub const RELEASED_DECISIONS: &str = "http://mu.semte.ch/vocabularies/ext/releasedDecisions";
pub const RELEASED_DOCUMENTS: &str = "http://mu.semte.ch/vocabularies/ext/releasedDocuments";
pub const IN_NEWSLETTER: &str = "http://mu.semte.ch/vocabularies/ext/inNieuwsbrief";

// ── Concepts ────────────────────────────────────────────
pub const AGENDA_STATUS_DRAFT: &str = "http://themis.vlaanderen.be/id/concept/agenda-status/ontwerp";
pub const ACCESS_LEVEL_PUBLIC: &str = "http://themis.vlaanderen.be/id/concept/toegangsniveau/publiek";
pub const ACCESS_LEVEL_GOVERNMENT: &str = "http://themis.vlaanderen.be/id/concept/toegangsniveau/intern-overheid";
pub const ACCESS_LEVEL_CABINET: &str = "http://themis.vlaanderen.be/id/concept/toegangsniveau/intern-regering";
pub const ACCESS_LEVEL_CONFIDENTIAL: &str = "http://themis.vlaanderen.be/id/concept/toegangsniveau/vertrouwelijk";

/// Relations from each type towards the agenda owning it.
pub fn type_table() -> Vec<TypeSegment> {
    vec![
        TypeSegment::new(MEETING, PropertyPath::inverse_of(IS_AGENDA_FOR), AGENDA),
        TypeSegment::new(AGENDAITEM, PropertyPath::inverse_of(HAS_PART), AGENDA),
        TypeSegment::new(TREATMENT, PropertyPath::predicate(SUBJECT), AGENDAITEM),
        TypeSegment::new(DECISION_ACTIVITY, PropertyPath::inverse_of(HAS_DECISION), TREATMENT),
        TypeSegment::new(NEWS_ITEM, PropertyPath::inverse_of(GENERATED), TREATMENT),
        TypeSegment::new(MANDATEE, PropertyPath::inverse_of(HAS_MANDATEE), AGENDAITEM),
        TypeSegment::new(PIECE, PropertyPath::inverse_of(AGENDA_PIECE), AGENDAITEM),
        TypeSegment::new(PIECE, PropertyPath::inverse_of(REPORT), DECISION_ACTIVITY),
        TypeSegment::new(DOCUMENT_CONTAINER, PropertyPath::predicate(CONTAINS), PIECE),
        TypeSegment::new(FILE, PropertyPath::inverse_of(VALUE), PIECE),
        // Derived files (e.g. PDF renditions) hang off the source file.
        TypeSegment::new(
            FILE,
            PropertyPath::predicate(PRIMARY_SOURCE).then(PropertyPath::inverse_of(VALUE)),
            PIECE,
        ),
    ]
}

/// Build and validate the agenda path model.
pub fn build_model() -> Result<PathModel, ModelError> {
    PathModel::new(AGENDA, type_table())
}
