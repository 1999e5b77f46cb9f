//! Namespaces and well-known IRIs

pub const RDF: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";
pub const XSD: &str = "http://www.w3.org/2001/XMLSchema#";
pub const DCT: &str = "http://purl.org/dc/terms/";
pub const PROV: &str = "http://www.w3.org/ns/prov#";
pub const EXT: &str = "http://mu.semte.ch/vocabularies/ext/";
pub const BESLUIT: &str = "http://data.vlaanderen.be/ns/besluit#";
pub const BESLUITVORMING: &str = "https://data.vlaanderen.be/ns/besluitvorming#";
pub const DOSSIER: &str = "https://data.vlaanderen.be/ns/dossier#";
pub const NFO: &str = "http://www.semanticdesktop.org/ontologies/2007/03/22/nfo#";
pub const MANDAAT: &str = "http://data.vlaanderen.be/ns/mandaat#";

pub const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";
pub const XSD_INTEGER: &str = "http://www.w3.org/2001/XMLSchema#integer";
pub const XSD_BOOLEAN: &str = "http://www.w3.org/2001/XMLSchema#boolean";
pub const XSD_DATE_TIME: &str = "http://www.w3.org/2001/XMLSchema#dateTime";
pub const DCT_CREATED: &str = "http://purl.org/dc/terms/created";

// ── Bookkeeping written by the distributor ──────────────
pub const LINEAGE: &str = "http://mu.semte.ch/vocabularies/ext/tracesLineageTo";
pub const TEMP_GRAPH: &str = "http://mu.semte.ch/vocabularies/ext/TempGraph";
pub const HYDRATED: &str = "http://mu.semte.ch/vocabularies/ext/hydrated";
pub const HYDRATED_OUTGOING: &str = "http://mu.semte.ch/vocabularies/ext/Outgoing";
pub const HYDRATED_INCOMING: &str = "http://mu.semte.ch/vocabularies/ext/Incoming";
pub const TEMP_GRAPH_BASE: &str = "http://mu.semte.ch/graphs/temp/";

/// Concatenate a namespace and a local name.
pub fn iri(namespace: &str, local: &str) -> crate::Iri {
    crate::Iri::new(format!("{}{}", namespace, local))
}
