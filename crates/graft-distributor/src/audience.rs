//! Per-audience distribution settings
//!
//! An audience is plain data: where its view lives, which agendas it may
//! see, and the ordered steps that collect the resources hanging off them.
//! One generic pipeline consumes it.

use graft_core::{Iri, ModelError, PathModel, PropertyPath};
use graft_store::Pattern;

/// Variables shared between the pipeline and audience filters.
///
/// Root filters may mention `?root`. Step filters may mention `?root`,
/// `?from` (the staged resource the step starts from) and `?resource` (the
/// resource being collected). Both are matched against the source graph. Step
/// filters apply to the whole step, so all three variables are bound when
/// they are checked.
pub mod vars {
    use graft_store::Var;

    pub fn root() -> Var {
        Var::new("root")
    }

    pub fn from() -> Var {
        Var::new("from")
    }

    pub fn resource() -> Var {
        Var::new("resource")
    }
}

/// Follow `path` from staged resources of `from_type` to source resources of
/// `to_type`, keeping only those that satisfy `filter`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionStep {
    pub from_type: Iri,
    pub path: PropertyPath,
    pub to_type: Iri,
    pub filter: Vec<Pattern>,
}

impl CollectionStep {
    pub fn new(from_type: impl Into<Iri>, path: PropertyPath, to_type: impl Into<Iri>) -> Self {
        Self {
            from_type: from_type.into(),
            path,
            to_type: to_type.into(),
            filter: Vec::new(),
        }
    }

    /// Walk from a parent type down to a child type, reversing the segment
    /// the model declares from child to parent.
    pub fn descend(model: &PathModel, parent: &str, child: &str) -> Result<Self, ModelError> {
        let (parent, child) = (Iri::new(parent), Iri::new(child));
        let segment = model
            .segment_between(&child, &parent)
            .ok_or_else(|| ModelError::MissingSegment {
                child: child.clone(),
                parent: parent.clone(),
            })?;
        Ok(Self::new(parent, segment.inverse(), child))
    }

    pub fn with_filter(mut self, filter: Vec<Pattern>) -> Self {
        self.filter.extend(filter);
        self
    }
}

#[derive(Debug, Clone)]
pub struct Audience {
    pub name: String,
    /// The published view maintained for this audience.
    pub target_graph: Iri,
    /// Patterns an agenda must satisfy to be distributed at all.
    pub root_filter: Vec<Pattern>,
    /// Collection steps, run strictly in this order.
    pub steps: Vec<CollectionStep>,
}

impl Audience {
    pub fn new(name: impl Into<String>, target_graph: impl Into<Iri>) -> Self {
        Self {
            name: name.into(),
            target_graph: target_graph.into(),
            root_filter: Vec::new(),
            steps: Vec::new(),
        }
    }

    pub fn with_root_filter(mut self, filter: Vec<Pattern>) -> Self {
        self.root_filter.extend(filter);
        self
    }

    pub fn with_steps(mut self, steps: impl IntoIterator<Item = CollectionStep>) -> Self {
        self.steps.extend(steps);
        self
    }
}
