//! Declarative type→segment table and the memoized path compiler
//!
//! Every configured type declares one or more segments leading to a parent
//! type. Compiling a type expands those segments recursively through the
//! parents until the root type is reached, yielding every alternative path
//! from an instance of the type to the root entities owning it.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use tracing::debug;

use crate::error::ModelError;
use crate::model::Iri;
use crate::path::PropertyPath;

/// One declared relation from an instance of `type_iri` towards its parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeSegment {
    pub type_iri: Iri,
    pub segment: PropertyPath,
    /// `None` means the segment reaches the root type directly.
    pub parent: Option<Iri>,
}

impl TypeSegment {
    pub fn new(type_iri: impl Into<Iri>, segment: PropertyPath, parent: impl Into<Iri>) -> Self {
        TypeSegment {
            type_iri: type_iri.into(),
            segment,
            parent: Some(parent.into()),
        }
    }

    pub fn direct(type_iri: impl Into<Iri>, segment: PropertyPath) -> Self {
        TypeSegment {
            type_iri: type_iri.into(),
            segment,
            parent: None,
        }
    }
}

/// Ordered segments from a type up to the root type. Empty for the root
/// itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CompiledPath(Vec<PropertyPath>);

impl CompiledPath {
    pub fn identity() -> Self {
        CompiledPath(Vec::new())
    }

    pub fn segments(&self) -> &[PropertyPath] {
        &self.0
    }

    pub fn is_identity(&self) -> bool {
        self.0.is_empty()
    }

    fn prepend(&self, segment: PropertyPath) -> Self {
        let mut segments = Vec::with_capacity(self.0.len() + 1);
        segments.push(segment);
        segments.extend(self.0.iter().cloned());
        CompiledPath(segments)
    }

    /// The whole path as one property path, `None` for the identity path.
    pub fn to_property_path(&self) -> Option<PropertyPath> {
        if self.0.is_empty() {
            None
        } else {
            Some(PropertyPath::sequence(self.0.iter().cloned()))
        }
    }
}

impl fmt::Display for CompiledPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_property_path() {
            Some(path) => write!(f, "{}", path),
            None => f.write_str("(identity)"),
        }
    }
}

/// Outcome of compiling a type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Relevant(Arc<Vec<CompiledPath>>),
    /// The type is not configured; its instances cannot influence any view.
    NotRelevant,
}

impl Resolution {
    pub fn paths(&self) -> &[CompiledPath] {
        match self {
            Resolution::Relevant(paths) => paths.as_slice(),
            Resolution::NotRelevant => &[],
        }
    }

    pub fn is_relevant(&self) -> bool {
        matches!(self, Resolution::Relevant(_))
    }
}

/// The validated declaration table plus a per-type cache of compiled paths.
pub struct PathModel {
    root: Iri,
    entries: HashMap<Iri, Vec<TypeSegment>>,
    compiled: DashMap<Iri, Arc<Vec<CompiledPath>>>,
}

impl fmt::Debug for PathModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PathModel")
            .field("root", &self.root)
            .field("type_count", &self.entries.len())
            .field("compiled", &self.compiled.len())
            .finish()
    }
}

impl PathModel {
    /// Validate the declarations and build the model.
    ///
    /// Fails on segments declared for the root type, empty segments, parents
    /// that are neither declared nor the root, and declaration cycles.
    pub fn new(root: impl Into<Iri>, declarations: Vec<TypeSegment>) -> Result<Self, ModelError> {
        let root = root.into();
        let mut entries: HashMap<Iri, Vec<TypeSegment>> = HashMap::new();

        for declaration in declarations {
            if declaration.type_iri == root {
                return Err(ModelError::RootHasSegments(root));
            }
            if declaration.segment.is_empty() {
                return Err(ModelError::EmptySegment(declaration.type_iri));
            }
            entries
                .entry(declaration.type_iri.clone())
                .or_default()
                .push(declaration);
        }

        let mut graph: DiGraph<Iri, ()> = DiGraph::new();
        let mut nodes: HashMap<Iri, NodeIndex> = HashMap::new();
        nodes.insert(root.clone(), graph.add_node(root.clone()));
        for type_iri in entries.keys() {
            nodes.insert(type_iri.clone(), graph.add_node(type_iri.clone()));
        }

        for (type_iri, segments) in &entries {
            for segment in segments {
                let Some(parent) = &segment.parent else {
                    continue;
                };
                let Some(&parent_node) = nodes.get(parent) else {
                    return Err(ModelError::UndeclaredParent {
                        type_iri: type_iri.clone(),
                        parent: parent.clone(),
                    });
                };
                graph.add_edge(nodes[type_iri], parent_node, ());
            }
        }

        if let Err(cycle) = toposort(&graph, None) {
            return Err(ModelError::Cycle {
                type_iri: graph[cycle.node_id()].clone(),
            });
        }

        debug!("Path model built with {} declared types", entries.len());

        Ok(PathModel {
            root,
            entries,
            compiled: DashMap::new(),
        })
    }

    pub fn root(&self) -> &Iri {
        &self.root
    }

    /// Every configured type, root included.
    pub fn types(&self) -> impl Iterator<Item = &Iri> {
        std::iter::once(&self.root).chain(self.entries.keys())
    }

    pub fn is_configured(&self, type_iri: &Iri) -> bool {
        *type_iri == self.root || self.entries.contains_key(type_iri)
    }

    /// All alternative paths from `type_iri` to the root type.
    pub fn compile(&self, type_iri: &Iri) -> Resolution {
        if !self.is_configured(type_iri) {
            return Resolution::NotRelevant;
        }
        Resolution::Relevant(self.compile_paths(type_iri))
    }

    fn compile_paths(&self, type_iri: &Iri) -> Arc<Vec<CompiledPath>> {
        if let Some(hit) = self.compiled.get(type_iri) {
            return Arc::clone(hit.value());
        }

        let mut paths: Vec<CompiledPath> = Vec::new();
        if *type_iri == self.root {
            paths.push(CompiledPath::identity());
        } else {
            for entry in self.entries.get(type_iri).into_iter().flatten() {
                let expanded = match &entry.parent {
                    Some(parent) if *parent != self.root => self
                        .compile_paths(parent)
                        .iter()
                        .map(|parent_path| parent_path.prepend(entry.segment.clone()))
                        .collect::<Vec<_>>(),
                    _ => vec![CompiledPath::identity().prepend(entry.segment.clone())],
                };
                for path in expanded {
                    if !paths.contains(&path) {
                        paths.push(path);
                    }
                }
            }
        }

        let paths = Arc::new(paths);
        self.compiled.insert(type_iri.clone(), Arc::clone(&paths));
        paths
    }

    /// The relation declared from `child` to `parent`; several declarations
    /// between the same pair are merged into an alternative.
    pub fn segment_between(&self, child: &Iri, parent: &Iri) -> Option<PropertyPath> {
        let segments: Vec<PropertyPath> = self
            .entries
            .get(child)?
            .iter()
            .filter(|entry| match &entry.parent {
                Some(declared) => declared == parent,
                None => parent == &self.root,
            })
            .map(|entry| entry.segment.clone())
            .collect();

        if segments.is_empty() {
            None
        } else {
            Some(PropertyPath::alternative(segments))
        }
    }
}
