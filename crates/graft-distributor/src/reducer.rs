//! Reduction of change batches to the agendas whose views may be stale

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use graft_core::{
    ChangeBatch, Iri, PathModel, PropertyPath, Resolution, candidate_identifiers, declared_types,
    vocab,
};
use graft_store::{GraphStore, Pattern, Privilege, Select, Var, select_iris};
use tracing::debug;

use crate::error::Result;

pub struct ChangeReducer {
    store: Arc<dyn GraphStore>,
    model: Arc<PathModel>,
    source_graph: Iri,
    block_size: usize,
}

impl ChangeReducer {
    pub fn new(
        store: Arc<dyn GraphStore>,
        model: Arc<PathModel>,
        source_graph: Iri,
        block_size: usize,
    ) -> Self {
        Self {
            store,
            model,
            source_graph,
            block_size: block_size.max(1),
        }
    }

    /// Every root entity that one of the changed resources belongs to.
    ///
    /// An empty set means the changes touch nothing any view contains.
    pub async fn resolve_affected_roots(&self, batches: &[ChangeBatch]) -> Result<BTreeSet<Iri>> {
        let candidates: Vec<Iri> = candidate_identifiers(batches).into_iter().collect();
        if candidates.is_empty() {
            return Ok(BTreeSet::new());
        }

        let instances = self.instances_by_type(&candidates, batches).await?;
        let mut roots = BTreeSet::new();

        for (type_iri, members) in &instances {
            let Resolution::Relevant(paths) = self.model.compile(type_iri) else {
                continue;
            };
            for path in paths.iter() {
                match path.to_property_path() {
                    None => roots.extend(members.iter().cloned()),
                    Some(property_path) => {
                        let members: Vec<Iri> = members.iter().cloned().collect();
                        for block in members.chunks(self.block_size) {
                            roots.extend(self.reachable_roots(block, property_path.clone()).await?);
                        }
                    }
                }
            }
        }

        debug!(
            "{} candidates of {} types resolved to {} roots",
            candidates.len(),
            instances.len(),
            roots.len()
        );
        Ok(roots)
    }

    /// Group candidates by the types the source graph and the batches
    /// themselves declare for them.
    async fn instances_by_type(
        &self,
        candidates: &[Iri],
        batches: &[ChangeBatch],
    ) -> Result<BTreeMap<Iri, BTreeSet<Iri>>> {
        let (resource, type_var) = (Var::new("resource"), Var::new("type"));
        let mut instances: BTreeMap<Iri, BTreeSet<Iri>> = BTreeMap::new();

        for block in candidates.chunks(self.block_size) {
            let query = Select::vars([&resource, &type_var])
                .distinct()
                .pattern(Pattern::values(&resource, block.iter().cloned()))
                .pattern(Pattern::graph(
                    &self.source_graph,
                    vec![Pattern::triple(&resource, vocab::RDF_TYPE, &type_var)],
                ));
            for row in self.store.select(&query, Privilege::Sudo).await? {
                let (Some(member), Some(type_iri)) = (row.iri(&resource), row.iri(&type_var)) else {
                    debug!("Skipping type lookup row without IRIs: {:?}", row);
                    continue;
                };
                instances
                    .entry(type_iri.clone())
                    .or_default()
                    .insert(member.clone());
            }
        }

        // Deleted resources are gone from the source graph, but the delta
        // still says what they were.
        for (member, types) in declared_types(batches) {
            for type_iri in types {
                instances.entry(type_iri).or_default().insert(member.clone());
            }
        }
        Ok(instances)
    }

    async fn reachable_roots(&self, block: &[Iri], path: PropertyPath) -> Result<Vec<Iri>> {
        let (resource, root) = (Var::new("resource"), Var::new("root"));
        let query = Select::vars([&root])
            .distinct()
            .pattern(Pattern::values(&resource, block.iter().cloned()))
            .pattern(Pattern::graph(
                &self.source_graph,
                vec![
                    Pattern::triple(&resource, path, &root),
                    Pattern::triple(&root, vocab::RDF_TYPE, self.model.root()),
                ],
            ));
        Ok(select_iris(self.store.as_ref(), &query, &root, Privilege::Sudo).await?)
    }
}
