//! The distribution pipeline
//!
//! One run rebuilds the slice of an audience's view that belongs to the
//! roots in scope:
//!
//! 1. mark a fresh scratch graph
//! 2. seed the roots that pass the audience's root filter
//! 3. run the collection steps in order, staging resources with lineage
//! 4. copy the full neighborhood of every staged resource
//! 5. remove from the view what the scratch graph no longer supports
//! 6. commit the scratch graph into the view in bounded batches
//! 7. drop the scratch graph
//!
//! Every write goes through the store with `Privilege::Sudo`.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use graft_core::{Iri, PathModel, Term, Triple, error_chain, vocab};
use graft_store::{
    GraphStore, Pattern, Privilege, QuadTemplate, Select, Update, Var, count, count_graph,
    select_iris,
};
use tracing::{Instrument, debug, info, info_span, warn};

use crate::audience::{Audience, CollectionStep, vars};
use crate::error::Result;
use crate::scratch::ScratchGraph;

/// Which roots a run covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    /// Every root in the source graph; the view is rebuilt from scratch.
    All,
    /// Only these roots; the rest of the view is left alone.
    Roots(BTreeSet<Iri>),
}

impl Scope {
    pub fn roots(roots: impl IntoIterator<Item = impl Into<Iri>>) -> Self {
        Scope::Roots(roots.into_iter().map(Into::into).collect())
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Scope::All)
    }

    /// No roots at all.
    pub fn is_empty(&self) -> bool {
        matches!(self, Scope::Roots(roots) if roots.is_empty())
    }

    /// A scope covering both.
    pub fn merge(self, other: Scope) -> Scope {
        match (self, other) {
            (Scope::Roots(mut roots), Scope::Roots(more)) => {
                roots.extend(more);
                Scope::Roots(roots)
            }
            _ => Scope::All,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DistributorSettings {
    pub source_graph: Iri,
    pub candidate_block_size: usize,
    pub batch_size: usize,
    pub keep_scratch_graphs: bool,
}

impl DistributorSettings {
    pub fn new(source_graph: impl Into<Iri>) -> Self {
        Self {
            source_graph: source_graph.into(),
            candidate_block_size: 100,
            batch_size: 500,
            keep_scratch_graphs: false,
        }
    }

    pub fn from_config(config: &graft_core::SyncConfig) -> Self {
        Self {
            source_graph: Iri::new(&config.source_graph),
            candidate_block_size: config.candidate_block_size.max(1),
            batch_size: config.batch_size.max(1),
            keep_scratch_graphs: config.keep_scratch_graphs,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepReport {
    pub from_type: Iri,
    pub to_type: Iri,
    /// Lineage edges the step added to the scratch graph.
    pub lineage_added: u64,
}

/// Summary of one pipeline run.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub audience: String,
    pub roots_seeded: u64,
    pub steps: Vec<StepReport>,
    pub closure_passes: u32,
    pub resources_hydrated: u64,
    pub triples_removed: u64,
    pub triples_committed: u64,
    pub elapsed: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Outgoing,
    Incoming,
}

impl Direction {
    fn marker(self) -> &'static str {
        match self {
            Direction::Outgoing => vocab::HYDRATED_OUTGOING,
            Direction::Incoming => vocab::HYDRATED_INCOMING,
        }
    }
}

/// Runs the pipeline for one audience.
pub struct Distributor {
    store: Arc<dyn GraphStore>,
    audience: Audience,
    root_type: Iri,
    settings: DistributorSettings,
}

impl Distributor {
    pub fn new(
        store: Arc<dyn GraphStore>,
        model: &PathModel,
        audience: Audience,
        settings: DistributorSettings,
    ) -> Self {
        Self {
            store,
            audience,
            root_type: model.root().clone(),
            settings,
        }
    }

    pub fn audience(&self) -> &Audience {
        &self.audience
    }

    pub fn name(&self) -> &str {
        &self.audience.name
    }

    /// Bring the view of the roots in `scope` in line with the source graph.
    pub async fn run(&self, scope: &Scope) -> Result<RunReport> {
        let span = info_span!("distribute", audience = %self.audience.name);
        self.run_inner(scope).instrument(span).await
    }

    async fn run_inner(&self, scope: &Scope) -> Result<RunReport> {
        let started = Instant::now();
        let mut report = RunReport {
            audience: self.audience.name.clone(),
            ..RunReport::default()
        };

        if scope.is_empty() {
            debug!("No roots in scope, nothing to do");
            return Ok(report);
        }

        let scratch = ScratchGraph::generate();
        info!(
            "Distributing {} into {} via {}",
            describe(scope),
            self.audience.target_graph,
            scratch.iri()
        );

        let outcome = self.stages(scope, &scratch, &mut report).await;
        self.teardown(&scratch).await;
        outcome?;

        report.elapsed = started.elapsed();
        info!(
            "Distributed {} roots: {} removed, {} committed, {} closure passes in {:?}",
            report.roots_seeded,
            report.triples_removed,
            report.triples_committed,
            report.closure_passes,
            report.elapsed
        );
        Ok(report)
    }

    async fn stages(
        &self,
        scope: &Scope,
        scratch: &ScratchGraph,
        report: &mut RunReport,
    ) -> Result<()> {
        self.mark(scratch).await?;
        report.roots_seeded = self.seed(scope, scratch).await?;
        debug!("Seeded {} roots", report.roots_seeded);

        for step in &self.audience.steps {
            let lineage_added = self.collect(step, scratch).await?;
            debug!(
                "Step {} -> {} staged {} lineage edges",
                step.from_type, step.to_type, lineage_added
            );
            report.steps.push(StepReport {
                from_type: step.from_type.clone(),
                to_type: step.to_type.clone(),
                lineage_added,
            });
        }

        let (passes, hydrated) = self.close(scratch).await?;
        report.closure_passes = passes;
        report.resources_hydrated = hydrated;

        report.triples_removed = self.reconcile(scope, scratch).await?;
        report.triples_committed = self.commit(scratch).await?;
        Ok(())
    }

    async fn mark(&self, scratch: &ScratchGraph) -> Result<()> {
        let update = Update::insert_data(scratch.iri(), scratch.marker(Utc::now()));
        self.store.update(&update, Privilege::Sudo).await?;
        Ok(())
    }

    // ── Seeding ─────────────────────────────────────────

    async fn seed(&self, scope: &Scope, scratch: &ScratchGraph) -> Result<u64> {
        match scope {
            Scope::All => self.seed_block(None, scratch).await?,
            Scope::Roots(roots) => {
                let roots: Vec<Iri> = roots.iter().cloned().collect();
                for block in roots.chunks(self.settings.candidate_block_size.max(1)) {
                    self.seed_block(Some(block), scratch).await?;
                }
            }
        }

        let root = vars::root();
        let seeded = count(
            self.store.as_ref(),
            vec![Pattern::graph(
                scratch.iri(),
                vec![Pattern::triple(&root, vocab::LINEAGE, &root)],
            )],
            Privilege::Sudo,
        )
        .await?;
        Ok(seeded)
    }

    async fn seed_block(&self, block: Option<&[Iri]>, scratch: &ScratchGraph) -> Result<()> {
        let root = vars::root();
        let mut source = vec![Pattern::triple(&root, vocab::RDF_TYPE, &self.root_type)];
        source.extend(self.audience.root_filter.iter().cloned());

        let mut patterns = Vec::new();
        if let Some(block) = block {
            patterns.push(Pattern::values(&root, block.iter().cloned()));
        }
        patterns.push(Pattern::graph(&self.settings.source_graph, source));

        let update = Update::insert(
            vec![
                QuadTemplate::new(
                    scratch.iri(),
                    &root,
                    Term::iri(vocab::RDF_TYPE),
                    &self.root_type,
                ),
                QuadTemplate::new(scratch.iri(), &root, Term::iri(vocab::LINEAGE), &root),
            ],
            patterns,
        );
        self.store.update(&update, Privilege::Sudo).await?;
        Ok(())
    }

    // ── Collection ──────────────────────────────────────

    async fn collect(&self, step: &CollectionStep, scratch: &ScratchGraph) -> Result<u64> {
        let (from, resource, root) = (vars::from(), vars::resource(), vars::root());
        let before = self.lineage_count(scratch).await?;

        let mut patterns = vec![
            Pattern::graph(
                scratch.iri(),
                vec![
                    Pattern::triple(&from, vocab::RDF_TYPE, &step.from_type),
                    Pattern::triple(&from, vocab::LINEAGE, &root),
                ],
            ),
            Pattern::graph(
                &self.settings.source_graph,
                vec![
                    Pattern::triple(&from, step.path.clone(), &resource),
                    Pattern::triple(&resource, vocab::RDF_TYPE, &step.to_type),
                ],
            ),
        ];
        // Filters mention ?root, which only the scratch group binds.
        patterns.extend(
            step.filter
                .iter()
                .map(|filter| in_graph(&self.settings.source_graph, filter)),
        );

        let update = Update::insert(
            vec![
                QuadTemplate::new(
                    scratch.iri(),
                    &resource,
                    Term::iri(vocab::RDF_TYPE),
                    &step.to_type,
                ),
                QuadTemplate::new(scratch.iri(), &resource, Term::iri(vocab::LINEAGE), &root),
            ],
            patterns,
        );
        self.store.update(&update, Privilege::Sudo).await?;

        let after = self.lineage_count(scratch).await?;
        Ok(after.saturating_sub(before))
    }

    async fn lineage_count(&self, scratch: &ScratchGraph) -> Result<u64> {
        let (s, o) = (Var::new("s"), Var::new("o"));
        Ok(count(
            self.store.as_ref(),
            vec![Pattern::graph(
                scratch.iri(),
                vec![Pattern::triple(&s, vocab::LINEAGE, &o)],
            )],
            Privilege::Sudo,
        )
        .await?)
    }

    // ── Closure ─────────────────────────────────────────

    /// Copy the neighborhood of every staged resource. Returns the number of
    /// rounds and of hydrated resources.
    async fn close(&self, scratch: &ScratchGraph) -> Result<(u32, u64)> {
        let mut passes = 0;
        let mut total = 0;
        let mut previous = count_graph(self.store.as_ref(), scratch.iri(), Privilege::Sudo).await?;

        loop {
            passes += 1;
            let mut hydrated = 0;
            for direction in [Direction::Outgoing, Direction::Incoming] {
                hydrated += self.hydrate(direction, scratch).await?;
            }
            total += hydrated;

            let current = count_graph(self.store.as_ref(), scratch.iri(), Privilege::Sudo).await?;
            debug!(
                "Closure pass {} hydrated {} resources, scratch holds {} triples",
                passes, hydrated, current
            );
            if hydrated == 0 || current == previous {
                break;
            }
            previous = current;
        }
        Ok((passes, total))
    }

    async fn hydrate(&self, direction: Direction, scratch: &ScratchGraph) -> Result<u64> {
        let (resource, root) = (vars::resource(), vars::root());
        let mut hydrated = 0;

        loop {
            let pending = Select::vars([&resource])
                .distinct()
                .pattern(Pattern::graph(
                    scratch.iri(),
                    vec![Pattern::triple(&resource, vocab::LINEAGE, &root)],
                ))
                .pattern(Pattern::not_exists(vec![Pattern::graph(
                    scratch.iri(),
                    vec![Pattern::triple(
                        &resource,
                        vocab::HYDRATED,
                        Iri::new(direction.marker()),
                    )],
                )]))
                .limit(self.settings.batch_size);
            let batch =
                select_iris(self.store.as_ref(), &pending, &resource, Privilege::Sudo).await?;
            if batch.is_empty() {
                break;
            }

            self.store
                .update(&self.neighborhood_copy(direction, &batch, scratch), Privilege::Sudo)
                .await?;
            let markers = batch
                .iter()
                .map(|member| {
                    Triple::new(member.clone(), vocab::HYDRATED, Term::iri(direction.marker()))
                })
                .collect();
            self.store
                .update(&Update::insert_data(scratch.iri(), markers), Privilege::Sudo)
                .await?;
            hydrated += batch.len() as u64;
        }
        Ok(hydrated)
    }

    fn neighborhood_copy(
        &self,
        direction: Direction,
        batch: &[Iri],
        scratch: &ScratchGraph,
    ) -> Update {
        let (resource, p, other) = (vars::resource(), Var::new("p"), Var::new("other"));
        let (subject, object) = match direction {
            Direction::Outgoing => (&resource, &other),
            Direction::Incoming => (&other, &resource),
        };
        Update::insert(
            vec![QuadTemplate::new(scratch.iri(), subject, &p, object)],
            vec![
                Pattern::values(&resource, batch.iter().cloned()),
                Pattern::graph(
                    &self.settings.source_graph,
                    vec![Pattern::triple(subject, &p, object)],
                ),
            ],
        )
    }

    // ── Reconciliation ──────────────────────────────────

    /// Remove what the view holds for the roots in scope but the scratch
    /// graph does not. Returns the number of triples removed.
    async fn reconcile(&self, scope: &Scope, scratch: &ScratchGraph) -> Result<u64> {
        let target = &self.audience.target_graph;
        let initial = count_graph(self.store.as_ref(), target, Privilege::Sudo).await?;

        match scope {
            Scope::All => {
                self.remove_orphans(None, scratch).await?;
                self.remove_stale_lineage(None, scratch).await?;
            }
            Scope::Roots(roots) => {
                let roots: Vec<Iri> = roots.iter().cloned().collect();
                for block in roots.chunks(self.settings.candidate_block_size.max(1)) {
                    self.remove_orphans(Some(block), scratch).await?;
                    self.remove_stale_lineage(Some(block), scratch).await?;
                }
            }
        }
        self.remove_stale_facts(scratch).await?;
        if scope.is_all() {
            self.sweep(scratch).await?;
        }

        let remaining = count_graph(self.store.as_ref(), target, Privilege::Sudo).await?;
        Ok(initial.saturating_sub(remaining))
    }

    /// Resources that lost their lineage lose every fact in the view except
    /// the lineage itself, which goes in [`Self::remove_stale_lineage`].
    async fn remove_orphans(&self, block: Option<&[Iri]>, scratch: &ScratchGraph) -> Result<()> {
        let target = &self.audience.target_graph;
        let (resource, root, any, other) = (
            vars::resource(),
            vars::root(),
            Var::new("anyRoot"),
            Var::new("otherRoot"),
        );

        let mut orphaned = Vec::new();
        if let Some(block) = block {
            orphaned.push(Pattern::values(&root, block.iter().cloned()));
        }
        orphaned.push(Pattern::graph(
            target,
            vec![Pattern::triple(&resource, vocab::LINEAGE, &root)],
        ));
        orphaned.push(Pattern::not_exists(vec![Pattern::graph(
            scratch.iri(),
            vec![Pattern::triple(&resource, vocab::LINEAGE, &any)],
        )]));
        if let Some(block) = block {
            // Still owned by a root outside this run.
            orphaned.push(Pattern::not_exists(vec![
                Pattern::graph(target, vec![Pattern::triple(&resource, vocab::LINEAGE, &other)]),
                Pattern::not_in(&other, block.iter().cloned()),
            ]));
        }

        let (p, o, s) = (Var::new("p"), Var::new("o"), Var::new("s"));
        for (subject, object) in [(&resource, &o), (&s, &resource)] {
            let mut patterns = orphaned.clone();
            patterns.push(Pattern::graph(target, vec![Pattern::triple(subject, &p, object)]));
            patterns.push(Pattern::not_equal(&p, Iri::new(vocab::LINEAGE)));
            self.delete_until_stable(target, subject, &p, object, patterns).await?;
        }
        Ok(())
    }

    async fn remove_stale_lineage(
        &self,
        block: Option<&[Iri]>,
        scratch: &ScratchGraph,
    ) -> Result<()> {
        let target = &self.audience.target_graph;
        let (resource, root, lineage) = (vars::resource(), vars::root(), Var::new("lineage"));

        let mut patterns = vec![Pattern::values(&lineage, [Iri::new(vocab::LINEAGE)])];
        if let Some(block) = block {
            patterns.push(Pattern::values(&root, block.iter().cloned()));
        }
        patterns.push(Pattern::graph(
            target,
            vec![Pattern::triple(&resource, vocab::LINEAGE, &root)],
        ));
        patterns.push(Pattern::not_exists(vec![Pattern::graph(
            scratch.iri(),
            vec![Pattern::triple(&resource, vocab::LINEAGE, &root)],
        )]));

        self.delete_until_stable(target, &resource, &lineage, &root, patterns)
            .await
    }

    /// Facts of staged resources that the source no longer has.
    async fn remove_stale_facts(&self, scratch: &ScratchGraph) -> Result<()> {
        let target = &self.audience.target_graph;
        let (resource, root, p, o, s) = (
            vars::resource(),
            vars::root(),
            Var::new("p"),
            Var::new("o"),
            Var::new("s"),
        );

        for (subject, object) in [(&resource, &o), (&s, &resource)] {
            let patterns = vec![
                Pattern::graph(
                    scratch.iri(),
                    vec![Pattern::triple(&resource, vocab::LINEAGE, &root)],
                ),
                Pattern::graph(target, vec![Pattern::triple(subject, &p, object)]),
                Pattern::not_equal(&p, Iri::new(vocab::LINEAGE)),
                Pattern::not_exists(vec![Pattern::graph(
                    scratch.iri(),
                    vec![Pattern::triple(subject, &p, object)],
                )]),
            ];
            self.delete_until_stable(target, subject, &p, object, patterns).await?;
        }
        Ok(())
    }

    /// Full rebuilds drop everything the scratch graph does not hold.
    async fn sweep(&self, scratch: &ScratchGraph) -> Result<()> {
        let target = &self.audience.target_graph;
        let (s, p, o) = (Var::new("s"), Var::new("p"), Var::new("o"));
        let patterns = vec![
            Pattern::graph(target, vec![Pattern::triple(&s, &p, &o)]),
            Pattern::not_exists(vec![Pattern::graph(
                scratch.iri(),
                vec![Pattern::triple(&s, &p, &o)],
            )]),
        ];
        self.delete_until_stable(target, &s, &p, &o, patterns).await
    }

    /// Delete `(subject, predicate, object)` from `graph` for the solutions of
    /// `patterns`, at most `batch_size` at a time, until the graph stops
    /// shrinking.
    async fn delete_until_stable(
        &self,
        graph: &Iri,
        subject: &Var,
        predicate: &Var,
        object: &Var,
        patterns: Vec<Pattern>,
    ) -> Result<()> {
        let bounded = Select::vars([subject, predicate, object])
            .distinct()
            .patterns(patterns)
            .limit(self.settings.batch_size);
        let update = Update::delete(
            vec![QuadTemplate::new(graph, subject, predicate, object)],
            vec![Pattern::sub_select(bounded)],
        );

        let mut before = count_graph(self.store.as_ref(), graph, Privilege::Sudo).await?;
        loop {
            self.store.update(&update, Privilege::Sudo).await?;
            let after = count_graph(self.store.as_ref(), graph, Privilege::Sudo).await?;
            if after >= before {
                return Ok(());
            }
            debug!("Removed {} triples from {}", before - after, graph);
            before = after;
        }
    }

    // ── Commit ──────────────────────────────────────────

    /// Copy the scratch graph into the view, tracking progress in the
    /// ledger. Returns the number of triples committed.
    async fn commit(&self, scratch: &ScratchGraph) -> Result<u64> {
        let (s, p, o) = (Var::new("s"), Var::new("p"), Var::new("o"));
        let pending = Select::vars([&s, &p, &o])
            .pattern(Pattern::graph(scratch.iri(), vec![Pattern::triple(&s, &p, &o)]))
            .pattern(Pattern::not_equal(&s, scratch.iri()))
            .pattern(Pattern::not_equal(&p, Iri::new(vocab::HYDRATED)))
            .pattern(Pattern::not_exists(vec![Pattern::graph(
                scratch.ledger(),
                vec![Pattern::triple(&s, &p, &o)],
            )]))
            .limit(self.settings.batch_size);
        let update = Update::insert(
            vec![
                QuadTemplate::new(&self.audience.target_graph, &s, &p, &o),
                QuadTemplate::new(scratch.ledger(), &s, &p, &o),
            ],
            vec![Pattern::sub_select(pending)],
        );

        let mut committed =
            count_graph(self.store.as_ref(), scratch.ledger(), Privilege::Sudo).await?;
        loop {
            self.store.update(&update, Privilege::Sudo).await?;
            let now = count_graph(self.store.as_ref(), scratch.ledger(), Privilege::Sudo).await?;
            if now == committed {
                return Ok(committed);
            }
            debug!("Committed {} triples", now - committed);
            committed = now;
        }
    }

    async fn teardown(&self, scratch: &ScratchGraph) {
        if self.settings.keep_scratch_graphs {
            info!("Keeping scratch graph {} for inspection", scratch.iri());
            return;
        }
        if let Err(e) = scratch.drop_all(self.store.as_ref()).await {
            warn!("Failed to drop scratch graph {}: {}", scratch.iri(), error_chain(&e));
        }
    }
}

/// Scope the graph patterns of a top-level filter to `graph`.
fn in_graph(graph: &Iri, filter: &Pattern) -> Pattern {
    match filter {
        Pattern::Exists(patterns) => Pattern::exists(vec![Pattern::graph(graph, patterns.clone())]),
        Pattern::NotExists(patterns) => {
            Pattern::not_exists(vec![Pattern::graph(graph, patterns.clone())])
        }
        other => other.clone(),
    }
}

fn describe(scope: &Scope) -> String {
    match scope {
        Scope::All => "all roots".to_string(),
        Scope::Roots(roots) => format!("{} roots", roots.len()),
    }
}
