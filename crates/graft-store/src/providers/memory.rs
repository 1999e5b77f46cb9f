//! In-memory quad store evaluating the query algebra directly
//!
//! Triples outside a `GRAPH` block match against the union of all named
//! graphs, the way the default dataset of the production store behaves.
//! Nested groups (`GRAPH`, `UNION`) are evaluated on their own and joined
//! with the enclosing group afterwards, so a filter inside a nested group
//! only sees the variables bound in that group. `EXISTS` is the exception:
//! it substitutes the current solution into everything it contains.
//! Every request is also rendered to text first so that anything the HTTP
//! client would reject is rejected here as well.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicUsize, Ordering};

use graft_core::{Iri, Literal, PropertyPath, Term, Triple};
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::StoreError;
use crate::query::{
    Expression, Pattern, Projection, QuadTemplate, Select, Solution, TermPattern, Update, Var, Verb,
};
use crate::sparql::{render_select, render_update};
use crate::store::{GraphStore, Privilege};

type Quads = BTreeMap<Iri, BTreeSet<Triple>>;

const UNLIMITED: usize = usize::MAX;

pub struct MemoryStore {
    graphs: RwLock<Quads>,
    selects: AtomicUsize,
    updates: AtomicUsize,
    update_budget: AtomicUsize,
    select_budget: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            graphs: RwLock::new(BTreeMap::new()),
            selects: AtomicUsize::new(0),
            updates: AtomicUsize::new(0),
            update_budget: AtomicUsize::new(UNLIMITED),
            select_budget: AtomicUsize::new(UNLIMITED),
        }
    }

    pub async fn insert_triples(&self, graph: &Iri, triples: impl IntoIterator<Item = Triple>) {
        let mut graphs = self.graphs.write().await;
        graphs.entry(graph.clone()).or_default().extend(triples);
        graphs.retain(|_, triples| !triples.is_empty());
    }

    pub async fn remove_triples(&self, graph: &Iri, triples: impl IntoIterator<Item = Triple>) {
        let mut graphs = self.graphs.write().await;
        if let Some(existing) = graphs.get_mut(graph) {
            for triple in triples {
                existing.remove(&triple);
            }
        }
        graphs.retain(|_, triples| !triples.is_empty());
    }

    /// Contents of one graph. Missing graphs are empty.
    pub async fn triples(&self, graph: &Iri) -> BTreeSet<Triple> {
        self.graphs.read().await.get(graph).cloned().unwrap_or_default()
    }

    pub async fn contains(&self, graph: &Iri, triple: &Triple) -> bool {
        self.graphs
            .read()
            .await
            .get(graph)
            .is_some_and(|triples| triples.contains(triple))
    }

    /// Names of all non-empty graphs.
    pub async fn graph_names(&self) -> Vec<Iri> {
        self.graphs.read().await.keys().cloned().collect()
    }

    pub fn select_count(&self) -> usize {
        self.selects.load(Ordering::Relaxed)
    }

    pub fn update_count(&self) -> usize {
        self.updates.load(Ordering::Relaxed)
    }

    /// Let `n` more writes through, then reject every write except graph
    /// drops until [`MemoryStore::heal`] is called.
    pub fn fail_updates_after(&self, n: usize) {
        self.update_budget.store(n, Ordering::SeqCst);
    }

    /// Let `n` more queries through, then reject every query until
    /// [`MemoryStore::heal`] is called.
    pub fn fail_selects_after(&self, n: usize) {
        self.select_budget.store(n, Ordering::SeqCst);
    }

    pub fn heal(&self) {
        self.update_budget.store(UNLIMITED, Ordering::SeqCst);
        self.select_budget.store(UNLIMITED, Ordering::SeqCst);
    }
}

fn take_budget(budget: &AtomicUsize) -> bool {
    budget
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| match left {
            UNLIMITED => Some(UNLIMITED),
            0 => None,
            n => Some(n - 1),
        })
        .is_ok()
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl GraphStore for MemoryStore {
    async fn select(
        &self,
        query: &Select,
        _privilege: Privilege,
    ) -> Result<Vec<Solution>, StoreError> {
        let text = render_select(query)?;
        debug!("memory query: {}", text);
        if !take_budget(&self.select_budget) {
            return Err(StoreError::Injected(text));
        }
        self.selects.fetch_add(1, Ordering::Relaxed);

        let graphs = self.graphs.read().await;
        Ok(Evaluator::new(&graphs).select(query, Scope::Union))
    }

    async fn update(&self, update: &Update, _privilege: Privilege) -> Result<(), StoreError> {
        let text = render_update(update)?;
        debug!("memory update: {}", text);

        if !matches!(update, Update::DropGraph { .. }) && !take_budget(&self.update_budget) {
            return Err(StoreError::Injected(text));
        }
        self.updates.fetch_add(1, Ordering::Relaxed);

        let mut graphs = self.graphs.write().await;
        apply(&mut graphs, update);
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

fn apply(graphs: &mut Quads, update: &Update) {
    match update {
        Update::InsertData { graph, triples } => {
            graphs
                .entry(graph.clone())
                .or_default()
                .extend(triples.iter().cloned());
        }
        Update::Modify {
            delete,
            insert,
            patterns,
        } => {
            let solutions =
                Evaluator::new(graphs).group(patterns, Scope::Union, vec![Solution::new()]);
            let removals = instantiate(delete, &solutions);
            let additions = instantiate(insert, &solutions);

            for (graph, triple) in removals {
                if let Some(triples) = graphs.get_mut(&graph) {
                    triples.remove(&triple);
                }
            }
            for (graph, triple) in additions {
                graphs.entry(graph).or_default().insert(triple);
            }
        }
        Update::DropGraph { graph } => {
            graphs.remove(graph);
        }
    }
    graphs.retain(|_, triples| !triples.is_empty());
}

/// Fill the templates from each solution. Quads with an unbound or
/// ill-typed position are skipped.
fn instantiate(templates: &[QuadTemplate], solutions: &[Solution]) -> Vec<(Iri, Triple)> {
    let mut quads = Vec::new();
    for solution in solutions {
        for template in templates {
            let (Some(subject), Some(Term::Iri(predicate)), Some(object)) = (
                resolve(&template.subject, solution),
                resolve(&template.predicate, solution),
                resolve(&template.object, solution),
            ) else {
                continue;
            };
            if matches!(subject, Term::Literal(_)) {
                continue;
            }
            quads.push((
                template.graph.clone(),
                Triple::new(subject.clone(), predicate.clone(), object.clone()),
            ));
        }
    }
    quads
}

fn resolve<'s>(pattern: &'s TermPattern, solution: &'s Solution) -> Option<&'s Term> {
    match pattern {
        TermPattern::Term(term) => Some(term),
        TermPattern::Var(var) => solution.get(var),
    }
}

/// Extend `solution` so that `pattern` matches `term`.
fn bind(pattern: &TermPattern, term: &Term, solution: &Solution) -> Option<Solution> {
    match pattern {
        TermPattern::Term(fixed) => (fixed == term).then(|| solution.clone()),
        TermPattern::Var(var) => bind_var(var, term, solution),
    }
}

fn bind_var(var: &Var, term: &Term, solution: &Solution) -> Option<Solution> {
    match solution.get(var) {
        Some(existing) if existing != term => None,
        Some(_) => Some(solution.clone()),
        None => Some(solution.clone().with(var, term.clone())),
    }
}

#[derive(Clone, Copy)]
enum Scope<'g> {
    Union,
    Named(&'g Iri),
}

struct Evaluator<'a> {
    graphs: &'a Quads,
    /// Bindings substituted by an enclosing `EXISTS`.
    outer: Solution,
}

impl<'a> Evaluator<'a> {
    fn new(graphs: &'a Quads) -> Self {
        Self {
            graphs,
            outer: Solution::new(),
        }
    }

    fn substituting(&self, solution: &Solution) -> Self {
        Self {
            graphs: self.graphs,
            outer: solution.clone(),
        }
    }

    /// Solutions of a nested group, before joining with the enclosing one.
    fn nested(&self, patterns: &[Pattern], scope: Scope<'_>) -> Vec<Solution> {
        self.group(patterns, scope, vec![self.outer.clone()])
    }

    fn select(&self, select: &Select, scope: Scope<'_>) -> Vec<Solution> {
        let solutions =
            Evaluator::new(self.graphs).group(&select.patterns, scope, vec![Solution::new()]);

        let mut rows: Vec<Solution> = match &select.projection {
            Projection::Count(alias) => {
                return vec![Solution::new().with(alias, Literal::integer(solutions.len() as i64))];
            }
            Projection::Vars(vars) if vars.is_empty() => solutions,
            Projection::Vars(vars) => solutions.iter().map(|row| row.project(vars)).collect(),
        };

        if select.distinct {
            let mut seen = BTreeSet::new();
            rows.retain(|row| seen.insert(row.clone()));
        }
        if let Some(limit) = select.limit {
            rows.truncate(limit);
        }
        rows
    }

    /// Join the patterns of a group left to right. Filters apply to the
    /// whole group, wherever they appear in it.
    fn group(&self, patterns: &[Pattern], scope: Scope<'_>, seeds: Vec<Solution>) -> Vec<Solution> {
        let mut solutions = seeds;
        let mut filters = Vec::new();
        for pattern in patterns {
            match pattern {
                Pattern::Filter(_) | Pattern::Exists(_) | Pattern::NotExists(_) => {
                    filters.push(pattern)
                }
                _ => solutions = self.pattern(pattern, scope, solutions),
            }
            if solutions.is_empty() {
                return solutions;
            }
        }
        solutions.retain(|solution| {
            filters
                .iter()
                .all(|filter| self.passes(filter, scope, solution))
        });
        solutions
    }

    fn pattern(
        &self,
        pattern: &Pattern,
        scope: Scope<'_>,
        solutions: Vec<Solution>,
    ) -> Vec<Solution> {
        let mut out = Vec::new();
        match pattern {
            Pattern::Triple {
                subject,
                verb: Verb::Var(predicate),
                object,
            } => {
                let triples = self.triples_in(scope);
                for solution in &solutions {
                    for triple in &triples {
                        let joined = bind(subject, &triple.subject, solution)
                            .and_then(|s| {
                                bind_var(predicate, &Term::Iri(triple.predicate.clone()), &s)
                            })
                            .and_then(|s| bind(object, &triple.object, &s));
                        out.extend(joined);
                    }
                }
            }
            Pattern::Triple {
                subject,
                verb: Verb::Path(path),
                object,
            } => {
                let pairs = self.path_pairs(path, scope);
                for solution in &solutions {
                    for (start, end) in &pairs {
                        let joined =
                            bind(subject, start, solution).and_then(|s| bind(object, end, &s));
                        out.extend(joined);
                    }
                }
            }
            Pattern::Graph { name, patterns } => {
                let rows = match name {
                    TermPattern::Term(Term::Iri(graph)) => {
                        self.nested(patterns, Scope::Named(graph))
                    }
                    TermPattern::Term(_) => Vec::new(),
                    TermPattern::Var(var) => self
                        .graphs
                        .keys()
                        .filter_map(|graph| {
                            let seed = bind_var(var, &Term::Iri(graph.clone()), &self.outer)?;
                            Some(self.group(patterns, Scope::Named(graph), vec![seed]))
                        })
                        .flatten()
                        .collect(),
                };
                out = join(&solutions, &rows);
            }
            Pattern::Values { var, terms } => {
                for solution in &solutions {
                    out.extend(terms.iter().filter_map(|term| bind_var(var, term, solution)));
                }
            }
            Pattern::Union(branches) => {
                let rows: Vec<Solution> = branches
                    .iter()
                    .flat_map(|branch| self.nested(branch, scope))
                    .collect();
                out = join(&solutions, &rows);
            }
            Pattern::SubSelect(select) => {
                let rows = self.select(select, scope);
                for solution in &solutions {
                    out.extend(rows.iter().filter_map(|row| solution.merge(row)));
                }
            }
            Pattern::Filter(_) | Pattern::Exists(_) | Pattern::NotExists(_) => {
                return solutions
                    .into_iter()
                    .filter(|solution| self.passes(pattern, scope, solution))
                    .collect();
            }
        }
        out
    }

    fn passes(&self, pattern: &Pattern, scope: Scope<'_>, solution: &Solution) -> bool {
        match pattern {
            Pattern::Filter(expression) => holds(expression, solution),
            Pattern::Exists(patterns) => !self
                .substituting(solution)
                .group(patterns, scope, vec![solution.clone()])
                .is_empty(),
            Pattern::NotExists(patterns) => self
                .substituting(solution)
                .group(patterns, scope, vec![solution.clone()])
                .is_empty(),
            _ => true,
        }
    }

    fn triples_in(&self, scope: Scope<'_>) -> BTreeSet<&'a Triple> {
        match scope {
            Scope::Union => self.graphs.values().flatten().collect(),
            Scope::Named(graph) => self
                .graphs
                .get(graph)
                .map(|triples| triples.iter().collect())
                .unwrap_or_default(),
        }
    }

    fn path_pairs(&self, path: &PropertyPath, scope: Scope<'_>) -> BTreeSet<(Term, Term)> {
        match path {
            PropertyPath::Predicate(predicate) => self
                .triples_in(scope)
                .into_iter()
                .filter(|triple| &triple.predicate == predicate)
                .map(|triple| (triple.subject.clone(), triple.object.clone()))
                .collect(),
            PropertyPath::Inverse(inner) => self
                .path_pairs(inner, scope)
                .into_iter()
                .map(|(start, end)| (end, start))
                .collect(),
            PropertyPath::Alternative(parts) => parts
                .iter()
                .flat_map(|part| self.path_pairs(part, scope))
                .collect(),
            PropertyPath::Sequence(parts) => {
                let mut parts = parts.iter();
                let Some(first) = parts.next() else {
                    return self.identity_pairs(scope);
                };
                let mut current = self.path_pairs(first, scope);
                for part in parts {
                    let next = self.path_pairs(part, scope);
                    let mut by_start: BTreeMap<&Term, Vec<&Term>> = BTreeMap::new();
                    for (start, end) in &next {
                        by_start.entry(start).or_default().push(end);
                    }
                    current = current
                        .iter()
                        .flat_map(|(start, middle)| {
                            by_start
                                .get(middle)
                                .into_iter()
                                .flatten()
                                .map(move |end| (start.clone(), (*end).clone()))
                        })
                        .collect();
                }
                current
            }
        }
    }

    fn identity_pairs(&self, scope: Scope<'_>) -> BTreeSet<(Term, Term)> {
        self.triples_in(scope)
            .into_iter()
            .flat_map(|triple| [&triple.subject, &triple.object])
            .map(|node| (node.clone(), node.clone()))
            .collect()
    }
}

fn join(left: &[Solution], right: &[Solution]) -> Vec<Solution> {
    left.iter()
        .flat_map(|row| right.iter().filter_map(move |other| row.merge(other)))
        .collect()
}

fn holds(expression: &Expression, solution: &Solution) -> bool {
    match expression {
        Expression::Equal(left, right) => {
            match (resolve(left, solution), resolve(right, solution)) {
                (Some(left), Some(right)) => left == right,
                _ => false,
            }
        }
        Expression::NotEqual(left, right) => {
            match (resolve(left, solution), resolve(right, solution)) {
                (Some(left), Some(right)) => left != right,
                _ => false,
            }
        }
        Expression::In(var, terms) => solution.get(var).is_some_and(|term| terms.contains(term)),
        Expression::NotIn(var, terms) => {
            solution.get(var).is_some_and(|term| !terms.contains(term))
        }
    }
}
