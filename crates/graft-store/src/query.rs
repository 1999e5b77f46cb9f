//! Typed query and update algebra
//!
//! Queries are built as values and only turned into text at the HTTP
//! boundary (see `sparql`). The in-memory store evaluates them directly.

use std::collections::BTreeMap;
use std::fmt;

use graft_core::{Iri, Literal, PropertyPath, Term, Triple};

/// A query variable, written `?name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Var(String);

impl Var {
    pub fn new(name: impl Into<String>) -> Self {
        Var(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "?{}", self.0)
    }
}

/// Subject or object position: a variable or a concrete term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TermPattern {
    Var(Var),
    Term(Term),
}

impl From<Var> for TermPattern {
    fn from(value: Var) -> Self {
        TermPattern::Var(value)
    }
}

impl From<&Var> for TermPattern {
    fn from(value: &Var) -> Self {
        TermPattern::Var(value.clone())
    }
}

impl From<Term> for TermPattern {
    fn from(value: Term) -> Self {
        TermPattern::Term(value)
    }
}

impl From<Iri> for TermPattern {
    fn from(value: Iri) -> Self {
        TermPattern::Term(Term::Iri(value))
    }
}

impl From<&Iri> for TermPattern {
    fn from(value: &Iri) -> Self {
        TermPattern::Term(Term::Iri(value.clone()))
    }
}

impl From<Literal> for TermPattern {
    fn from(value: Literal) -> Self {
        TermPattern::Term(Term::Literal(value))
    }
}

/// Predicate position: a variable or a property path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verb {
    Var(Var),
    Path(PropertyPath),
}

impl From<Var> for Verb {
    fn from(value: Var) -> Self {
        Verb::Var(value)
    }
}

impl From<&Var> for Verb {
    fn from(value: &Var) -> Self {
        Verb::Var(value.clone())
    }
}

impl From<PropertyPath> for Verb {
    fn from(value: PropertyPath) -> Self {
        Verb::Path(value)
    }
}

impl From<Iri> for Verb {
    fn from(value: Iri) -> Self {
        Verb::Path(PropertyPath::Predicate(value))
    }
}

impl From<&Iri> for Verb {
    fn from(value: &Iri) -> Self {
        Verb::Path(PropertyPath::Predicate(value.clone()))
    }
}

impl From<&str> for Verb {
    fn from(value: &str) -> Self {
        Verb::Path(PropertyPath::predicate(value))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expression {
    Equal(TermPattern, TermPattern),
    NotEqual(TermPattern, TermPattern),
    In(Var, Vec<Term>),
    NotIn(Var, Vec<Term>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pattern {
    Triple {
        subject: TermPattern,
        verb: Verb,
        object: TermPattern,
    },
    Graph {
        name: TermPattern,
        patterns: Vec<Pattern>,
    },
    Values {
        var: Var,
        terms: Vec<Term>,
    },
    Filter(Expression),
    Exists(Vec<Pattern>),
    NotExists(Vec<Pattern>),
    Union(Vec<Vec<Pattern>>),
    SubSelect(Box<Select>),
}

impl Pattern {
    pub fn triple(
        subject: impl Into<TermPattern>,
        verb: impl Into<Verb>,
        object: impl Into<TermPattern>,
    ) -> Self {
        Pattern::Triple {
            subject: subject.into(),
            verb: verb.into(),
            object: object.into(),
        }
    }

    pub fn graph(name: impl Into<TermPattern>, patterns: Vec<Pattern>) -> Self {
        Pattern::Graph {
            name: name.into(),
            patterns,
        }
    }

    pub fn values<T: Into<Term>>(var: &Var, terms: impl IntoIterator<Item = T>) -> Self {
        Pattern::Values {
            var: var.clone(),
            terms: terms.into_iter().map(Into::into).collect(),
        }
    }

    pub fn not_exists(patterns: Vec<Pattern>) -> Self {
        Pattern::NotExists(patterns)
    }

    pub fn exists(patterns: Vec<Pattern>) -> Self {
        Pattern::Exists(patterns)
    }

    pub fn union(branches: Vec<Vec<Pattern>>) -> Self {
        Pattern::Union(branches)
    }

    pub fn sub_select(select: Select) -> Self {
        Pattern::SubSelect(Box::new(select))
    }

    pub fn not_equal(left: impl Into<TermPattern>, right: impl Into<TermPattern>) -> Self {
        Pattern::Filter(Expression::NotEqual(left.into(), right.into()))
    }

    pub fn not_in<T: Into<Term>>(var: &Var, terms: impl IntoIterator<Item = T>) -> Self {
        Pattern::Filter(Expression::NotIn(
            var.clone(),
            terms.into_iter().map(Into::into).collect(),
        ))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Projection {
    /// Empty means every variable in scope.
    Vars(Vec<Var>),
    /// `(COUNT(*) AS ?alias)`
    Count(Var),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Select {
    pub distinct: bool,
    pub projection: Projection,
    pub patterns: Vec<Pattern>,
    pub limit: Option<usize>,
}

impl Select {
    pub fn vars<'a>(vars: impl IntoIterator<Item = &'a Var>) -> Self {
        Select {
            distinct: false,
            projection: Projection::Vars(vars.into_iter().cloned().collect()),
            patterns: Vec::new(),
            limit: None,
        }
    }

    pub fn count(alias: &Var) -> Self {
        Select {
            distinct: false,
            projection: Projection::Count(alias.clone()),
            patterns: Vec::new(),
            limit: None,
        }
    }

    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    pub fn pattern(mut self, pattern: Pattern) -> Self {
        self.patterns.push(pattern);
        self
    }

    pub fn patterns(mut self, patterns: impl IntoIterator<Item = Pattern>) -> Self {
        self.patterns.extend(patterns);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// One quad of an `INSERT`/`DELETE` template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuadTemplate {
    pub graph: Iri,
    pub subject: TermPattern,
    pub predicate: TermPattern,
    pub object: TermPattern,
}

impl QuadTemplate {
    pub fn new(
        graph: &Iri,
        subject: impl Into<TermPattern>,
        predicate: impl Into<TermPattern>,
        object: impl Into<TermPattern>,
    ) -> Self {
        QuadTemplate {
            graph: graph.clone(),
            subject: subject.into(),
            predicate: predicate.into(),
            object: object.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Update {
    InsertData {
        graph: Iri,
        triples: Vec<Triple>,
    },
    Modify {
        delete: Vec<QuadTemplate>,
        insert: Vec<QuadTemplate>,
        patterns: Vec<Pattern>,
    },
    DropGraph {
        graph: Iri,
    },
}

impl Update {
    pub fn insert_data(graph: &Iri, triples: Vec<Triple>) -> Self {
        Update::InsertData {
            graph: graph.clone(),
            triples,
        }
    }

    pub fn insert(templates: Vec<QuadTemplate>, patterns: Vec<Pattern>) -> Self {
        Update::Modify {
            delete: Vec::new(),
            insert: templates,
            patterns,
        }
    }

    pub fn delete(templates: Vec<QuadTemplate>, patterns: Vec<Pattern>) -> Self {
        Update::Modify {
            delete: templates,
            insert: Vec::new(),
            patterns,
        }
    }

    pub fn drop_graph(graph: &Iri) -> Self {
        Update::DropGraph {
            graph: graph.clone(),
        }
    }
}

/// One row of a query result.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Solution(BTreeMap<Var, Term>);

impl Solution {
    pub fn new() -> Self {
        Solution(BTreeMap::new())
    }

    pub fn get(&self, var: &Var) -> Option<&Term> {
        self.0.get(var)
    }

    pub fn iri(&self, var: &Var) -> Option<&Iri> {
        self.0.get(var).and_then(Term::as_iri)
    }

    pub fn insert(&mut self, var: Var, term: Term) {
        self.0.insert(var, term);
    }

    pub fn with(mut self, var: &Var, term: impl Into<Term>) -> Self {
        self.0.insert(var.clone(), term.into());
        self
    }

    pub fn is_bound(&self, var: &Var) -> bool {
        self.0.contains_key(var)
    }

    pub fn vars(&self) -> impl Iterator<Item = &Var> {
        self.0.keys()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Keep only the given variables.
    pub fn project(&self, vars: &[Var]) -> Solution {
        Solution(
            self.0
                .iter()
                .filter(|(var, _)| vars.contains(var))
                .map(|(var, term)| (var.clone(), term.clone()))
                .collect(),
        )
    }

    /// Merge two solutions when they agree on every shared variable.
    pub fn merge(&self, other: &Solution) -> Option<Solution> {
        let mut merged = self.clone();
        for (var, term) in &other.0 {
            match merged.0.get(var) {
                Some(existing) if existing != term => return None,
                Some(_) => {}
                None => {
                    merged.0.insert(var.clone(), term.clone());
                }
            }
        }
        Some(merged)
    }
}
