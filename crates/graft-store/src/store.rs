//! The store access seam and small query helpers built on it

use graft_core::{Iri, Literal, Term};

use crate::error::StoreError;
use crate::query::{Pattern, Select, Solution, Update, Var};

/// Whether a request bypasses the caller-level access control of the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Privilege {
    Caller,
    Sudo,
}

/// Read and write access to a quad store.
#[async_trait::async_trait]
pub trait GraphStore: Send + Sync {
    /// Evaluate a select query and return its solutions.
    async fn select(&self, query: &Select, privilege: Privilege)
    -> Result<Vec<Solution>, StoreError>;

    /// Apply an update.
    async fn update(&self, update: &Update, privilege: Privilege) -> Result<(), StoreError>;

    /// Short name used in logs.
    fn name(&self) -> &str;
}

/// Number of solutions of `patterns`.
pub async fn count(
    store: &dyn GraphStore,
    patterns: Vec<Pattern>,
    privilege: Privilege,
) -> Result<u64, StoreError> {
    let alias = Var::new("count");
    let query = Select::count(&alias).patterns(patterns);
    let solutions = store.select(&query, privilege).await?;

    let Some(row) = solutions.first() else {
        return Ok(0);
    };
    let value = row
        .get(&alias)
        .and_then(Term::as_literal)
        .and_then(Literal::as_integer)
        .ok_or_else(|| StoreError::UnexpectedBinding(format!("count row {:?}", row)))?;
    Ok(value.max(0) as u64)
}

/// Number of triples in one named graph.
pub async fn count_graph(
    store: &dyn GraphStore,
    graph: &Iri,
    privilege: Privilege,
) -> Result<u64, StoreError> {
    let (s, p, o) = (Var::new("s"), Var::new("p"), Var::new("o"));
    count(
        store,
        vec![Pattern::graph(graph, vec![Pattern::triple(&s, &p, &o)])],
        privilege,
    )
    .await
}

/// Run `query` and collect the IRIs bound to `var`, skipping rows where it is
/// unbound. Non-IRI bindings are an error.
pub async fn select_iris(
    store: &dyn GraphStore,
    query: &Select,
    var: &Var,
    privilege: Privilege,
) -> Result<Vec<Iri>, StoreError> {
    let solutions = store.select(query, privilege).await?;
    let mut iris = Vec::with_capacity(solutions.len());
    for row in &solutions {
        match row.get(var) {
            None => continue,
            Some(Term::Iri(iri)) => iris.push(iri.clone()),
            Some(other) => {
                return Err(StoreError::UnexpectedBinding(format!(
                    "{} bound to non-IRI {}",
                    var, other
                )));
            }
        }
    }
    Ok(iris)
}
