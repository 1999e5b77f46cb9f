//! The sync job: resolve affected roots, then distribute every audience

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use graft_core::{ChangeBatch, PathModel, StartupSync, SyncConfig, error_chain};
use graft_scheduler::SyncJob;
use graft_store::GraphStore;
use tracing::{debug, error, info};

use crate::audiences::get_audience;
use crate::error::{DistributeError, Result};
use crate::model::build_model;
use crate::pipeline::{Distributor, DistributorSettings, RunReport, Scope};
use crate::reducer::ChangeReducer;
use crate::scratch::reconcile_orphaned_scratch_graphs;

pub struct SyncService {
    store: Arc<dyn GraphStore>,
    model: Arc<PathModel>,
    reducer: ChangeReducer,
    distributors: Vec<Distributor>,
    backlog: Mutex<Backlog>,
}

impl SyncService {
    pub fn new(
        store: Arc<dyn GraphStore>,
        model: Arc<PathModel>,
        audiences: &[String],
        settings: DistributorSettings,
    ) -> Result<Self> {
        let reducer = ChangeReducer::new(
            Arc::clone(&store),
            Arc::clone(&model),
            settings.source_graph.clone(),
            settings.candidate_block_size,
        );
        let distributors = audiences
            .iter()
            .map(|name| {
                let audience = get_audience(name, &model)?;
                Ok(Distributor::new(Arc::clone(&store), &model, audience, settings.clone()))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            store,
            model,
            reducer,
            distributors,
            backlog: Mutex::new(Backlog::default()),
        })
    }

    /// Build the agenda model and every audience enabled in `config`.
    pub fn from_config(store: Arc<dyn GraphStore>, config: &SyncConfig) -> Result<Self> {
        let model = Arc::new(build_model()?);
        Self::new(store, model, &config.audiences, DistributorSettings::from_config(config))
    }

    pub fn model(&self) -> &PathModel {
        &self.model
    }

    pub fn store(&self) -> &Arc<dyn GraphStore> {
        &self.store
    }

    pub fn audience_names(&self) -> impl Iterator<Item = &str> {
        self.distributors.iter().map(Distributor::name)
    }

    pub fn reducer(&self) -> &ChangeReducer {
        &self.reducer
    }

    /// Run one audience over `scope`.
    pub async fn distribute(&self, audience: &str, scope: &Scope) -> Result<RunReport> {
        self.distributor(audience)?.run(scope).await
    }

    fn distributor(&self, audience: &str) -> Result<&Distributor> {
        self.distributors
            .iter()
            .find(|distributor| distributor.name() == audience)
            .ok_or_else(|| DistributeError::UnknownAudience(audience.to_string()))
    }

    fn backlog(&self) -> MutexGuard<'_, Backlog> {
        self.backlog.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether an earlier run left work behind.
    pub fn has_backlog(&self) -> bool {
        !self.backlog().is_empty()
    }

    /// Resolve the roots touched by `batches` and redistribute them to every
    /// audience in turn. A failing audience does not stop the others; its
    /// scope is kept and retried by the next call, as are batches whose
    /// roots could not be resolved.
    pub async fn sync_batches(&self, batches: &[ChangeBatch]) {
        let (mut pending, mut retries) = self.backlog().take();
        pending.extend_from_slice(batches);

        let roots = match self.reducer.resolve_affected_roots(&pending).await {
            Ok(roots) => roots,
            Err(e) => {
                error!(
                    "Failed to resolve affected roots, keeping {} batches for the next run: {}",
                    pending.len(),
                    error_chain(&e)
                );
                self.backlog().batches.extend(pending);
                BTreeSet::new()
            }
        };
        if roots.is_empty() && retries.is_empty() {
            info!("Changes touch no distributed roots, nothing to distribute");
            return;
        }

        info!("Distributing {} affected roots", roots.len());
        for distributor in &self.distributors {
            let mut scope = Scope::Roots(roots.clone());
            if let Some(retry) = retries.remove(distributor.name()) {
                debug!("Retrying {} for {}", describe_retry(&retry), distributor.name());
                scope = scope.merge(retry);
            }
            if scope.is_empty() {
                continue;
            }
            self.run_or_keep(distributor, scope).await;
        }
    }

    /// Drop leftovers of crashed runs, then run the configured startup syncs.
    /// Failed syncs join the backlog.
    pub async fn startup(&self, reconcile_scratch: bool, syncs: &[StartupSync]) -> Result<()> {
        if reconcile_scratch {
            reconcile_orphaned_scratch_graphs(self.store.as_ref()).await?;
        }
        for sync in syncs {
            let scope = match &sync.roots {
                None => Scope::All,
                Some(roots) => Scope::roots(roots.iter().map(String::as_str)),
            };
            let distributor = self.distributor(&sync.audience)?;
            self.run_or_keep(distributor, scope).await;
        }
        Ok(())
    }

    async fn run_or_keep(&self, distributor: &Distributor, scope: Scope) {
        if let Err(e) = distributor.run(&scope).await {
            error!(
                "Distribution to {} failed, retrying on the next run: {}",
                distributor.name(),
                error_chain(&e)
            );
            self.backlog().retry(distributor.name(), scope);
        }
    }
}

/// Work left behind by failed runs.
#[derive(Debug, Default)]
struct Backlog {
    /// Batches whose roots could not be resolved.
    batches: Vec<ChangeBatch>,
    /// Per audience, the scope of its last failed run.
    scopes: BTreeMap<String, Scope>,
}

impl Backlog {
    fn is_empty(&self) -> bool {
        self.batches.is_empty() && self.scopes.is_empty()
    }

    fn take(&mut self) -> (Vec<ChangeBatch>, BTreeMap<String, Scope>) {
        (std::mem::take(&mut self.batches), std::mem::take(&mut self.scopes))
    }

    fn retry(&mut self, audience: &str, scope: Scope) {
        let merged = match self.scopes.remove(audience) {
            Some(earlier) => earlier.merge(scope),
            None => scope,
        };
        self.scopes.insert(audience.to_string(), merged);
    }
}

fn describe_retry(scope: &Scope) -> String {
    match scope {
        Scope::All => "a full rebuild".to_string(),
        Scope::Roots(roots) => format!("{} roots", roots.len()),
    }
}

#[async_trait::async_trait]
impl SyncJob for SyncService {
    async fn sync(&self, batches: Vec<ChangeBatch>) {
        self.sync_batches(&batches).await;
    }

    fn has_pending(&self) -> bool {
        self.has_backlog()
    }
}
