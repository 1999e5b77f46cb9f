//! CLI command implementations

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use graft_core::{Iri, Resolution, SyncConfig};
use graft_distributor::{Scope, SyncService, build_model, reconcile_orphaned_scratch_graphs};
use graft_scheduler::Scheduler;
use graft_server::{GraftServer, ServerConfig};
use graft_store::{GraphStore, RetryPolicy, create_store};

/// Defaults, then the config file, then the environment.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<SyncConfig> {
    let mut config = match path {
        Some(path) => SyncConfig::from_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => SyncConfig::default(),
    };
    config.apply_env().context("reading environment overrides")?;
    config.validate().context("invalid configuration")?;
    Ok(config)
}

fn open_store(config: &SyncConfig) -> anyhow::Result<Arc<dyn GraphStore>> {
    let retry = RetryPolicy::new(config.max_attempts, config.backoff());
    let store = create_store(&config.sparql_endpoint, retry)
        .with_context(|| format!("connecting to {}", config.sparql_endpoint))?;
    tracing::info!("Using {} store at {}", store.name(), config.sparql_endpoint);
    Ok(store)
}

pub async fn serve(config: SyncConfig) -> anyhow::Result<()> {
    tracing::info!(
        "Distributing {} to {} audiences",
        config.source_graph,
        config.audiences.len()
    );

    let store = open_store(&config)?;
    let service = Arc::new(SyncService::from_config(store, &config)?);

    // Listen first so notifications sent during startup queue up in the
    // scheduler channel instead of being refused.
    let (scheduler, handle) = Scheduler::new(Arc::clone(&service), config.interval());
    let server = GraftServer::new(
        handle,
        ServerConfig {
            host: config.host.clone(),
            port: config.port,
        },
    )
    .bind()
    .await
    .context("binding the delta endpoint")?;
    let serving = tokio::spawn(server.serve());

    service
        .startup(config.reconcile_scratch_on_startup, &config.startup)
        .await
        .context("startup reconciliation failed")?;
    tokio::spawn(scheduler.run());

    serving.await.context("delta endpoint task failed")?
}

pub async fn sync(config: SyncConfig, audience: String, roots: Vec<String>) -> anyhow::Result<()> {
    let store = open_store(&config)?;
    let service = SyncService::from_config(store, &config)?;
    let scope = if roots.is_empty() {
        Scope::All
    } else {
        Scope::roots(roots)
    };

    let report = service
        .distribute(&audience, &scope)
        .await
        .with_context(|| format!("distributing {}", audience))?;

    println!("audience          {}", report.audience);
    println!("roots seeded      {}", report.roots_seeded);
    for step in &report.steps {
        println!("  {} -> {}: {}", step.from_type, step.to_type, step.lineage_added);
    }
    println!("closure passes    {}", report.closure_passes);
    println!("hydrated          {}", report.resources_hydrated);
    println!("triples removed   {}", report.triples_removed);
    println!("triples committed {}", report.triples_committed);
    println!("elapsed           {:?}", report.elapsed);
    Ok(())
}

pub async fn cleanup(config: SyncConfig) -> anyhow::Result<()> {
    let store = open_store(&config)?;
    let dropped = reconcile_orphaned_scratch_graphs(store.as_ref()).await?;
    println!("Dropped {} scratch graphs", dropped);
    Ok(())
}

pub fn paths(type_iri: &str) -> anyhow::Result<()> {
    let model = build_model()?;
    match model.compile(&Iri::new(type_iri)) {
        Resolution::NotRelevant => println!("{} is not part of the agenda model", type_iri),
        Resolution::Relevant(paths) => {
            for path in paths.iter() {
                println!("{}", path);
            }
        }
    }
    Ok(())
}
