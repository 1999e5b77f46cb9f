//! Service configuration
//!
//! Values come from three layers, later ones winning: built-in defaults, an
//! optional TOML file, and environment variables.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const DEFAULT_AUDIENCES: [&str; 4] = ["minister", "cabinet", "government", "public"];

/// A distribution to run once when the service starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartupSync {
    pub audience: String,
    /// Root entities to distribute; absent means a full rebuild.
    #[serde(default)]
    pub roots: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub sparql_endpoint: String,
    pub source_graph: String,
    /// Heartbeat interval of the scheduler.
    pub interval_ms: u64,
    /// Identifiers per `VALUES` block in candidate and seed queries.
    pub candidate_block_size: usize,
    /// Rows per batch in closure, reconciliation and commit updates.
    pub batch_size: usize,
    pub max_attempts: u32,
    /// Base delay; attempt `n` waits `n * backoff_ms`.
    pub backoff_ms: u64,
    pub audiences: Vec<String>,
    pub startup: Vec<StartupSync>,
    pub verbose: bool,
    pub keep_scratch_graphs: bool,
    pub reconcile_scratch_on_startup: bool,
    pub host: String,
    pub port: u16,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            sparql_endpoint: "http://database:8890/sparql".to_string(),
            source_graph: "http://mu.semte.ch/graphs/organizations/kanselarij".to_string(),
            interval_ms: 10_000,
            candidate_block_size: 100,
            batch_size: 500,
            max_attempts: 5,
            backoff_ms: 1_000,
            audiences: DEFAULT_AUDIENCES.iter().map(|a| a.to_string()).collect(),
            startup: Vec::new(),
            verbose: false,
            keep_scratch_graphs: false,
            reconcile_scratch_on_startup: true,
            host: "0.0.0.0".to_string(),
            port: 80,
        }
    }
}

impl SyncConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any key lookup.
    pub fn apply_env_from(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(value) = lookup("MU_SPARQL_ENDPOINT") {
            self.sparql_endpoint = value;
        }
        if let Some(value) = lookup("GRAFT_SOURCE_GRAPH") {
            self.source_graph = value;
        }
        if let Some(value) = lookup("GRAFT_INTERVAL_MS") {
            self.interval_ms = parse_env("GRAFT_INTERVAL_MS", value)?;
        }
        if let Some(value) = lookup("GRAFT_CANDIDATE_BLOCK_SIZE") {
            self.candidate_block_size = parse_env("GRAFT_CANDIDATE_BLOCK_SIZE", value)?;
        }
        if let Some(value) = lookup("GRAFT_BATCH_SIZE") {
            self.batch_size = parse_env("GRAFT_BATCH_SIZE", value)?;
        }
        if let Some(value) = lookup("GRAFT_MAX_ATTEMPTS") {
            self.max_attempts = parse_env("GRAFT_MAX_ATTEMPTS", value)?;
        }
        if let Some(value) = lookup("GRAFT_BACKOFF_MS") {
            self.backoff_ms = parse_env("GRAFT_BACKOFF_MS", value)?;
        }
        if let Some(value) = lookup("GRAFT_AUDIENCES") {
            self.audiences = value
                .split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(value) = lookup("GRAFT_VERBOSE") {
            self.verbose = parse_flag("GRAFT_VERBOSE", value)?;
        }
        if let Some(value) = lookup("GRAFT_KEEP_SCRATCH_GRAPHS") {
            self.keep_scratch_graphs = parse_flag("GRAFT_KEEP_SCRATCH_GRAPHS", value)?;
        }
        if let Some(value) = lookup("GRAFT_RECONCILE_SCRATCH_ON_STARTUP") {
            self.reconcile_scratch_on_startup =
                parse_flag("GRAFT_RECONCILE_SCRATCH_ON_STARTUP", value)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interval_ms == 0 {
            return Err(ConfigError::Invalid("interval_ms must be positive".to_string()));
        }
        if self.candidate_block_size == 0 {
            return Err(ConfigError::Invalid(
                "candidate_block_size must be positive".to_string(),
            ));
        }
        if self.batch_size == 0 {
            return Err(ConfigError::Invalid("batch_size must be positive".to_string()));
        }
        if self.max_attempts == 0 {
            return Err(ConfigError::Invalid("max_attempts must be positive".to_string()));
        }
        for audience in &self.audiences {
            if !DEFAULT_AUDIENCES.contains(&audience.as_str()) {
                return Err(ConfigError::Invalid(format!("unknown audience {}", audience)));
            }
        }
        for startup in &self.startup {
            if !self.audiences.contains(&startup.audience) {
                return Err(ConfigError::Invalid(format!(
                    "startup sync for disabled audience {}",
                    startup.audience
                )));
            }
        }
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidEnv {
            key: key.to_string(),
            value,
        })
}

fn parse_flag(key: &str, value: String) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => Err(ConfigError::InvalidEnv {
            key: key.to_string(),
            value,
        }),
    }
}
