//! Graft CLI entry point

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "graft")]
#[command(about = "Incremental distribution of access-scoped agenda views", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// TOML configuration file
    #[arg(short, long, global = true, env = "GRAFT_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Accept delta notifications and keep every view up to date
    Serve {
        /// Port to listen on
        #[arg(short, long, env = "GRAFT_PORT")]
        port: Option<u16>,

        /// Host to bind to
        #[arg(long, env = "GRAFT_HOST")]
        host: Option<String>,
    },
    /// Run the pipeline once for one audience
    Sync {
        /// Audience to distribute
        #[arg(short, long)]
        audience: String,

        /// Limit the run to these agendas; a full rebuild when omitted
        #[arg(long = "root")]
        roots: Vec<String>,
    },
    /// Drop scratch graphs left behind by interrupted runs
    Cleanup,
    /// Print the compiled paths from a type to the agenda
    Paths {
        /// Type IRI
        type_iri: String,
    },
    /// Show version
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let mut config = commands::load_config(cli.config.as_deref())?;
    config.verbose |= cli.verbose;

    // Initialize logging
    let log_level = if config.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(log_directives(log_level)))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Graft v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Serve { port, host } => {
            if let Some(port) = port {
                config.port = port;
            }
            if let Some(host) = host {
                config.host = host;
            }
            commands::serve(config).await
        }
        Commands::Sync { audience, roots } => commands::sync(config, audience, roots).await,
        Commands::Cleanup => commands::cleanup(config).await,
        Commands::Paths { type_iri } => commands::paths(&type_iri),
        Commands::Version => {
            println!("Graft v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

/// Every workspace crate logs under its own target.
fn log_directives(level: &str) -> String {
    [
        "graft",
        "graft_core",
        "graft_store",
        "graft_scheduler",
        "graft_distributor",
        "graft_server",
        "tower_http",
    ]
    .iter()
    .map(|target| format!("{}={}", target, level))
    .collect::<Vec<_>>()
    .join(",")
}
