//! HTTP surface: the delta notification endpoint and a health check

pub mod handlers;
pub mod router;

use std::net::SocketAddr;
use std::sync::Arc;

use graft_scheduler::SchedulerHandle;
use tokio::net::TcpListener;

pub use router::create_router;

/// Shared state handed to every handler.
pub struct ServerState {
    pub scheduler: SchedulerHandle,
    pub version: String,
}

impl ServerState {
    pub fn new(scheduler: SchedulerHandle) -> Self {
        Self {
            scheduler,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

pub struct GraftServer {
    state: Arc<ServerState>,
    config: ServerConfig,
}

impl GraftServer {
    pub fn new(scheduler: SchedulerHandle, config: ServerConfig) -> Self {
        Self {
            state: Arc::new(ServerState::new(scheduler)),
            config,
        }
    }

    pub fn state(&self) -> Arc<ServerState> {
        Arc::clone(&self.state)
    }

    /// Bind the listening socket. Requests are accepted from the moment
    /// [`BoundServer::serve`] runs, even before the scheduler actor does;
    /// notifications wait in the scheduler channel.
    pub async fn bind(self) -> anyhow::Result<BoundServer> {
        let addr: SocketAddr = format!("{}:{}", self.config.host, self.config.port).parse()?;
        let listener = TcpListener::bind(addr).await?;
        Ok(BoundServer {
            listener,
            state: self.state,
        })
    }

    /// Bind and serve until the process is stopped.
    pub async fn start(self) -> anyhow::Result<()> {
        self.bind().await?.serve().await
    }
}

pub struct BoundServer {
    listener: TcpListener,
    state: Arc<ServerState>,
}

impl BoundServer {
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub async fn serve(self) -> anyhow::Result<()> {
        tracing::info!(
            "Listening for delta notifications on http://{}",
            self.listener.local_addr()?
        );
        axum::serve(self.listener, create_router(self.state)).await?;
        Ok(())
    }
}
