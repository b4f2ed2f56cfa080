//! Repogate - HTTP gateway over git repositories
//!
//! Exposes repository status, staging, commits, merges and remotes as HTTP
//! resources. Clone, fetch and push run as tasks that clients poll.

pub mod commands;
pub mod config;
pub mod error;
pub mod models;
pub mod services;

#[cfg(test)]
mod test_utils;

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use config::GatewayConfig;
use services::{TaskRegistry, Workspace};

/// State shared by every request handler
pub struct AppState {
    pub config: GatewayConfig,
    pub tasks: TaskRegistry,
    pub workspace: Workspace,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    /// Build state from configuration, restoring persisted projects
    pub fn new(config: GatewayConfig) -> error::Result<Self> {
        let workspace =
            Workspace::load(config.workspace_root.clone(), config.projects_file.clone())?;
        let tasks = TaskRegistry::new(config.task_retention());
        Ok(Self {
            config,
            tasks,
            workspace,
        })
    }

    pub fn shared(self) -> SharedState {
        Arc::new(self)
    }
}

/// Evict expired tasks on a fixed interval until the runtime shuts down
pub fn spawn_task_sweeper(state: &SharedState) -> tokio::task::JoinHandle<()> {
    let tasks = state.tasks.clone();
    let period = state.config.sweep_interval();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;
            tasks.sweep();
        }
    })
}

/// Initialize and serve the gateway
pub async fn run() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "repogate=debug,git2=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Repogate");

    let config = GatewayConfig::discover()?;
    let bind = config.bind.clone();
    tracing::info!(
        "Workspace root: {}, protocol header: {}",
        config.workspace_root.display(),
        config.protocol_header
    );

    let state = AppState::new(config)?.shared();
    let sweeper = spawn_task_sweeper(&state);
    let app = commands::router(state);

    let listener = tokio::net::TcpListener::bind(&bind).await?;
    tracing::info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!("Failed to listen for shutdown signal: {}", e);
            }
            tracing::info!("Shutting down");
        })
        .await?;

    sweeper.abort();
    Ok(())
}
