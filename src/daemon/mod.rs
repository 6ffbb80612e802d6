//! Daemon mode: models stay loaded, sessions live in memory, clients talk
//! over the IPC socket.

pub mod handler;

use crate::app::build_pipeline;
use crate::config::Config;
use crate::conversation::SessionRegistry;
use crate::error::{Result, VoiceLoopError};
use crate::ipc::server::IpcServer;
use crate::pipeline::TurnOrchestrator;
use crate::storage::ArtifactStore;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Daemon state: the wired pipeline plus one history per session.
#[derive(Debug)]
pub struct DaemonState {
    pub orchestrator: TurnOrchestrator,
    pub sessions: SessionRegistry,
    pub store: ArtifactStore,
}

impl DaemonState {
    pub fn new(orchestrator: TurnOrchestrator, store: ArtifactStore, max_turns: usize) -> Self {
        Self {
            orchestrator,
            sessions: SessionRegistry::new(max_turns),
            store,
        }
    }
}

/// Run the daemon: load models, start IPC server, wait for shutdown.
///
/// Shutdown comes from SIGINT, SIGTERM or a `shutdown` command.
pub async fn run_daemon(config: Config, socket_path: Option<PathBuf>) -> Result<()> {
    info!(model = %config.stt.model, "loading models");
    let (orchestrator, store) = build_pipeline(&config)?;
    info!(
        transcriber = orchestrator.transcriber_name(),
        chat_model = orchestrator.chat_model_name(),
        "models loaded"
    );

    let retention = config.storage.retention()?;
    let state = Arc::new(DaemonState::new(
        orchestrator,
        store.clone(),
        config.conversation.max_turns,
    ));

    let socket_path = socket_path.unwrap_or_else(IpcServer::default_socket_path);
    let server = Arc::new(IpcServer::new(socket_path)?);
    info!(socket = %server.socket_path().display(), "daemon ready");

    let handler = handler::DaemonCommandHandler::new(state, server.shutdown_handle());

    let server_clone = Arc::clone(&server);
    let mut server_handle = tokio::spawn(async move { server_clone.start(handler).await });
    let sweeper = retention.map(|max_age| spawn_sweeper(store, max_age));

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("received SIGINT, shutting down");
        }
        res = wait_for_sigterm() => {
            if let Err(e) = res {
                error!("error setting up signal handler: {}", e);
            }
            info!("received SIGTERM, shutting down");
        }
        res = &mut server_handle => {
            match res {
                Ok(Ok(())) => info!("shutdown requested over IPC"),
                Ok(Err(e)) => error!("IPC server failed: {}", e),
                Err(e) => error!("IPC server task failed: {}", e),
            }
        }
    }

    if let Some(sweeper) = sweeper {
        sweeper.abort();
    }

    server.stop().await?;

    if !server_handle.is_finished()
        && let Err(e) = server_handle.await
    {
        warn!("daemon server task failed: {e}");
    }

    info!("daemon stopped");
    Ok(())
}

/// How often to sweep for a given retention window.
pub fn sweep_interval(retention: Duration) -> Duration {
    (retention / 2).clamp(Duration::from_secs(1), Duration::from_secs(600))
}

/// Delete expired artifacts periodically until aborted.
fn spawn_sweeper(store: ArtifactStore, retention: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(sweep_interval(retention));
        loop {
            ticker.tick().await;
            let sweep_store = store.clone();
            match tokio::task::spawn_blocking(move || sweep_store.sweep(retention)).await {
                Ok(Ok(0)) => {}
                Ok(Ok(removed)) => info!(removed, "swept expired audio"),
                Ok(Err(e)) => warn!("audio sweep failed: {}", e),
                Err(e) => warn!("audio sweep task failed: {}", e),
            }
        }
    })
}

/// Wait for SIGTERM signal (used by systemd).
#[cfg(unix)]
async fn wait_for_sigterm() -> Result<()> {
    use tokio::signal::unix::{SignalKind, signal};
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| VoiceLoopError::Other(format!("Failed to register SIGTERM handler: {}", e)))?;
    sigterm.recv().await;
    Ok(())
}

#[cfg(not(unix))]
async fn wait_for_sigterm() -> Result<()> {
    std::future::pending::<()>().await
}
