//! Command handler implementation for the daemon.

use crate::app::import_upload;
use crate::daemon::DaemonState;
use crate::ipc::protocol::{Command, Response};
use crate::ipc::server::{CommandHandler, ShutdownHandle};
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info};

/// Command handler for daemon IPC commands.
pub struct DaemonCommandHandler {
    state: Arc<DaemonState>,
    shutdown: ShutdownHandle,
}

impl DaemonCommandHandler {
    pub fn new(state: Arc<DaemonState>, shutdown: ShutdownHandle) -> Self {
        Self { state, shutdown }
    }

    /// Run one turn against the session's history.
    ///
    /// The client's file is copied into the store first; nothing is written
    /// next to it. The session lock is held for the whole turn.
    async fn chat(&self, audio: &Path, session: &str) -> Response {
        if !audio.is_file() {
            return Response::Error {
                message: format!("Audio file not found: {}", audio.display()),
            };
        }

        let upload = match import_upload(&self.state.store, audio) {
            Ok(upload) => upload,
            Err(e) => {
                error!(session, "cannot import upload: {}", e);
                return Response::Error {
                    message: e.to_string(),
                };
            }
        };

        let history = self.state.sessions.session(session).await;
        let mut history = history.lock().await;

        let turn = self.state.orchestrator.handle_upload(&upload, &mut history);
        match turn.await {
            Ok(result) => {
                info!(
                    session,
                    rejected = result.is_rejected(),
                    clips = result.audio_urls.len(),
                    "turn finished"
                );
                Response::from(result)
            }
            Err(e) => {
                error!(session, "turn failed: {}", e);
                Response::Error {
                    message: e.to_string(),
                }
            }
        }
    }

    async fn history(&self, session: &str) -> Response {
        let history = self.state.sessions.session(session).await;
        let turns = history.lock().await.snapshot();
        Response::History { turns }
    }

    async fn reset(&self, session: &str) -> Response {
        if self.state.sessions.remove(session).await {
            info!(session, "session reset");
        }
        Response::Ok
    }

    async fn status(&self) -> Response {
        Response::Status {
            transcriber: self.state.orchestrator.transcriber_name().to_string(),
            chat_model: self.state.orchestrator.chat_model_name().to_string(),
            sessions: self.state.sessions.len().await,
            audio_dir: self.state.store.dir().to_path_buf(),
        }
    }
}

#[async_trait::async_trait]
impl CommandHandler for DaemonCommandHandler {
    async fn handle(&self, command: Command) -> Response {
        match command {
            Command::Chat { audio, session } => self.chat(&audio, &session).await,
            Command::History { session } => self.history(&session).await,
            Command::Reset { session } => self.reset(&session).await,
            Command::Status => self.status().await,
            Command::Shutdown => {
                info!("shutdown command received");
                self.shutdown.trigger().await;
                Response::Ok
            }
        }
    }
}
