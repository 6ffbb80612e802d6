//! Async Unix socket IPC server for daemon control.

use crate::error::{Result, VoiceLoopError};
use crate::ipc::protocol::{Command, Response};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Handler trait for processing IPC commands.
#[async_trait::async_trait]
pub trait CommandHandler: Send + Sync {
    /// Handle a command and return a response.
    async fn handle(&self, command: Command) -> Response;
}

/// Shared flag that stops the accept loop.
///
/// Cloned into command handlers so a `shutdown` command can end the server.
#[derive(Debug, Clone, Default)]
pub struct ShutdownHandle {
    shutdown: Arc<Mutex<bool>>,
}

impl ShutdownHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn is_shutdown(&self) -> bool {
        *self.shutdown.lock().await
    }

    pub async fn trigger(&self) {
        *self.shutdown.lock().await = true;
    }
}

/// IPC server for handling daemon control commands via Unix socket.
pub struct IpcServer {
    socket_path: PathBuf,
    state: ShutdownHandle,
}

impl IpcServer {
    /// Create a new IPC server bound to the specified socket path.
    pub fn new(socket_path: PathBuf) -> Result<Self> {
        Ok(Self {
            socket_path,
            state: ShutdownHandle::new(),
        })
    }

    /// Get the socket path this server is using.
    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Handle that stops this server when triggered.
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.state.clone()
    }

    /// Get the default socket path based on XDG_RUNTIME_DIR or fallback.
    pub fn default_socket_path() -> PathBuf {
        if let Ok(xdg_runtime) = std::env::var("XDG_RUNTIME_DIR") {
            PathBuf::from(xdg_runtime).join("voiceloop.sock")
        } else {
            let uid = unsafe { libc::getuid() };
            PathBuf::from(format!("/tmp/voiceloop-{}.sock", uid))
        }
    }

    /// Start the IPC server and handle incoming connections.
    ///
    /// Returns once the shutdown handle is triggered.
    pub async fn start<H>(&self, handler: H) -> Result<()>
    where
        H: CommandHandler + 'static,
    {
        // Clean up any stale socket file
        if self.socket_path.exists() {
            std::fs::remove_file(&self.socket_path).map_err(|e| VoiceLoopError::IpcSocket {
                message: format!("Failed to remove existing socket: {}", e),
            })?;
        }

        let listener =
            UnixListener::bind(&self.socket_path).map_err(|e| VoiceLoopError::IpcSocket {
                message: format!("Failed to bind to socket: {}", e),
            })?;

        let handler = Arc::new(handler);

        loop {
            if self.state.is_shutdown().await {
                break;
            }

            // Accept with a timeout so the shutdown flag is rechecked
            let accept_result =
                tokio::time::timeout(tokio::time::Duration::from_millis(100), listener.accept())
                    .await;

            match accept_result {
                Ok(Ok((stream, _))) => {
                    let handler = Arc::clone(&handler);
                    tokio::spawn(async move {
                        if let Err(e) = handle_client(stream, handler).await {
                            warn!("Error handling client: {}", e);
                        }
                    });
                }
                Ok(Err(e)) => {
                    return Err(VoiceLoopError::IpcConnection {
                        message: format!("Failed to accept connection: {}", e),
                    });
                }
                Err(_) => continue,
            }
        }

        Ok(())
    }

    /// Stop the IPC server and clean up the socket file.
    pub async fn stop(&self) -> Result<()> {
        self.state.trigger().await;

        if self.socket_path.exists() {
            std::fs::remove_file(&self.socket_path).map_err(|e| VoiceLoopError::IpcSocket {
                message: format!("Failed to remove socket file: {}", e),
            })?;
        }

        Ok(())
    }
}

/// Handle a single client connection: one command line, one response line.
///
/// The client keeps its end open until the response arrives; closing it
/// earlier abandons the command.
async fn handle_client<H>(stream: UnixStream, handler: Arc<H>) -> Result<()>
where
    H: CommandHandler,
{
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let mut line = String::new();

    reader
        .read_line(&mut line)
        .await
        .map_err(|e| VoiceLoopError::IpcConnection {
            message: format!("Failed to read from client: {}", e),
        })?;

    let response = match Command::from_json(line.trim()) {
        Ok(command) => {
            debug!(?command, "ipc command");
            // Dropping the handler future cancels the turn with it
            tokio::select! {
                biased;
                response = handler.handle(command) => response,
                _ = wait_for_hangup(&mut reader) => {
                    debug!("client hung up, command abandoned");
                    return Ok(());
                }
            }
        }
        Err(e) => Response::Error {
            message: format!("Failed to parse command: {}", e),
        },
    };

    let response_json = response.to_json().map_err(|e| VoiceLoopError::IpcProtocol {
        message: format!("Failed to serialize response: {}", e),
    })?;

    writer
        .write_all(response_json.as_bytes())
        .await
        .map_err(|e| VoiceLoopError::IpcConnection {
            message: format!("Failed to write to client: {}", e),
        })?;

    writer
        .write_all(b"\n")
        .await
        .map_err(|e| VoiceLoopError::IpcConnection {
            message: format!("Failed to write newline to client: {}", e),
        })?;

    writer
        .flush()
        .await
        .map_err(|e| VoiceLoopError::IpcConnection {
            message: format!("Failed to flush writer: {}", e),
        })?;

    Ok(())
}

/// Resolve once the client closes its end. Extra bytes are ignored.
async fn wait_for_hangup<R>(reader: &mut R)
where
    R: AsyncRead + Unpin,
{
    let mut scratch = [0u8; 256];
    loop {
        match reader.read(&mut scratch).await {
            Ok(0) | Err(_) => return,
            Ok(_) => continue,
        }
    }
}
