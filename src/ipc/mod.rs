//! Unix socket control channel between the CLI and the daemon.

pub mod client;
pub mod protocol;
pub mod server;

pub use client::send_command;
pub use protocol::{Command, DEFAULT_SESSION, Response};
pub use server::{CommandHandler, IpcServer, ShutdownHandle};
