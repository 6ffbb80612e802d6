//! voiceloop - spoken conversations with a language model
//!
//! A recorded question is transcribed, the model's reply is streamed, and
//! each finished sentence is spoken back in a voice cloned from a reference
//! sample while the rest of the reply is still arriving.

#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

pub mod audio;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod conversation;
pub mod daemon;
pub mod defaults;
pub mod error;
pub mod exec;
pub mod ipc;
pub mod llm;
pub mod pipeline;
pub mod storage;
pub mod stt;
pub mod tts;

// Composition root - needs everything
pub mod app;

// Collaborator seams
pub use exec::{CommandExecutor, SystemCommandExecutor};
pub use llm::{ChatModel, TokenStream};
pub use stt::transcriber::Transcriber;
pub use tts::SpeechSynthesizer;

// Pipeline
pub use conversation::{ConversationHistory, Role, Turn};
pub use pipeline::{SentenceSegmenter, SynthesisDispatcher, TurnOrchestrator, TurnResult};
pub use storage::{ArtifactStore, AudioArtifact};
pub use tts::ChunkedSynthesizer;

// Error handling
pub use error::{Result, VoiceLoopError};

// Config
pub use config::Config;

/// Build version string with optional git commit hash.
///
/// Returns `"0.1.0+abc1234"` when git hash is available, `"0.1.0"` otherwise.
pub fn version_string() -> String {
    let version = env!("CARGO_PKG_VERSION");
    match option_env!("GIT_HASH") {
        Some(hash) if !hash.is_empty() => format!("{}+{}", version, hash),
        _ => version.to_string(),
    }
}
