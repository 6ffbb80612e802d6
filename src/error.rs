//! Error types for voiceloop.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum VoiceLoopError {
    // Configuration errors
    #[error("Configuration file not found at {path}")]
    ConfigFileNotFound { path: String },

    #[error("Failed to parse configuration: {message}")]
    ConfigParse { message: String },

    #[error("Invalid configuration value for {key}: {message}")]
    ConfigInvalidValue { key: String, message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    // Audio errors
    #[error("Audio conversion failed: {message}")]
    AudioConversion { message: String },

    #[error("Audio format error: {message}")]
    AudioFormat { message: String },

    // Transcription errors
    #[error("Transcription model not found at {path}")]
    TranscriptionModelNotFound { path: String },

    #[error("Transcription inference failed: {message}")]
    TranscriptionInferenceFailed { message: String },

    #[error("Transcription error: {message}")]
    Transcription { message: String },

    // Language model errors
    #[error("API key not set: export {var}")]
    MissingApiKey { var: String },

    #[error("Chat request failed: {message}")]
    LlmRequest { message: String },

    #[error("Chat stream error: {message}")]
    LlmStream { message: String },

    // External tools (converter, synthesis CLI)
    #[error("External tool not found: {tool}")]
    ToolNotFound { tool: String },

    #[error("{tool} failed: {message}")]
    ToolFailed { tool: String, message: String },

    // Synthesis errors
    #[error("Synthesis failed: {message}")]
    Synthesis { message: String },

    // Artifact storage errors
    #[error("Audio artifact error: {message}")]
    Artifact { message: String },

    // Turn control
    #[error("Turn exceeded its {secs}s budget")]
    TurnTimeout { secs: u64 },

    #[error("Turn aborted: {message}")]
    TurnAborted { message: String },

    // IPC errors
    #[error("IPC socket error: {message}")]
    IpcSocket { message: String },

    #[error("IPC protocol error: {message}")]
    IpcProtocol { message: String },

    #[error("IPC connection failed: {message}")]
    IpcConnection { message: String },

    // General I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Generic error for cases not covered above
    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, VoiceLoopError>;
