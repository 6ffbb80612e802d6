//! JSON message protocol between the CLI and the daemon.
//!
//! One JSON object per line in each direction.

use crate::conversation::Turn;
use crate::pipeline::TurnResult;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Session used when the client does not name one.
pub const DEFAULT_SESSION: &str = "default";

fn default_session() -> String {
    DEFAULT_SESSION.to_string()
}

/// Commands sent by the CLI to the daemon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    /// Run one turn on an uploaded audio file
    Chat {
        audio: PathBuf,
        #[serde(default = "default_session")]
        session: String,
    },
    /// Show a session's conversation history
    History {
        #[serde(default = "default_session")]
        session: String,
    },
    /// Forget a session's conversation history
    Reset {
        #[serde(default = "default_session")]
        session: String,
    },
    /// Get daemon status
    Status,
    /// Shutdown the daemon
    Shutdown,
}

impl Command {
    /// Serialize command to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize command from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

/// Responses sent by the daemon to the CLI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Command succeeded
    Ok,
    /// A finished (or soft-rejected) turn
    Turn {
        user_text: String,
        reply_text: String,
        audio_urls: Vec<String>,
    },
    /// A session's turns, oldest first
    History { turns: Vec<Turn> },
    /// Current daemon status
    Status {
        transcriber: String,
        chat_model: String,
        sessions: usize,
        audio_dir: PathBuf,
    },
    /// Error occurred
    Error { message: String },
}

impl Response {
    /// Serialize response to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize response from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

impl From<TurnResult> for Response {
    fn from(result: TurnResult) -> Self {
        Response::Turn {
            user_text: result.user_text,
            reply_text: result.reply_text,
            audio_urls: result.audio_urls,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::Role;

    #[test]
    fn test_command_json_format_examples() {
        assert_eq!(Command::Status.to_json().unwrap(), r#"{"type":"status"}"#);
        assert_eq!(
            Command::Shutdown.to_json().unwrap(),
            r#"{"type":"shutdown"}"#
        );

        let chat = Command::Chat {
            audio: PathBuf::from("/tmp/in.webm"),
            session: "kitchen".to_string(),
        };
        assert_eq!(
            chat.to_json().unwrap(),
            r#"{"type":"chat","audio":"/tmp/in.webm","session":"kitchen"}"#
        );
    }

    #[test]
    fn test_session_defaults_when_omitted() {
        let cmd = Command::from_json(r#"{"type":"chat","audio":"a.wav"}"#).unwrap();
        assert_eq!(
            cmd,
            Command::Chat {
                audio: PathBuf::from("a.wav"),
                session: DEFAULT_SESSION.to_string(),
            }
        );

        let cmd = Command::from_json(r#"{"type":"reset"}"#).unwrap();
        assert_eq!(
            cmd,
            Command::Reset {
                session: DEFAULT_SESSION.to_string()
            }
        );
    }

    #[test]
    fn test_invalid_json_returns_error() {
        assert!(Command::from_json(r#"{"type": "unknown_command"}"#).is_err());
        assert!(Command::from_json(r#"{"invalid": "json"}"#).is_err());
        assert!(Command::from_json("not json at all").is_err());
        assert!(Command::from_json(r#"{"type":"chat"}"#).is_err());
    }

    #[test]
    fn test_rejected_turn_response_shape() {
        let json = Response::from(TurnResult::rejected()).to_json().unwrap();
        assert_eq!(
            json,
            r#"{"type":"turn","user_text":"","reply_text":"","audio_urls":[]}"#
        );
    }

    #[test]
    fn test_history_response_uses_lowercase_roles() {
        let resp = Response::History {
            turns: vec![Turn::new(Role::User, "hi")],
        };
        let json = resp.to_json().unwrap();
        assert!(json.contains(r#""role":"user""#));
        assert_eq!(Response::from_json(&json).unwrap(), resp);
    }

    #[test]
    fn test_status_response_fields() {
        let resp = Response::Status {
            transcriber: "base".to_string(),
            chat_model: "openai/gpt-oss-120b".to_string(),
            sessions: 2,
            audio_dir: PathBuf::from("generated_audio"),
        };
        let json = resp.to_json().unwrap();
        assert!(json.contains(r#""type":"status""#));
        assert!(json.contains(r#""sessions":2"#));
        assert_eq!(Response::from_json(&json).unwrap(), resp);
    }

    #[test]
    fn test_error_response() {
        let json = Response::Error {
            message: "Turn exceeded its 120s budget".to_string(),
        }
        .to_json()
        .unwrap();
        assert_eq!(
            json,
            r#"{"type":"error","message":"Turn exceeded its 120s budget"}"#
        );
    }
}
