//! Data types for a single conversational turn.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a turn is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    AwaitingInput,
    Transcribing,
    Streaming,
    Finalizing,
    Complete,
    /// Unusable input: audio too short or nothing was said.
    Rejected,
}

impl TurnState {
    /// Whether `next` is a legal successor of this state.
    pub fn can_transition_to(self, next: TurnState) -> bool {
        use TurnState::*;
        matches!(
            (self, next),
            (AwaitingInput, Transcribing)
                | (AwaitingInput, Rejected)
                | (Transcribing, Streaming)
                | (Transcribing, Rejected)
                | (Streaming, Finalizing)
                | (Finalizing, Complete)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, TurnState::Complete | TurnState::Rejected)
    }
}

impl fmt::Display for TurnState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TurnState::AwaitingInput => "awaiting_input",
            TurnState::Transcribing => "transcribing",
            TurnState::Streaming => "streaming",
            TurnState::Finalizing => "finalizing",
            TurnState::Complete => "complete",
            TurnState::Rejected => "rejected",
        };
        f.write_str(name)
    }
}

/// What the caller gets back from a turn.
///
/// All three fields empty means the input was rejected, which is not an
/// error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnResult {
    pub user_text: String,
    pub reply_text: String,
    /// Playable references, in the order they must be played.
    pub audio_urls: Vec<String>,
}

impl TurnResult {
    /// The canonical soft-rejection result.
    pub fn rejected() -> Self {
        Self::default()
    }

    pub fn is_rejected(&self) -> bool {
        self.user_text.is_empty() && self.reply_text.is_empty() && self.audio_urls.is_empty()
    }
}
