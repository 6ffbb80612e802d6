//! The streaming turn pipeline.
//!
//! Tokens from the language model are cut into sentences, each sentence is
//! synthesized before the next token is read, and the resulting audio files
//! are returned in speaking order.

pub mod dispatcher;
pub mod error;
pub mod orchestrator;
pub mod segmenter;
pub mod types;

pub use dispatcher::SynthesisDispatcher;
pub use error::{CollectingReporter, ErrorReporter, LogReporter, StageError};
pub use orchestrator::{TurnConfig, TurnOrchestrator};
pub use segmenter::SentenceSegmenter;
pub use types::{TurnResult, TurnState};
