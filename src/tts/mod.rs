//! Voice-cloning speech synthesis.

pub mod chunked;
pub mod command;
pub mod synthesizer;

pub use crate::audio::Waveform;
pub use chunked::{ChunkedSynthesizer, chunk_text, normalize_text};
pub use command::CommandSynthesizer;
pub use synthesizer::{MockSynthesizer, SpeechSynthesizer, SynthesisCall};
