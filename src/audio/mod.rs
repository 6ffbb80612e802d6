//! Audio handling: upload normalization, validation and WAV I/O.

pub mod normalize;
pub mod wav;

pub use normalize::{AudioNormalizer, is_long_enough};
pub use wav::Waveform;
