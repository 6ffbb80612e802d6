use crate::error::{Result, VoiceLoopError};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Trait for speech-to-text transcription.
///
/// This trait allows swapping implementations (real Whisper vs mock).
pub trait Transcriber: Send + Sync {
    /// Transcribe a normalized waveform file to text.
    ///
    /// # Arguments
    /// * `waveform` - Path to a mono 16kHz WAV file
    ///
    /// # Returns
    /// Best-effort text; an empty string means no speech was detected.
    fn transcribe(&self, waveform: &Path) -> Result<String>;

    /// Get the name of the loaded model
    fn model_name(&self) -> &str;

    /// Check if the transcriber is ready
    fn is_ready(&self) -> bool;
}

/// Implement Transcriber for Arc<T> to allow sharing across sessions.
impl<T: Transcriber + ?Sized> Transcriber for Arc<T> {
    fn transcribe(&self, waveform: &Path) -> Result<String> {
        (**self).transcribe(waveform)
    }

    fn model_name(&self) -> &str {
        (**self).model_name()
    }

    fn is_ready(&self) -> bool {
        (**self).is_ready()
    }
}

/// Mock transcriber for testing
#[derive(Debug, Default)]
pub struct MockTranscriber {
    model_name: String,
    response: String,
    should_fail: bool,
    calls: Mutex<Vec<PathBuf>>,
}

impl MockTranscriber {
    /// Create a new mock transcriber with default settings
    pub fn new(model_name: &str) -> Self {
        Self {
            model_name: model_name.to_string(),
            response: "mock transcription".to_string(),
            should_fail: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Configure the mock to return a specific response
    pub fn with_response(mut self, response: &str) -> Self {
        self.response = response.to_string();
        self
    }

    /// Configure the mock to fail on transcribe
    pub fn with_failure(mut self) -> Self {
        self.should_fail = true;
        self
    }

    /// Paths passed to `transcribe`, in call order.
    pub fn calls(&self) -> Vec<PathBuf> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

impl Transcriber for MockTranscriber {
    fn transcribe(&self, waveform: &Path) -> Result<String> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(waveform.to_path_buf());
        }
        if self.should_fail {
            Err(VoiceLoopError::Transcription {
                message: "mock transcription failure".to_string(),
            })
        } else {
            Ok(self.response.clone())
        }
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn is_ready(&self) -> bool {
        !self.should_fail
    }
}
