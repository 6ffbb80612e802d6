//! Sequential per-sentence synthesis.

use crate::error::{Result, VoiceLoopError};
use crate::storage::{ArtifactStore, AudioArtifact};
use crate::tts::ChunkedSynthesizer;
use std::path::Path;
use tracing::info;

/// Synthesizes one sentence at a time and appends its artifacts to the
/// turn's running list.
///
/// The engine runs on the blocking pool. The caller awaits each sentence
/// before pulling the next token, so synthesis throttles the token stream
/// and artifact order always matches sentence order.
#[derive(Debug, Clone)]
pub struct SynthesisDispatcher {
    chunked: ChunkedSynthesizer,
    language: String,
}

impl SynthesisDispatcher {
    pub fn new(chunked: ChunkedSynthesizer, language: impl Into<String>) -> Self {
        Self {
            chunked,
            language: language.into(),
        }
    }

    /// Language code passed to every synthesis call, regardless of what the
    /// user spoke.
    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn store(&self) -> &ArtifactStore {
        self.chunked.store()
    }

    /// Synthesize `sentence` and append the results to `artifacts`.
    ///
    /// Returns the newly appended artifacts. A sentence whose chunks all
    /// failed appends nothing and is not an error. Once started, synthesis
    /// runs to completion even if this future is dropped.
    pub async fn dispatch_sentence<'a>(
        &self,
        sentence: &str,
        reference_voice: &Path,
        artifacts: &'a mut Vec<AudioArtifact>,
    ) -> Result<&'a [AudioArtifact]> {
        let chunked = self.chunked.clone();
        let text = sentence.to_string();
        let voice = reference_voice.to_path_buf();
        let language = self.language.clone();

        let produced =
            tokio::task::spawn_blocking(move || chunked.synthesize(&text, &voice, &language))
                .await
                .map_err(|e| VoiceLoopError::TurnAborted {
                    message: format!("synthesis task failed: {}", e),
                })?;

        info!(
            sentence,
            artifacts = produced.len(),
            language = %self.language,
            "sentence dispatched"
        );

        let before = artifacts.len();
        artifacts.extend(produced);
        Ok(&artifacts[before..])
    }
}
