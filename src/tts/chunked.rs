//! Bounded-length chunking in front of a synthesis engine.
//!
//! Engines degrade on long inputs, so text is cut into slices of at most
//! `max_chars` characters. Cuts ignore word boundaries. Each slice becomes
//! its own artifact; a failed slice is reported and skipped.

use crate::error::Result;
use crate::pipeline::error::{ErrorReporter, LogReporter, StageError};
use crate::storage::{ArtifactStore, AudioArtifact};
use crate::tts::synthesizer::SpeechSynthesizer;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

const STAGE: &str = "synthesis";

/// Collapse every whitespace run to one space and trim the ends.
pub fn normalize_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Split into consecutive slices of at most `max_chars` characters.
///
/// `max_chars` below 1 is treated as 1.
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(max_chars)
        .map(|chunk| chunk.iter().collect())
        .collect()
}

#[derive(Clone)]
pub struct ChunkedSynthesizer {
    engine: Arc<dyn SpeechSynthesizer>,
    store: ArtifactStore,
    max_chars: usize,
    reporter: Arc<dyn ErrorReporter>,
}

impl std::fmt::Debug for ChunkedSynthesizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkedSynthesizer")
            .field("store", &self.store)
            .field("max_chars", &self.max_chars)
            .finish()
    }
}

impl ChunkedSynthesizer {
    pub fn new(engine: Arc<dyn SpeechSynthesizer>, store: ArtifactStore, max_chars: usize) -> Self {
        Self {
            engine,
            store,
            max_chars,
            reporter: Arc::new(LogReporter),
        }
    }

    /// Send per-chunk failures somewhere other than the log.
    pub fn with_reporter(mut self, reporter: Arc<dyn ErrorReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// Synthesize `text` chunk by chunk, in order.
    ///
    /// Returns the artifacts that succeeded, in chunk order. Every call
    /// produces fresh files, even for text seen before.
    pub fn synthesize(
        &self,
        text: &str,
        reference_voice: &Path,
        language: &str,
    ) -> Vec<AudioArtifact> {
        let normalized = normalize_text(text);
        if normalized.is_empty() {
            return Vec::new();
        }

        let chunks = chunk_text(&normalized, self.max_chars);
        let base = self.store.allocate("reply");
        let mut artifacts = Vec::with_capacity(chunks.len());

        for (index, chunk) in chunks.iter().enumerate() {
            match self.synthesize_chunk(&base, index, chunk, reference_voice, language) {
                Ok(artifact) => {
                    debug!(chunk = index, artifact = %artifact.name, "synthesized chunk");
                    artifacts.push(artifact);
                }
                Err(e) => {
                    self.reporter.report(
                        STAGE,
                        &StageError::Recoverable(format!(
                            "chunk {} of {} skipped: {}",
                            index + 1,
                            chunks.len(),
                            e
                        )),
                    );
                }
            }
        }

        artifacts
    }

    fn synthesize_chunk(
        &self,
        base: &str,
        index: usize,
        chunk: &str,
        reference_voice: &Path,
        language: &str,
    ) -> Result<AudioArtifact> {
        let waveform = self.engine.synthesize(chunk, reference_voice, language)?;
        self.store.write_waveform(base, index, &waveform)
    }
}
