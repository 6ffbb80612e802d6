//! Upload normalization: any container in, mono 16kHz WAV out.
//!
//! WAV uploads are decoded and resampled in-process. Everything else
//! (webm/ogg/mp4 from browsers) goes through the configured converter.

use crate::audio::wav;
use crate::error::{Result, VoiceLoopError};
use crate::exec::CommandExecutor;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// Converts raw uploads into the waveform format the pipeline consumes.
#[derive(Clone)]
pub struct AudioNormalizer {
    executor: Arc<dyn CommandExecutor>,
    converter: String,
    sample_rate: u32,
}

impl AudioNormalizer {
    pub fn new(executor: Arc<dyn CommandExecutor>, converter: &str, sample_rate: u32) -> Self {
        Self {
            executor,
            converter: converter.to_string(),
            sample_rate,
        }
    }

    /// Path of the normalized file written for `input`.
    pub fn output_path(input: &Path) -> PathBuf {
        input.with_extension("norm.wav")
    }

    /// Normalize `input` and return the path of the mono WAV written next to it.
    pub fn normalize(&self, input: &Path) -> Result<PathBuf> {
        let output = Self::output_path(input);

        let is_wav = input
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("wav"));

        if is_wav {
            self.resample_wav(input, &output)?;
        } else {
            self.convert(input, &output)?;
        }

        debug!(input = %input.display(), output = %output.display(), "normalized upload");
        Ok(output)
    }

    fn resample_wav(&self, input: &Path, output: &Path) -> Result<()> {
        let file = std::fs::File::open(input)?;
        let samples = wav::decode_mono(std::io::BufReader::new(file), self.sample_rate).map_err(
            |e| VoiceLoopError::AudioConversion {
                message: format!("{}: {}", input.display(), e),
            },
        )?;
        wav::write_pcm16(output, &samples, self.sample_rate)
    }

    fn convert(&self, input: &Path, output: &Path) -> Result<()> {
        let args = vec![
            "-y".to_string(),
            "-i".to_string(),
            input.display().to_string(),
            "-ac".to_string(),
            "1".to_string(),
            "-ar".to_string(),
            self.sample_rate.to_string(),
            output.display().to_string(),
        ];

        self.executor
            .execute(&self.converter, &args)
            .map_err(|e| VoiceLoopError::AudioConversion {
                message: e.to_string(),
            })?;

        if !output.exists() {
            return Err(VoiceLoopError::AudioConversion {
                message: format!("{} produced no output file", self.converter),
            });
        }
        Ok(())
    }
}

/// True when the waveform is at least `min_secs` long.
///
/// An unreadable file is treated as too short rather than as a failure.
pub fn is_long_enough(path: &Path, min_secs: f32) -> bool {
    match wav::duration_secs(path) {
        Ok(secs) => secs >= min_secs,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "audio validation failed");
            false
        }
    }
}
