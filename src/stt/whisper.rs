//! Whisper-based speech-to-text transcription.
//!
//! Implements the Transcriber trait using whisper-rs.
//!
//! # Feature Gate
//!
//! Requires the `whisper` feature (enabled by default) and cmake:
//!
//! ```bash
//! cargo build --features whisper
//! ```

use crate::audio::wav;
use crate::defaults;
use crate::error::{Result, VoiceLoopError};
use crate::stt::transcriber::Transcriber;
use std::path::{Path, PathBuf};

#[cfg(feature = "whisper")]
use std::sync::{Mutex, Once};
#[cfg(feature = "whisper")]
use whisper_rs::{
    FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters, install_logging_hooks,
};

#[cfg(feature = "whisper")]
static LOGGING_HOOKS_INSTALLED: Once = Once::new();

/// Configuration for Whisper transcriber.
#[derive(Debug, Clone)]
pub struct WhisperConfig {
    /// Path to the Whisper model file
    pub model_path: PathBuf,
    /// Language code (e.g., "en", "es") or "auto"
    pub language: String,
    /// Number of threads for inference (None = auto-detect)
    pub threads: Option<usize>,
}

impl Default for WhisperConfig {
    fn default() -> Self {
        Self {
            model_path: resolve_model_path(defaults::DEFAULT_STT_MODEL),
            language: defaults::AUTO_LANGUAGE.to_string(),
            threads: None,
        }
    }
}

/// Directory where Whisper models are looked up by name.
///
/// Uses `~/.cache/voiceloop/models/` on Linux/Unix.
pub fn models_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from(".cache"))
        .join("voiceloop")
        .join("models")
}

/// Turn a configured model (name or path) into a model file path.
///
/// - Existing files and anything containing a path separator are used as-is.
/// - A bare name like `base.en` maps to `<models_dir>/ggml-base.en.bin`.
pub fn resolve_model_path(model: &str) -> PathBuf {
    let path = PathBuf::from(model);
    if path.is_absolute() || path.exists() || model.contains('/') || model.ends_with(".bin") {
        return path;
    }
    models_dir().join(format!("ggml-{}.bin", model))
}

fn model_name_from_path(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(|s| s.trim_start_matches("ggml-").to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Convert i16 audio samples to f32 normalized to [-1.0, 1.0]
pub fn convert_audio(samples: &[i16]) -> Vec<f32> {
    samples
        .iter()
        .map(|&sample| sample as f32 / 32768.0)
        .collect()
}

/// Whisper-based transcriber implementation.
///
/// The WhisperContext is wrapped in a Mutex to ensure thread safety.
#[cfg(feature = "whisper")]
pub struct WhisperTranscriber {
    context: Mutex<WhisperContext>,
    config: WhisperConfig,
    model_name: String,
}

#[cfg(feature = "whisper")]
impl std::fmt::Debug for WhisperTranscriber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WhisperTranscriber")
            .field("config", &self.config)
            .field("model_name", &self.model_name)
            .field("context", &"<WhisperContext>")
            .finish()
    }
}

/// Whisper-based transcriber placeholder (without whisper feature).
///
/// Returns errors when used. Enable the `whisper` feature for real transcription.
#[cfg(not(feature = "whisper"))]
#[derive(Debug)]
pub struct WhisperTranscriber {
    config: WhisperConfig,
    model_name: String,
}

#[cfg(feature = "whisper")]
impl WhisperTranscriber {
    /// Create a new Whisper transcriber.
    ///
    /// # Errors
    /// Returns `VoiceLoopError::TranscriptionModelNotFound` if the model file doesn't exist
    /// Returns `VoiceLoopError::TranscriptionInferenceFailed` if model loading fails
    pub fn new(config: WhisperConfig) -> Result<Self> {
        // Keep whisper.cpp from writing to stderr
        LOGGING_HOOKS_INSTALLED.call_once(|| {
            install_logging_hooks();
        });

        if !config.model_path.exists() {
            return Err(VoiceLoopError::TranscriptionModelNotFound {
                path: config.model_path.to_string_lossy().to_string(),
            });
        }

        let model_name = model_name_from_path(&config.model_path);

        let context = WhisperContext::new_with_params(
            config.model_path.to_str().ok_or_else(|| {
                VoiceLoopError::TranscriptionInferenceFailed {
                    message: "Invalid UTF-8 in model path".to_string(),
                }
            })?,
            WhisperContextParameters::default(),
        )
        .map_err(|e| VoiceLoopError::TranscriptionInferenceFailed {
            message: format!("Failed to load Whisper model: {}", e),
        })?;

        Ok(Self {
            context: Mutex::new(context),
            config,
            model_name,
        })
    }

    /// Get the configuration
    pub fn config(&self) -> &WhisperConfig {
        &self.config
    }
}

#[cfg(not(feature = "whisper"))]
impl WhisperTranscriber {
    /// Create a new Whisper transcriber (stub implementation).
    pub fn new(config: WhisperConfig) -> Result<Self> {
        if !config.model_path.exists() {
            return Err(VoiceLoopError::TranscriptionModelNotFound {
                path: config.model_path.to_string_lossy().to_string(),
            });
        }

        let model_name = model_name_from_path(&config.model_path);
        Ok(Self { config, model_name })
    }

    /// Get the configuration
    pub fn config(&self) -> &WhisperConfig {
        &self.config
    }
}

#[cfg(feature = "whisper")]
impl Transcriber for WhisperTranscriber {
    fn transcribe(&self, waveform: &Path) -> Result<String> {
        let audio_f32 = convert_audio(&wav::read_mono_16k(waveform)?);

        let context =
            self.context
                .lock()
                .map_err(|e| VoiceLoopError::TranscriptionInferenceFailed {
                    message: format!("Failed to acquire context lock: {}", e),
                })?;

        let mut state =
            context
                .create_state()
                .map_err(|e| VoiceLoopError::TranscriptionInferenceFailed {
                    message: format!("Failed to create Whisper state: {}", e),
                })?;

        let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });

        if self.config.language == defaults::AUTO_LANGUAGE {
            params.set_language(None);
        } else {
            params.set_language(Some(&self.config.language));
        }

        if let Some(threads) = self.config.threads {
            params.set_n_threads(threads as i32);
        }

        params.set_print_special(false);
        params.set_print_progress(false);
        params.set_print_realtime(false);
        params.set_print_timestamps(false);

        state
            .full(params, &audio_f32)
            .map_err(|e| VoiceLoopError::TranscriptionInferenceFailed {
                message: format!("Whisper inference failed: {}", e),
            })?;

        let mut transcription = String::new();
        for segment in state.as_iter() {
            transcription.push_str(&segment.to_string());
        }

        Ok(transcription.trim().to_string())
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn is_ready(&self) -> bool {
        true
    }
}

#[cfg(not(feature = "whisper"))]
impl Transcriber for WhisperTranscriber {
    fn transcribe(&self, waveform: &Path) -> Result<String> {
        // Surface unreadable input before the missing-feature error
        wav::duration_secs(waveform)?;
        Err(VoiceLoopError::TranscriptionInferenceFailed {
            message: concat!(
                "Whisper feature not enabled. This binary was built without speech recognition.\n",
                "To fix: cargo build --release (whisper is enabled by default)\n",
                "If build fails with cmake errors, install: sudo apt install cmake"
            )
            .to_string(),
        })
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn is_ready(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_bare_name_into_models_dir() {
        let path = resolve_model_path("small.en");
        assert_eq!(path, models_dir().join("ggml-small.en.bin"));
    }

    #[test]
    fn test_resolve_explicit_paths_unchanged() {
        assert_eq!(
            resolve_model_path("/models/custom.bin"),
            PathBuf::from("/models/custom.bin")
        );
        assert_eq!(
            resolve_model_path("models/ggml-tiny.bin"),
            PathBuf::from("models/ggml-tiny.bin")
        );
        assert_eq!(resolve_model_path("mine.bin"), PathBuf::from("mine.bin"));
    }

    #[test]
    fn test_model_name_strips_ggml_prefix() {
        assert_eq!(
            model_name_from_path(Path::new("/m/ggml-base.en.bin")),
            "base.en"
        );
        assert_eq!(model_name_from_path(Path::new("custom.bin")), "custom");
    }

    #[test]
    fn test_convert_audio_range() {
        let converted = convert_audio(&[0, 16384, -32768, 32767]);
        assert_eq!(converted[0], 0.0);
        assert_eq!(converted[1], 0.5);
        assert_eq!(converted[2], -1.0);
        assert!(converted[3] < 1.0 && converted[3] > 0.999);
    }

    #[test]
    fn test_whisper_config_default_is_auto_language() {
        let config = WhisperConfig::default();
        assert_eq!(config.language, defaults::AUTO_LANGUAGE);
        assert_eq!(config.threads, None);
        assert!(config.model_path.ends_with("ggml-base.bin"));
    }

    #[test]
    fn test_missing_model_is_reported() {
        let config = WhisperConfig {
            model_path: PathBuf::from("/nonexistent/ggml-none.bin"),
            ..Default::default()
        };

        match WhisperTranscriber::new(config) {
            Err(VoiceLoopError::TranscriptionModelNotFound { path }) => {
                assert!(path.contains("ggml-none.bin"));
            }
            other => panic!("Expected TranscriptionModelNotFound, got {:?}", other),
        }
    }
}
