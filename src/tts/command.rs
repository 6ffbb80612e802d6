//! Synthesis through an external voice-cloning CLI (Coqui `tts` by default).

use crate::audio::{Waveform, wav};
use crate::config::TtsConfig;
use crate::error::{Result, VoiceLoopError};
use crate::exec::{CommandExecutor, expand_args};
use crate::tts::synthesizer::SpeechSynthesizer;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// Runs the configured program once per call and reads back its WAV output.
#[derive(Clone)]
pub struct CommandSynthesizer {
    executor: Arc<dyn CommandExecutor>,
    program: String,
    args: Vec<String>,
    scratch_dir: PathBuf,
}

impl std::fmt::Debug for CommandSynthesizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandSynthesizer")
            .field("program", &self.program)
            .field("args", &self.args)
            .field("scratch_dir", &self.scratch_dir)
            .finish()
    }
}

impl CommandSynthesizer {
    pub fn new(
        executor: Arc<dyn CommandExecutor>,
        program: &str,
        args: Vec<String>,
        scratch_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            executor,
            program: program.to_string(),
            args,
            scratch_dir: scratch_dir.into(),
        }
    }

    pub fn from_config(
        executor: Arc<dyn CommandExecutor>,
        config: &TtsConfig,
        scratch_dir: impl Into<PathBuf>,
    ) -> Self {
        Self::new(executor, &config.program, config.args.clone(), scratch_dir)
    }

    fn scratch_path(&self) -> PathBuf {
        self.scratch_dir.join(format!("tts_{}.wav", Uuid::new_v4()))
    }
}

impl SpeechSynthesizer for CommandSynthesizer {
    fn synthesize(&self, text: &str, reference_voice: &Path, language: &str) -> Result<Waveform> {
        let out_path = self.scratch_path();
        let speaker = reference_voice.to_string_lossy();
        let out = out_path.to_string_lossy();
        let args = expand_args(
            &self.args,
            &[
                ("text", text),
                ("speaker_wav", &speaker),
                ("language", language),
                ("out_path", &out),
            ],
        );

        debug!(program = %self.program, chars = text.chars().count(), "running synthesis");
        self.executor.execute(&self.program, &args)?;

        let waveform = wav::read_waveform(&out_path).map_err(|e| VoiceLoopError::Synthesis {
            message: format!("{} produced no usable audio: {}", self.program, e),
        });
        if let Err(e) = fs::remove_file(&out_path)
            && e.kind() != std::io::ErrorKind::NotFound
        {
            debug!(path = %out_path.display(), "could not remove synthesis output: {}", e);
        }
        waveform
    }
}
