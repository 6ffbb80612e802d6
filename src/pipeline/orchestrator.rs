//! One conversational turn, end to end.
//!
//! ```text
//! upload ─► normalize ─► validate ─► transcribe ─► history(user)
//!                                                      │
//!     ┌──────────────── token stream ◄─────────────────┘
//!     ▼
//!  accumulate ─► segment ─► dispatch sentence (awaited) ─► next token
//!     │
//!     └─ end ─► flush ─► dispatch tail ─► history(assistant) ─► result
//! ```

use crate::audio::{AudioNormalizer, is_long_enough};
use crate::conversation::{ConversationHistory, Role};
use crate::defaults;
use crate::error::{Result, VoiceLoopError};
use crate::llm::ChatModel;
use crate::pipeline::dispatcher::SynthesisDispatcher;
use crate::pipeline::segmenter::SentenceSegmenter;
use crate::pipeline::types::{TurnResult, TurnState};
use crate::stt::Transcriber;
use futures_util::StreamExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Per-turn knobs.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnConfig {
    /// Shorter audio is rejected without transcription.
    pub min_audio_secs: f32,
    /// Wall-clock budget for the whole turn. `None` disables it.
    pub turn_timeout: Option<Duration>,
    /// Fixed voice to clone. `None` clones the speaker's own upload.
    pub reference_voice: Option<PathBuf>,
}

impl Default for TurnConfig {
    fn default() -> Self {
        Self {
            min_audio_secs: defaults::MIN_AUDIO_SECS,
            turn_timeout: Some(Duration::from_secs(120)),
            reference_voice: None,
        }
    }
}

impl TurnConfig {
    pub fn with_min_audio_secs(mut self, secs: f32) -> Self {
        self.min_audio_secs = secs;
        self
    }

    pub fn with_turn_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.turn_timeout = timeout;
        self
    }

    pub fn with_reference_voice(mut self, voice: Option<PathBuf>) -> Self {
        self.reference_voice = voice;
        self
    }
}

/// Drives transcription, the reply stream and synthesis for one turn.
#[derive(Clone)]
pub struct TurnOrchestrator {
    transcriber: Arc<dyn Transcriber>,
    chat: Arc<dyn ChatModel>,
    dispatcher: SynthesisDispatcher,
    normalizer: AudioNormalizer,
    config: TurnConfig,
}

impl std::fmt::Debug for TurnOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TurnOrchestrator")
            .field("transcriber", &self.transcriber.model_name())
            .field("chat", &self.chat.model_name())
            .field("dispatcher", &self.dispatcher)
            .field("config", &self.config)
            .finish()
    }
}

fn advance(state: &mut TurnState, next: TurnState) {
    debug_assert!(
        state.can_transition_to(next),
        "illegal turn transition {} -> {}",
        state,
        next
    );
    debug!(from = %state, state = %next, "turn state");
    *state = next;
}

fn join_error(stage: &str, e: tokio::task::JoinError) -> VoiceLoopError {
    VoiceLoopError::TurnAborted {
        message: format!("{} task failed: {}", stage, e),
    }
}

impl TurnOrchestrator {
    pub fn new(
        transcriber: Arc<dyn Transcriber>,
        chat: Arc<dyn ChatModel>,
        dispatcher: SynthesisDispatcher,
        normalizer: AudioNormalizer,
    ) -> Self {
        Self {
            transcriber,
            chat,
            dispatcher,
            normalizer,
            config: TurnConfig::default(),
        }
    }

    pub fn with_config(mut self, config: TurnConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &TurnConfig {
        &self.config
    }

    pub fn dispatcher(&self) -> &SynthesisDispatcher {
        &self.dispatcher
    }

    pub fn transcriber_name(&self) -> &str {
        self.transcriber.model_name()
    }

    pub fn chat_model_name(&self) -> &str {
        self.chat.model_name()
    }

    /// Normalize a raw upload, then run a turn on the result.
    pub async fn handle_upload(
        &self,
        upload: &Path,
        history: &mut ConversationHistory,
    ) -> Result<TurnResult> {
        let normalizer = self.normalizer.clone();
        let upload = upload.to_path_buf();
        let normalized = tokio::task::spawn_blocking(move || normalizer.normalize(&upload))
            .await
            .map_err(|e| join_error("normalization", e))??;

        self.run_turn(&normalized, history).await
    }

    /// Run one turn on an already normalized mono 16 kHz waveform.
    ///
    /// Unusable input yields [`TurnResult::rejected`] and leaves `history`
    /// untouched. Any other failure aborts the turn; a user turn that was
    /// already recorded stays recorded.
    ///
    /// # Errors
    /// `TurnTimeout` when the configured budget runs out; otherwise the
    /// first fatal error from transcription, the model stream or the
    /// synthesis task.
    pub async fn run_turn(
        &self,
        audio: &Path,
        history: &mut ConversationHistory,
    ) -> Result<TurnResult> {
        match self.config.turn_timeout {
            Some(budget) => tokio::time::timeout(budget, self.drive(audio, history))
                .await
                .map_err(|_| VoiceLoopError::TurnTimeout {
                    secs: budget.as_secs(),
                })?,
            None => self.drive(audio, history).await,
        }
    }

    async fn drive(&self, audio: &Path, history: &mut ConversationHistory) -> Result<TurnResult> {
        let started = Instant::now();
        let mut state = TurnState::AwaitingInput;

        if !is_long_enough(audio, self.config.min_audio_secs) {
            warn!(
                audio = %audio.display(),
                min_secs = self.config.min_audio_secs,
                "audio too short, rejecting turn"
            );
            advance(&mut state, TurnState::Rejected);
            return Ok(TurnResult::rejected());
        }
        advance(&mut state, TurnState::Transcribing);

        let transcriber = Arc::clone(&self.transcriber);
        let waveform = audio.to_path_buf();
        let transcript = tokio::task::spawn_blocking(move || transcriber.transcribe(&waveform))
            .await
            .map_err(|e| join_error("transcription", e))??;

        let user_text = transcript.trim().to_string();
        if user_text.is_empty() {
            warn!(audio = %audio.display(), "no speech detected, rejecting turn");
            advance(&mut state, TurnState::Rejected);
            return Ok(TurnResult::rejected());
        }
        info!(text = %user_text, "transcribed");

        history.add(Role::User, user_text.clone());
        let context = history.snapshot();
        let reference_voice = self
            .config
            .reference_voice
            .clone()
            .unwrap_or_else(|| audio.to_path_buf());
        advance(&mut state, TurnState::Streaming);

        let mut tokens = self.chat.stream_chat(&context).await?;
        let mut segmenter = SentenceSegmenter::new();
        let mut reply = String::new();
        let mut artifacts = Vec::new();

        while let Some(token) = tokens.next().await {
            let token = token?;
            reply.push_str(&token);
            for sentence in segmenter.feed(&token) {
                self.dispatcher
                    .dispatch_sentence(&sentence, &reference_voice, &mut artifacts)
                    .await?;
            }
        }
        drop(tokens);
        advance(&mut state, TurnState::Finalizing);

        for sentence in segmenter.flush() {
            self.dispatcher
                .dispatch_sentence(&sentence, &reference_voice, &mut artifacts)
                .await?;
        }

        history.add(Role::Assistant, reply.clone());
        advance(&mut state, TurnState::Complete);

        let store = self.dispatcher.store();
        let audio_urls: Vec<String> = artifacts.iter().map(|a| store.url(a)).collect();
        info!(
            reply_chars = reply.chars().count(),
            artifacts = audio_urls.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "turn complete"
        );

        Ok(TurnResult {
            user_text,
            reply_text: reply,
            audio_urls,
        })
    }
}
