//! Composition root: turns a `Config` into a running pipeline.

use crate::audio::AudioNormalizer;
use crate::config::Config;
use crate::conversation::ConversationHistory;
use crate::error::{Result, VoiceLoopError};
use crate::exec::{CommandExecutor, SystemCommandExecutor};
use crate::llm::{ChatModel, OpenAiCompatibleClient};
use crate::pipeline::{SynthesisDispatcher, TurnConfig, TurnOrchestrator, TurnResult};
use crate::storage::ArtifactStore;
use crate::stt::whisper::resolve_model_path;
use crate::stt::{Transcriber, WhisperConfig, WhisperTranscriber};
use crate::tts::{ChunkedSynthesizer, CommandSynthesizer, SpeechSynthesizer};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Open the artifact store described by `[storage]`.
pub fn build_store(config: &Config) -> Result<ArtifactStore> {
    ArtifactStore::new(&config.storage.audio_dir, &config.storage.url_prefix)
}

/// Load the speech recognizer. Slow: reads the whole model.
pub fn build_transcriber(config: &Config) -> Result<Arc<dyn Transcriber>> {
    let whisper = WhisperConfig {
        model_path: resolve_model_path(&config.stt.model),
        language: config.stt.language.clone(),
        threads: config.stt.threads,
    };
    info!(model = %whisper.model_path.display(), "loading speech model");
    Ok(Arc::new(WhisperTranscriber::new(whisper)?))
}

pub fn build_chat_model(config: &Config) -> Result<Arc<dyn ChatModel>> {
    Ok(Arc::new(OpenAiCompatibleClient::from_config(&config.llm)?))
}

pub fn build_synthesizer(
    config: &Config,
    executor: Arc<dyn CommandExecutor>,
    store: &ArtifactStore,
) -> Arc<dyn SpeechSynthesizer> {
    Arc::new(CommandSynthesizer::from_config(
        executor,
        &config.tts,
        store.dir(),
    ))
}

/// Per-turn settings from `[audio]`, `[tts]` and `[pipeline]`.
pub fn turn_config(config: &Config) -> Result<TurnConfig> {
    Ok(TurnConfig::default()
        .with_min_audio_secs(config.audio.min_duration_secs)
        .with_turn_timeout(config.pipeline.turn_timeout()?)
        .with_reference_voice(config.tts.reference_voice.clone()))
}

/// Wire the given collaborators into an orchestrator.
pub fn build_orchestrator(
    config: &Config,
    store: ArtifactStore,
    transcriber: Arc<dyn Transcriber>,
    chat: Arc<dyn ChatModel>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    executor: Arc<dyn CommandExecutor>,
) -> Result<TurnOrchestrator> {
    config.validate()?;

    let chunked = ChunkedSynthesizer::new(synthesizer, store, config.tts.max_chars);
    let dispatcher = SynthesisDispatcher::new(chunked, config.tts.language.clone());
    let normalizer = AudioNormalizer::new(
        executor,
        &config.audio.converter,
        config.audio.sample_rate,
    );

    Ok(TurnOrchestrator::new(transcriber, chat, dispatcher, normalizer)
        .with_config(turn_config(config)?))
}

/// Build the production pipeline: Whisper, the HTTP chat client and the
/// synthesis CLI.
///
/// The API key is checked before the speech model is loaded.
pub fn build_pipeline(config: &Config) -> Result<(TurnOrchestrator, ArtifactStore)> {
    config.validate()?;
    let chat = build_chat_model(config)?;
    let store = build_store(config)?;
    let executor: Arc<dyn CommandExecutor> = Arc::new(SystemCommandExecutor::new());
    let synthesizer = build_synthesizer(config, Arc::clone(&executor), &store);
    let transcriber = build_transcriber(config)?;

    let orchestrator = build_orchestrator(
        config,
        store.clone(),
        transcriber,
        chat,
        synthesizer,
        executor,
    )?;
    Ok((orchestrator, store))
}

/// Copy an audio file into the store as a fresh upload.
pub fn import_upload(store: &ArtifactStore, audio: &Path) -> Result<PathBuf> {
    let bytes = std::fs::read(audio).map_err(|e| VoiceLoopError::AudioFormat {
        message: format!("Cannot read {}: {}", audio.display(), e),
    })?;
    let extension = audio
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("bin");
    store.save_upload(&bytes, extension)
}

/// One turn, in process, against a fresh history.
pub async fn run_chat_command(
    mut config: Config,
    audio: &Path,
    voice: Option<PathBuf>,
) -> Result<TurnResult> {
    if voice.is_some() {
        config.tts.reference_voice = voice;
    }
    let (orchestrator, store) = build_pipeline(&config)?;
    let upload = import_upload(&store, audio)?;
    let mut history = ConversationHistory::with_max_turns(config.conversation.max_turns);

    orchestrator.handle_upload(&upload, &mut history).await
}

/// Delete artifacts older than the configured retention.
///
/// Returns `None` when retention is disabled.
pub fn run_sweep_command(config: &Config) -> Result<Option<usize>> {
    let Some(retention) = config.storage.retention()? else {
        return Ok(None);
    };
    let store = build_store(config)?;
    Ok(Some(store.sweep(retention)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::wav;
    use crate::llm::MockChatModel;
    use crate::stt::MockTranscriber;
    use crate::tts::MockSynthesizer;
    use std::time::Duration;
    use tempfile::TempDir;

    fn test_config(dir: &TempDir) -> Config {
        let mut config = Config::default();
        config.storage.audio_dir = dir.path().join("generated_audio");
        config
    }

    #[test]
    fn test_turn_config_from_defaults() {
        let turn = turn_config(&Config::default()).unwrap();
        assert_eq!(turn.min_audio_secs, 1.0);
        assert_eq!(turn.turn_timeout, Some(Duration::from_secs(120)));
        assert_eq!(turn.reference_voice, None);
    }

    #[test]
    fn test_turn_config_zero_timeout_disables_budget() {
        let mut config = Config::default();
        config.pipeline.turn_timeout = "0s".to_string();
        assert_eq!(turn_config(&config).unwrap().turn_timeout, None);
    }

    #[test]
    fn test_build_orchestrator_rejects_invalid_config() {
        let dir = TempDir::new().unwrap();
        let mut config = test_config(&dir);
        config.tts.max_chars = 0;
        let store = build_store(&config).unwrap();

        let result = build_orchestrator(
            &config,
            store,
            Arc::new(MockTranscriber::new("mock")),
            Arc::new(MockChatModel::new(&["x"])),
            Arc::new(MockSynthesizer::new()),
            Arc::new(SystemCommandExecutor::new()),
        );

        assert!(matches!(
            result,
            Err(VoiceLoopError::ConfigInvalidValue { .. })
        ));
    }

    #[tokio::test]
    async fn test_orchestrator_uses_configured_language_and_max_chars() {
        let dir = TempDir::new().unwrap();
        let mut config = test_config(&dir);
        config.tts.language = "de".to_string();
        config.tts.max_chars = 8;
        let store = build_store(&config).unwrap();
        let synth = Arc::new(MockSynthesizer::new());

        let orchestrator = build_orchestrator(
            &config,
            store.clone(),
            Arc::new(MockTranscriber::new("mock").with_response("Hallo")),
            Arc::new(MockChatModel::new(&["Guten Morgen."])),
            Arc::clone(&synth) as Arc<dyn SpeechSynthesizer>,
            Arc::new(SystemCommandExecutor::new()),
        )
        .unwrap();

        let audio = dir.path().join("in.wav");
        wav::write_pcm16(&audio, &vec![0i16; 16000], 16000).unwrap();
        let upload = import_upload(&store, &audio).unwrap();
        let mut history = ConversationHistory::new();

        let result = orchestrator.handle_upload(&upload, &mut history).await.unwrap();

        assert_eq!(result.audio_urls.len(), 2);
        let calls = synth.calls();
        assert_eq!(calls[0].text, "Guten Mo");
        assert!(calls.iter().all(|c| c.language == "de"));
    }

    #[test]
    fn test_import_upload_copies_into_store() {
        let dir = TempDir::new().unwrap();
        let store = build_store(&test_config(&dir)).unwrap();
        let source = dir.path().join("question.ogg");
        std::fs::write(&source, b"OggS").unwrap();

        let upload = import_upload(&store, &source).unwrap();

        assert_eq!(upload.parent().unwrap(), store.dir());
        assert_eq!(upload.extension().unwrap(), "ogg");
        assert_eq!(std::fs::read(upload).unwrap(), b"OggS");
    }

    #[test]
    fn test_import_missing_upload_fails() {
        let dir = TempDir::new().unwrap();
        let store = build_store(&test_config(&dir)).unwrap();
        assert!(import_upload(&store, Path::new("/nonexistent/q.wav")).is_err());
    }

    #[test]
    fn test_sweep_command_disabled() {
        let dir = TempDir::new().unwrap();
        let mut config = test_config(&dir);
        config.storage.retention = "0s".to_string();
        assert_eq!(run_sweep_command(&config).unwrap(), None);
    }

    #[test]
    fn test_sweep_command_keeps_fresh_files() {
        let dir = TempDir::new().unwrap();
        let config = test_config(&dir);
        let store = build_store(&config).unwrap();
        store.save_upload(b"x", "wav").unwrap();

        assert_eq!(run_sweep_command(&config).unwrap(), Some(0));
    }
}
