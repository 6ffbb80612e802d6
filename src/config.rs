use crate::defaults;
use crate::error::{Result, VoiceLoopError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub audio: AudioConfig,
    pub stt: SttConfig,
    pub llm: LlmConfig,
    pub tts: TtsConfig,
    pub conversation: ConversationConfig,
    pub storage: StorageConfig,
    pub pipeline: PipelineSettings,
}

/// Upload normalization and validation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AudioConfig {
    pub min_duration_secs: f32,
    pub sample_rate: u32,
    pub converter: String,
}

/// Speech-to-text configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SttConfig {
    pub model: String,
    pub language: String,
    pub threads: Option<usize>,
}

/// Chat-completions endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LlmConfig {
    pub base_url: String,
    pub model: String,
    pub api_key_env: String,
    pub temperature: f32,
    pub top_p: f32,
    pub max_completion_tokens: u32,
    pub system_prompt: String,
}

/// Voice-cloning synthesis configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TtsConfig {
    pub program: String,
    /// Argument template. `{text}`, `{speaker_wav}`, `{language}` and
    /// `{out_path}` are substituted per call.
    pub args: Vec<String>,
    pub language: String,
    pub max_chars: usize,
    /// Fixed reference voice. When unset, each turn clones the user's upload.
    pub reference_voice: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ConversationConfig {
    pub max_turns: usize,
}

/// Artifact storage configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StorageConfig {
    pub audio_dir: PathBuf,
    pub url_prefix: String,
    /// Humantime duration, "0s" keeps artifacts forever.
    pub retention: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PipelineSettings {
    /// Humantime duration, "0s" disables the per-turn budget.
    pub turn_timeout: String,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            min_duration_secs: defaults::MIN_AUDIO_SECS,
            sample_rate: defaults::SAMPLE_RATE,
            converter: defaults::AUDIO_CONVERTER.to_string(),
        }
    }
}

impl Default for SttConfig {
    fn default() -> Self {
        Self {
            model: defaults::DEFAULT_STT_MODEL.to_string(),
            language: defaults::AUTO_LANGUAGE.to_string(),
            threads: None,
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::LLM_BASE_URL.to_string(),
            model: defaults::LLM_MODEL.to_string(),
            api_key_env: defaults::LLM_API_KEY_ENV.to_string(),
            temperature: defaults::LLM_TEMPERATURE,
            top_p: defaults::LLM_TOP_P,
            max_completion_tokens: defaults::LLM_MAX_COMPLETION_TOKENS,
            system_prompt: defaults::SYSTEM_PROMPT.to_string(),
        }
    }
}

impl Default for TtsConfig {
    fn default() -> Self {
        let args = [
            "--model_name",
            defaults::TTS_MODEL,
            "--text",
            "{text}",
            "--speaker_wav",
            "{speaker_wav}",
            "--language_idx",
            "{language}",
            "--out_path",
            "{out_path}",
        ];
        Self {
            program: defaults::TTS_PROGRAM.to_string(),
            args: args.iter().map(|s| s.to_string()).collect(),
            language: defaults::TTS_LANGUAGE.to_string(),
            max_chars: defaults::MAX_CHARS,
            reference_voice: None,
        }
    }
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            max_turns: defaults::MAX_TURNS,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            audio_dir: PathBuf::from(defaults::AUDIO_DIR),
            url_prefix: defaults::AUDIO_URL_PREFIX.to_string(),
            retention: defaults::ARTIFACT_RETENTION.to_string(),
        }
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            turn_timeout: defaults::TURN_TIMEOUT.to_string(),
        }
    }
}

impl StorageConfig {
    /// Parsed retention window, `None` when sweeping is disabled.
    pub fn retention(&self) -> Result<Option<Duration>> {
        parse_optional_duration("storage.retention", &self.retention)
    }
}

impl PipelineSettings {
    /// Parsed per-turn budget, `None` when disabled.
    pub fn turn_timeout(&self) -> Result<Option<Duration>> {
        parse_optional_duration("pipeline.turn_timeout", &self.turn_timeout)
    }
}

/// Parse a humantime duration where zero means "disabled".
fn parse_optional_duration(key: &str, value: &str) -> Result<Option<Duration>> {
    let duration = humantime::parse_duration(value.trim()).map_err(|e| {
        VoiceLoopError::ConfigInvalidValue {
            key: key.to_string(),
            message: format!("'{}' is not a duration: {}", value, e),
        }
    })?;
    Ok((!duration.is_zero()).then_some(duration))
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Missing fields use default values.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                VoiceLoopError::ConfigFileNotFound {
                    path: path.display().to_string(),
                }
            } else {
                VoiceLoopError::Io(e)
            }
        })?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from a file or return defaults if file doesn't exist
    ///
    /// Invalid TOML is still an error.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        match Self::load(path) {
            Err(VoiceLoopError::ConfigFileNotFound { .. }) => Ok(Self::default()),
            other => other,
        }
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - VOICELOOP_LLM_MODEL → llm.model
    /// - VOICELOOP_TTS_LANGUAGE → tts.language
    /// - VOICELOOP_AUDIO_DIR → storage.audio_dir
    /// - VOICELOOP_REFERENCE_VOICE → tts.reference_voice
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(model) = std::env::var("VOICELOOP_LLM_MODEL")
            && !model.is_empty()
        {
            self.llm.model = model;
        }

        if let Ok(language) = std::env::var("VOICELOOP_TTS_LANGUAGE")
            && !language.is_empty()
        {
            self.tts.language = language;
        }

        if let Ok(dir) = std::env::var("VOICELOOP_AUDIO_DIR")
            && !dir.is_empty()
        {
            self.storage.audio_dir = PathBuf::from(dir);
        }

        if let Ok(voice) = std::env::var("VOICELOOP_REFERENCE_VOICE")
            && !voice.is_empty()
        {
            self.tts.reference_voice = Some(PathBuf::from(voice));
        }

        self
    }

    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        fn invalid(key: &str, message: &str) -> VoiceLoopError {
            VoiceLoopError::ConfigInvalidValue {
                key: key.to_string(),
                message: message.to_string(),
            }
        }

        if self.conversation.max_turns == 0 {
            return Err(invalid("conversation.max_turns", "must be at least 1"));
        }
        if self.tts.max_chars == 0 {
            return Err(invalid("tts.max_chars", "must be at least 1"));
        }
        if self.audio.sample_rate == 0 {
            return Err(invalid("audio.sample_rate", "must be positive"));
        }
        if !(self.audio.min_duration_secs >= 0.0) {
            return Err(invalid("audio.min_duration_secs", "must not be negative"));
        }
        if self.tts.program.trim().is_empty() {
            return Err(invalid("tts.program", "must name a program"));
        }
        self.storage.retention()?;
        self.pipeline.turn_timeout()?;
        Ok(())
    }

    /// Get the default configuration file path
    ///
    /// Returns ~/.config/voiceloop/config.toml on Linux
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join("voiceloop")
            .join("config.toml")
    }

    /// Render the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| VoiceLoopError::ConfigParse {
            message: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::Mutex;
    use tempfile::NamedTempFile;

    // Mutex to serialize tests that modify environment variables
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    // SAFETY: These helpers are only used in tests with ENV_LOCK held,
    // ensuring no concurrent access to environment variables.
    fn set_env(key: &str, value: &str) {
        unsafe { std::env::set_var(key, value) }
    }

    fn remove_env(key: &str) {
        unsafe { std::env::remove_var(key) }
    }

    fn clear_voiceloop_env() {
        remove_env("VOICELOOP_LLM_MODEL");
        remove_env("VOICELOOP_TTS_LANGUAGE");
        remove_env("VOICELOOP_AUDIO_DIR");
        remove_env("VOICELOOP_REFERENCE_VOICE");
    }

    fn write_config(contents: &str) -> NamedTempFile {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(contents.as_bytes()).unwrap();
        temp_file
    }

    #[test]
    fn test_default_config_has_correct_values() {
        let config = Config::default();

        assert_eq!(config.audio.min_duration_secs, 1.0);
        assert_eq!(config.audio.sample_rate, 16000);
        assert_eq!(config.audio.converter, "ffmpeg");

        assert_eq!(config.stt.model, "base");
        assert_eq!(config.stt.language, "auto");

        assert_eq!(config.llm.model, "openai/gpt-oss-120b");
        assert_eq!(config.llm.temperature, 0.8);
        assert_eq!(config.llm.max_completion_tokens, 512);

        assert_eq!(config.tts.language, "en");
        assert_eq!(config.tts.max_chars, 300);
        assert_eq!(config.tts.reference_voice, None);
        assert!(config.tts.args.contains(&"{speaker_wav}".to_string()));

        assert_eq!(config.conversation.max_turns, 5);
        assert_eq!(config.storage.audio_dir, PathBuf::from("generated_audio"));
        assert_eq!(config.storage.url_prefix, "/audio");
    }

    #[test]
    fn test_load_from_toml_file() {
        let temp_file = write_config(
            r#"
            [llm]
            model = "llama-3.1-8b-instant"
            temperature = 0.3

            [tts]
            language = "de"
            max_chars = 120
            reference_voice = "/voices/me.wav"

            [conversation]
            max_turns = 2

            [storage]
            audio_dir = "/var/lib/voiceloop"
            retention = "30m"
        "#,
        );

        let config = Config::load(temp_file.path()).unwrap();

        assert_eq!(config.llm.model, "llama-3.1-8b-instant");
        assert_eq!(config.llm.temperature, 0.3);
        assert_eq!(config.tts.language, "de");
        assert_eq!(config.tts.max_chars, 120);
        assert_eq!(
            config.tts.reference_voice,
            Some(PathBuf::from("/voices/me.wav"))
        );
        assert_eq!(config.conversation.max_turns, 2);
        assert_eq!(
            config.storage.retention().unwrap(),
            Some(Duration::from_secs(30 * 60))
        );
    }

    #[test]
    fn test_load_partial_config_uses_defaults() {
        let temp_file = write_config(
            r#"
            [stt]
            model = "small.en"
        "#,
        );

        let config = Config::load(temp_file.path()).unwrap();

        assert_eq!(config.stt.model, "small.en");
        assert_eq!(config.llm, LlmConfig::default());
        assert_eq!(config.tts, TtsConfig::default());
        assert_eq!(config.conversation.max_turns, 5);
    }

    #[test]
    fn test_env_override_model_and_language() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_voiceloop_env();

        set_env("VOICELOOP_LLM_MODEL", "mixtral");
        set_env("VOICELOOP_TTS_LANGUAGE", "fr");
        let config = Config::default().with_env_overrides();

        assert_eq!(config.llm.model, "mixtral");
        assert_eq!(config.tts.language, "fr");
        assert_eq!(config.storage.audio_dir, PathBuf::from("generated_audio"));

        clear_voiceloop_env();
    }

    #[test]
    fn test_env_override_reference_voice() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_voiceloop_env();

        set_env("VOICELOOP_REFERENCE_VOICE", "/tmp/voice.wav");
        let config = Config::default().with_env_overrides();

        assert_eq!(
            config.tts.reference_voice,
            Some(PathBuf::from("/tmp/voice.wav"))
        );

        clear_voiceloop_env();
    }

    #[test]
    fn test_env_override_empty_string_ignored() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_voiceloop_env();

        set_env("VOICELOOP_LLM_MODEL", "");
        let config = Config::default().with_env_overrides();

        assert_eq!(config.llm.model, "openai/gpt-oss-120b");

        clear_voiceloop_env();
    }

    #[test]
    fn test_invalid_toml_returns_error() {
        let temp_file = write_config(
            r#"
            [llm
            model = "broken
        "#,
        );

        assert!(matches!(
            Config::load(temp_file.path()),
            Err(VoiceLoopError::Config(_))
        ));
    }

    #[test]
    fn test_load_or_default_returns_default_for_missing_file() {
        let missing_path = Path::new("/tmp/nonexistent_voiceloop_config_12345.toml");
        let config = Config::load_or_default(missing_path).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_or_default_rejects_invalid_toml() {
        let temp_file = write_config("max_turns = = 3");
        assert!(Config::load_or_default(temp_file.path()).is_err());
    }

    #[test]
    fn test_default_path_ends_with_voiceloop_config() {
        let path = Config::default_path();
        assert!(path.ends_with("voiceloop/config.toml"));
    }

    #[test]
    fn test_validate_accepts_defaults() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_max_turns() {
        let mut config = Config::default();
        config.conversation.max_turns = 0;

        match config.validate() {
            Err(VoiceLoopError::ConfigInvalidValue { key, .. }) => {
                assert_eq!(key, "conversation.max_turns");
            }
            other => panic!("Expected ConfigInvalidValue, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_rejects_zero_max_chars() {
        let mut config = Config::default();
        config.tts.max_chars = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_duration() {
        let mut config = Config::default();
        config.pipeline.turn_timeout = "soon".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_duration_disables() {
        let mut config = Config::default();
        config.pipeline.turn_timeout = "0s".to_string();
        config.storage.retention = "0s".to_string();

        assert_eq!(config.pipeline.turn_timeout().unwrap(), None);
        assert_eq!(config.storage.retention().unwrap(), None);
    }

    #[test]
    fn test_default_turn_timeout() {
        let config = Config::default();
        assert_eq!(
            config.pipeline.turn_timeout().unwrap(),
            Some(Duration::from_secs(120))
        );
    }

    #[test]
    fn test_to_toml_roundtrips() {
        let config = Config::default();
        let rendered = config.to_toml().unwrap();
        let parsed: Config = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed, config);
    }
}
