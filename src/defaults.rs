//! Default configuration constants for voiceloop.
//!
//! Shared by the config types and the pipeline components so both agree on
//! the same numbers.

/// Sample rate of normalized uploads, in Hz.
///
/// 16kHz mono is what both Whisper and the voice-cloning engine expect.
pub const SAMPLE_RATE: u32 = 16000;

/// Minimum upload duration in seconds.
///
/// Shorter uploads are too thin to transcribe or to clone a voice from, and
/// the turn is soft-rejected.
pub const MIN_AUDIO_SECS: f32 = 1.0;

/// Program used to convert non-WAV uploads (webm/ogg/mp4).
pub const AUDIO_CONVERTER: &str = "ffmpeg";

/// Default Whisper model name.
pub const DEFAULT_STT_MODEL: &str = "base";

/// Language value that triggers automatic language detection.
pub const AUTO_LANGUAGE: &str = "auto";

/// Base URL of the OpenAI-compatible chat-completions endpoint.
pub const LLM_BASE_URL: &str = "https://api.groq.com/openai/v1";

/// Default chat model.
pub const LLM_MODEL: &str = "openai/gpt-oss-120b";

/// Environment variable holding the API key.
pub const LLM_API_KEY_ENV: &str = "GROQ_API_KEY";

pub const LLM_TEMPERATURE: f32 = 0.8;
pub const LLM_TOP_P: f32 = 1.0;
pub const LLM_MAX_COMPLETION_TOKENS: u32 = 512;

/// Fixed system instruction prepended to every chat request.
///
/// Replies are spoken aloud, so they are kept short and free of markup.
pub const SYSTEM_PROMPT: &str = "You are a conversational voice assistant. \
     Respond naturally in plain text sentences. \
     NOTHING above 3-4 sentences AT MAX. \
     Never output tables, lists, or markdown formatting.";

/// Text-to-speech program (Coqui TTS CLI).
pub const TTS_PROGRAM: &str = "tts";

/// Voice-cloning model passed to the TTS program.
pub const TTS_MODEL: &str = "tts_models/multilingual/multi-dataset/xtts_v2";

/// Language code passed to every synthesis call.
pub const TTS_LANGUAGE: &str = "en";

/// Longest text the synthesis engine reliably handles in one call.
pub const MAX_CHARS: usize = 300;

/// Number of user+assistant pairs kept as context.
pub const MAX_TURNS: usize = 5;

/// Directory where uploads and synthesized replies are written.
pub const AUDIO_DIR: &str = "generated_audio";

/// URL prefix under which artifacts are served to the client.
pub const AUDIO_URL_PREFIX: &str = "/audio";

/// How long artifacts are kept before the retention sweep removes them.
pub const ARTIFACT_RETENTION: &str = "1h";

/// Wall-clock budget for one conversational turn.
pub const TURN_TIMEOUT: &str = "120s";
