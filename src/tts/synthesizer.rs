use crate::audio::Waveform;
use crate::error::{Result, VoiceLoopError};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Voice-cloning speech synthesis.
///
/// Calls block for as long as the engine needs; run them off the async
/// executor.
pub trait SpeechSynthesizer: Send + Sync {
    /// Speak `text` in the voice of `reference_voice`.
    ///
    /// Failures are per call; callers may skip and continue.
    fn synthesize(&self, text: &str, reference_voice: &Path, language: &str) -> Result<Waveform>;
}

impl<T: SpeechSynthesizer + ?Sized> SpeechSynthesizer for Arc<T> {
    fn synthesize(&self, text: &str, reference_voice: &Path, language: &str) -> Result<Waveform> {
        (**self).synthesize(text, reference_voice, language)
    }
}

/// One recorded synthesis request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesisCall {
    pub text: String,
    pub reference_voice: PathBuf,
    pub language: String,
}

type TextPredicate = Box<dyn Fn(&str) -> bool + Send + Sync>;

/// Mock synthesizer for testing
pub struct MockSynthesizer {
    fail_when: Option<TextPredicate>,
    delay: Option<Duration>,
    slow_when: Option<(TextPredicate, Duration)>,
    sample_rate: u32,
    calls: Mutex<Vec<SynthesisCall>>,
    finished: Arc<AtomicUsize>,
}

impl std::fmt::Debug for MockSynthesizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockSynthesizer")
            .field("delay", &self.delay)
            .field("sample_rate", &self.sample_rate)
            .field("calls", &self.calls)
            .field("finished", &self.finished)
            .finish()
    }
}

impl Default for MockSynthesizer {
    fn default() -> Self {
        Self::new()
    }
}

impl MockSynthesizer {
    pub fn new() -> Self {
        Self {
            fail_when: None,
            delay: None,
            slow_when: None,
            sample_rate: 24000,
            calls: Mutex::new(Vec::new()),
            finished: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Fail every call whose text matches `predicate`.
    pub fn failing_when(
        mut self,
        predicate: impl Fn(&str) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.fail_when = Some(Box::new(predicate));
        self
    }

    /// Fail every call.
    pub fn with_failure(self) -> Self {
        self.failing_when(|_| true)
    }

    /// Sleep this long inside each call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Sleep an extra `delay` in calls whose text matches `predicate`.
    pub fn with_delay_when(
        mut self,
        predicate: impl Fn(&str) -> bool + Send + Sync + 'static,
        delay: Duration,
    ) -> Self {
        self.slow_when = Some((Box::new(predicate), delay));
        self
    }

    /// Number of calls that have returned, shared so other mocks can
    /// observe synthesis progress.
    pub fn finished_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.finished)
    }

    /// Every call made so far, in order.
    pub fn calls(&self) -> Vec<SynthesisCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

impl SpeechSynthesizer for MockSynthesizer {
    fn synthesize(&self, text: &str, reference_voice: &Path, language: &str) -> Result<Waveform> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(SynthesisCall {
                text: text.to_string(),
                reference_voice: reference_voice.to_path_buf(),
                language: language.to_string(),
            });
        }
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        if let Some((slow, delay)) = &self.slow_when
            && slow(text)
        {
            std::thread::sleep(*delay);
        }

        let result = if self.fail_when.as_ref().is_some_and(|fail| fail(text)) {
            Err(VoiceLoopError::Synthesis {
                message: format!("mock synthesis failure for {:?}", text),
            })
        } else {
            // One sample per character keeps output length observable.
            let samples = text.chars().map(|_| 0.1).collect();
            Ok(Waveform::new(samples, self.sample_rate))
        };
        self.finished.fetch_add(1, Ordering::SeqCst);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_records_calls() {
        let synth = MockSynthesizer::new();
        synth.synthesize("hi", Path::new("voice.wav"), "en").unwrap();

        assert_eq!(
            synth.calls(),
            vec![SynthesisCall {
                text: "hi".to_string(),
                reference_voice: PathBuf::from("voice.wav"),
                language: "en".to_string(),
            }]
        );
    }

    #[test]
    fn test_mock_output_length_tracks_text() {
        let waveform = MockSynthesizer::new()
            .synthesize("abcd", Path::new("v.wav"), "en")
            .unwrap();
        assert_eq!(waveform.samples.len(), 4);
        assert_eq!(waveform.sample_rate, 24000);
    }

    #[test]
    fn test_mock_predicate_failure() {
        let synth = MockSynthesizer::new().failing_when(|t| t.contains("bad"));

        assert!(synth.synthesize("good", Path::new("v.wav"), "en").is_ok());
        assert!(matches!(
            synth.synthesize("bad one", Path::new("v.wav"), "en"),
            Err(VoiceLoopError::Synthesis { .. })
        ));
        assert_eq!(synth.calls().len(), 2);
    }

    #[test]
    fn test_synthesizer_trait_is_object_safe() {
        let synth: Arc<dyn SpeechSynthesizer> = Arc::new(MockSynthesizer::new().with_failure());
        assert!(synth.synthesize("x", Path::new("v.wav"), "en").is_err());
    }

    #[test]
    fn test_finished_counter_counts_failures_too() {
        let synth = MockSynthesizer::new().failing_when(|t| t == "bad");
        let finished = synth.finished_counter();

        synth.synthesize("good", Path::new("v.wav"), "en").unwrap();
        assert!(synth.synthesize("bad", Path::new("v.wav"), "en").is_err());

        assert_eq!(finished.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_delay_when_only_slows_matching_text() {
        let synth = MockSynthesizer::new()
            .with_delay_when(|t| t == "slow", Duration::from_millis(50));

        let started = std::time::Instant::now();
        synth.synthesize("fast", Path::new("v.wav"), "en").unwrap();
        assert!(started.elapsed() < Duration::from_millis(50));

        let started = std::time::Instant::now();
        synth.synthesize("slow", Path::new("v.wav"), "en").unwrap();
        assert!(started.elapsed() >= Duration::from_millis(50));
    }
}
