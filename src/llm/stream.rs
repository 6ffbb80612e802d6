//! The language-model seam: a lazily produced sequence of text tokens.

use crate::conversation::Turn;
use crate::error::{Result, VoiceLoopError};
use futures_util::stream::{self, Stream, StreamExt};
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Finite per turn; yields zero or more non-empty fragments, then ends.
/// Dropping it stops the provider from sending further tokens.
pub type TokenStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// A chat model that streams its reply.
#[async_trait::async_trait]
pub trait ChatModel: Send + Sync {
    /// Start streaming a reply to `history`.
    ///
    /// The system instruction is added by the implementation; `history`
    /// holds only user and assistant turns.
    async fn stream_chat(&self, history: &[Turn]) -> Result<TokenStream>;

    /// Full reply in one piece, trimmed.
    async fn complete(&self, history: &[Turn]) -> Result<String> {
        let mut tokens = self.stream_chat(history).await?;
        let mut reply = String::new();
        while let Some(token) = tokens.next().await {
            reply.push_str(&token?);
        }
        Ok(reply.trim().to_string())
    }

    fn model_name(&self) -> &str;
}

/// Scripted chat model for tests.
#[derive(Debug, Default)]
pub struct MockChatModel {
    tokens: Vec<String>,
    fail_after: Option<usize>,
    fail_to_start: bool,
    stall: bool,
    progress: Option<Arc<AtomicUsize>>,
    pulls: Arc<Mutex<Vec<usize>>>,
    calls: Mutex<Vec<Vec<Turn>>>,
}

impl MockChatModel {
    /// Stream exactly these tokens, in order.
    pub fn new<S: AsRef<str>>(tokens: &[S]) -> Self {
        Self {
            tokens: tokens.iter().map(|t| t.as_ref().to_string()).collect(),
            ..Default::default()
        }
    }

    /// Yield `count` tokens, then fail the stream.
    pub fn failing_after(mut self, count: usize) -> Self {
        self.fail_after = Some(count);
        self
    }

    /// Reject the request before any token is produced.
    pub fn failing_to_start(mut self) -> Self {
        self.fail_to_start = true;
        self
    }

    /// After the scripted tokens, never end the stream.
    pub fn stalling(mut self) -> Self {
        self.stall = true;
        self
    }

    /// Read `progress` each time a token is pulled; see [`Self::pulls`].
    pub fn observing(mut self, progress: Arc<AtomicUsize>) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Value of the observed counter at each token pull, in pull order.
    pub fn pulls(&self) -> Vec<usize> {
        self.pulls.lock().map(|p| p.clone()).unwrap_or_default()
    }

    /// History snapshots received, one per call.
    pub fn calls(&self) -> Vec<Vec<Turn>> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl ChatModel for MockChatModel {
    async fn stream_chat(&self, history: &[Turn]) -> Result<TokenStream> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(history.to_vec());
        }
        if self.fail_to_start {
            return Err(VoiceLoopError::LlmRequest {
                message: "mock request rejected".to_string(),
            });
        }

        let mut items: Vec<Result<String>> = self.tokens.iter().cloned().map(Ok).collect();
        if let Some(count) = self.fail_after {
            items.truncate(count);
            items.push(Err(VoiceLoopError::LlmStream {
                message: "mock stream dropped".to_string(),
            }));
        }

        let mut scripted = stream::iter(items).boxed();
        if let Some(progress) = &self.progress {
            let progress = Arc::clone(progress);
            let pulls = Arc::clone(&self.pulls);
            scripted = scripted
                .map(move |item| {
                    if let Ok(mut pulls) = pulls.lock() {
                        pulls.push(progress.load(Ordering::SeqCst));
                    }
                    item
                })
                .boxed();
        }
        if self.stall {
            Ok(scripted.chain(stream::pending()).boxed())
        } else {
            Ok(scripted)
        }
    }

    fn model_name(&self) -> &str {
        "mock"
    }
}
