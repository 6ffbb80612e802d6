//! Server-sent event decoding for chat completion streams.
//!
//! Each event line has the form `data: {json}`; the stream ends with
//! `data: [DONE]`. Lines may be split across network chunks.

use crate::error::{Result, VoiceLoopError};
use crate::llm::stream::TokenStream;
use futures_util::stream::{self, Stream, StreamExt};
use serde::Deserialize;
use std::collections::VecDeque;
use std::pin::Pin;

/// One decoded event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseEvent {
    Token(String),
    Done,
}

#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    error: Option<ProviderError>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: Delta,
}

#[derive(Debug, Default, Deserialize)]
struct Delta {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProviderError {
    message: String,
}

/// Incremental line decoder. Feed raw bytes, get complete events back.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append bytes and decode every complete line.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<Result<SseEvent>> {
        self.buffer.extend_from_slice(bytes);

        let mut events = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            if let Some(event) = parse_line(&line) {
                events.push(event);
            }
        }
        events
    }

    /// Decode whatever is left once the body has ended.
    pub fn finish(&mut self) -> Vec<Result<SseEvent>> {
        let rest = std::mem::take(&mut self.buffer);
        parse_line(&rest).into_iter().collect()
    }
}

fn parse_line(line: &[u8]) -> Option<Result<SseEvent>> {
    let line = String::from_utf8_lossy(line);
    let payload = line.trim_end_matches(['\r', '\n']).strip_prefix("data:")?.trim();

    if payload.is_empty() {
        return None;
    }
    if payload == "[DONE]" {
        return Some(Ok(SseEvent::Done));
    }

    match serde_json::from_str::<StreamChunk>(payload) {
        Ok(chunk) => {
            if let Some(error) = chunk.error {
                return Some(Err(VoiceLoopError::LlmStream {
                    message: error.message,
                }));
            }
            let token = chunk
                .choices
                .into_iter()
                .next()
                .and_then(|choice| choice.delta.content)
                .filter(|content| !content.is_empty())?;
            Some(Ok(SseEvent::Token(token)))
        }
        Err(e) => Some(Err(VoiceLoopError::LlmStream {
            message: format!("Malformed stream event: {}", e),
        })),
    }
}

struct SseState<S> {
    body: Pin<Box<S>>,
    decoder: SseDecoder,
    pending: VecDeque<Result<SseEvent>>,
    finished: bool,
}

/// Turn a raw byte stream into a stream of non-empty tokens.
///
/// Ends at `[DONE]`, at the end of the body, or after the first error.
pub fn token_stream<S, B, E>(body: S) -> TokenStream
where
    S: Stream<Item = std::result::Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    let state = SseState {
        body: Box::pin(body),
        decoder: SseDecoder::new(),
        pending: VecDeque::new(),
        finished: false,
    };

    Box::pin(stream::unfold(state, |mut state| async move {
        loop {
            if let Some(event) = state.pending.pop_front() {
                match event {
                    Ok(SseEvent::Token(token)) => return Some((Ok(token), state)),
                    Ok(SseEvent::Done) => return None,
                    Err(e) => {
                        state.pending.clear();
                        state.finished = true;
                        return Some((Err(e), state));
                    }
                }
            }
            if state.finished {
                return None;
            }

            match state.body.next().await {
                Some(Ok(bytes)) => {
                    let events = state.decoder.push(bytes.as_ref());
                    state.pending.extend(events);
                }
                Some(Err(e)) => {
                    state.finished = true;
                    return Some((
                        Err(VoiceLoopError::LlmStream {
                            message: e.to_string(),
                        }),
                        state,
                    ));
                }
                None => {
                    state.finished = true;
                    let events = state.decoder.finish();
                    state.pending.extend(events);
                }
            }
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(content: &str) -> String {
        format!(
            "data: {}\n\n",
            serde_json::json!({"choices": [{"delta": {"content": content}}]})
        )
    }

    async fn collect(parts: Vec<String>) -> Vec<Result<String>> {
        let body = stream::iter(
            parts
                .into_iter()
                .map(|p| Ok::<_, std::io::Error>(p.into_bytes())),
        );
        token_stream(body).collect().await
    }

    #[test]
    fn test_decoder_parses_tokens_and_done() {
        let mut decoder = SseDecoder::new();
        let mut input = chunk("Hi");
        input.push_str("data: [DONE]\n\n");

        let events: Vec<SseEvent> = decoder
            .push(input.as_bytes())
            .into_iter()
            .map(|e| e.unwrap())
            .collect();

        assert_eq!(
            events,
            vec![SseEvent::Token("Hi".to_string()), SseEvent::Done]
        );
    }

    #[test]
    fn test_decoder_handles_split_lines() {
        let mut decoder = SseDecoder::new();
        let input = chunk("split");
        let (a, b) = input.split_at(10);

        assert!(decoder.push(a.as_bytes()).is_empty());
        let events = decoder.push(b.as_bytes());
        assert_eq!(events.len(), 1);
        assert_eq!(*events[0].as_ref().unwrap(), SseEvent::Token("split".to_string()));
    }

    #[test]
    fn test_decoder_skips_empty_and_role_only_deltas() {
        let mut decoder = SseDecoder::new();
        let input = concat!(
            "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"\"}}]}\n",
            ": keep-alive\n",
            "\n",
        );
        assert!(decoder.push(input.as_bytes()).is_empty());
    }

    #[test]
    fn test_decoder_accepts_crlf() {
        let mut decoder = SseDecoder::new();
        let input = chunk("x").replace('\n', "\r\n");
        let events = decoder.push(input.as_bytes());
        assert_eq!(*events[0].as_ref().unwrap(), SseEvent::Token("x".to_string()));
    }

    #[test]
    fn test_decoder_reports_provider_error() {
        let mut decoder = SseDecoder::new();
        let events = decoder.push(b"data: {\"error\":{\"message\":\"rate limited\"}}\n");
        match &events[0] {
            Err(VoiceLoopError::LlmStream { message }) => assert_eq!(message, "rate limited"),
            other => panic!("Expected LlmStream error, got {:?}", other),
        }
    }

    #[test]
    fn test_decoder_reports_malformed_json() {
        let mut decoder = SseDecoder::new();
        let events = decoder.push(b"data: {not json\n");
        assert!(matches!(events[0], Err(VoiceLoopError::LlmStream { .. })));
    }

    #[test]
    fn test_finish_decodes_unterminated_line() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(b"data: [DONE]").is_empty());
        assert_eq!(decoder.finish().len(), 1);
    }

    #[tokio::test]
    async fn test_token_stream_stops_at_done() {
        let mut after_done = chunk("Hello");
        after_done.push_str("data: [DONE]\n\n");
        let tokens = collect(vec![after_done, chunk("ignored")]).await;

        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].as_ref().unwrap(), "Hello");
    }

    #[tokio::test]
    async fn test_token_stream_across_chunks() {
        let whole = format!("{}{}", chunk("Hel"), chunk("lo."));
        let (a, b) = whole.split_at(7);
        let tokens: Vec<String> = collect(vec![a.to_string(), b.to_string()])
            .await
            .into_iter()
            .map(|t| t.unwrap())
            .collect();

        assert_eq!(tokens, vec!["Hel", "lo."]);
    }

    #[tokio::test]
    async fn test_token_stream_ends_without_done() {
        let tokens = collect(vec![chunk("only")]).await;
        assert_eq!(tokens.len(), 1);
    }

    #[tokio::test]
    async fn test_token_stream_stops_after_error() {
        let parts = vec![
            chunk("a"),
            "data: {\"error\":{\"message\":\"boom\"}}\n".to_string(),
            chunk("b"),
        ];
        let tokens = collect(parts).await;

        assert_eq!(tokens.len(), 2);
        assert!(tokens[1].is_err());
    }

    #[tokio::test]
    async fn test_token_stream_surfaces_transport_error() {
        let body = stream::iter(vec![
            Ok(chunk("a").into_bytes()),
            Err(std::io::Error::other("connection reset")),
        ]);
        let tokens: Vec<Result<String>> = token_stream(body).collect().await;

        assert_eq!(tokens.len(), 2);
        match &tokens[1] {
            Err(VoiceLoopError::LlmStream { message }) => {
                assert!(message.contains("connection reset"))
            }
            other => panic!("Expected LlmStream error, got {:?}", other),
        }
    }
}
