//! Sentence segmentation over a token stream.
//!
//! A sentence boundary is `.`, `!` or `?` immediately followed by
//! whitespace. The whole whitespace run after the punctuation is the split
//! point and belongs to neither side.

/// Buffers tokens and hands back complete sentences as soon as they close.
///
/// Holds one turn's unterminated tail and nothing else; create a new one per
/// turn.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SentenceSegmenter {
    buffer: String,
}

fn is_terminal(c: char) -> bool {
    matches!(c, '.' | '!' | '?')
}

impl SentenceSegmenter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a token and return every sentence it completed, left to right.
    ///
    /// Whatever follows the last boundary stays buffered, possibly empty.
    pub fn feed(&mut self, token: &str) -> Vec<String> {
        self.buffer.push_str(token);

        let mut sentences = Vec::new();
        let mut start = 0;
        let mut chars = self.buffer.char_indices().peekable();

        while let Some((_, c)) = chars.next() {
            if !is_terminal(c) {
                continue;
            }
            let Some(&(split, next)) = chars.peek() else {
                break;
            };
            if !next.is_whitespace() {
                continue;
            }

            sentences.push(self.buffer[start..split].to_string());

            start = self.buffer.len();
            while let Some(&(idx, ch)) = chars.peek() {
                if !ch.is_whitespace() {
                    start = idx;
                    break;
                }
                chars.next();
            }
        }

        if start > 0 {
            self.buffer.drain(..start);
        }
        sentences
    }

    /// Emit the trimmed remainder, if any, and clear the buffer.
    ///
    /// Call once after the token stream ends.
    pub fn flush(&mut self) -> Vec<String> {
        let rest = std::mem::take(&mut self.buffer);
        let rest = rest.trim();
        if rest.is_empty() {
            Vec::new()
        } else {
            vec![rest.to_string()]
        }
    }

    /// The unterminated tail held for the next token.
    pub fn pending(&self) -> &str {
        &self.buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed_all(segmenter: &mut SentenceSegmenter, tokens: &[&str]) -> Vec<String> {
        tokens.iter().flat_map(|t| segmenter.feed(t)).collect()
    }

    #[test]
    fn test_sentence_completes_across_tokens() {
        let mut segmenter = SentenceSegmenter::new();

        assert!(segmenter.feed("Hel").is_empty());
        assert_eq!(segmenter.feed("lo there. "), vec!["Hello there."]);
        assert!(segmenter.feed("How are you").is_empty());
        assert_eq!(segmenter.pending(), "How are you");
        assert_eq!(segmenter.flush(), vec!["How are you"]);
        assert_eq!(segmenter.pending(), "");
    }

    #[test]
    fn test_punctuation_without_whitespace_waits() {
        let mut segmenter = SentenceSegmenter::new();

        assert!(segmenter.feed("Done.").is_empty());
        assert_eq!(segmenter.pending(), "Done.");
        assert_eq!(segmenter.feed(" Next"), vec!["Done."]);
        assert_eq!(segmenter.pending(), "Next");
    }

    #[test]
    fn test_inner_punctuation_is_not_a_boundary() {
        let mut segmenter = SentenceSegmenter::new();
        assert!(segmenter.feed("It costs 3.50 dollars").is_empty());
        assert!(segmenter.feed("...really").is_empty());
    }

    #[test]
    fn test_many_boundaries_in_one_feed() {
        let mut segmenter = SentenceSegmenter::new();

        let sentences = segmenter.feed("One. Two! Three? Four");

        assert_eq!(sentences, vec!["One.", "Two!", "Three?"]);
        assert_eq!(segmenter.pending(), "Four");
    }

    #[test]
    fn test_whitespace_run_is_consumed() {
        let mut segmenter = SentenceSegmenter::new();

        assert_eq!(segmenter.feed("Yes.\n\n  No"), vec!["Yes."]);
        assert_eq!(segmenter.pending(), "No");
    }

    #[test]
    fn test_trailing_boundary_leaves_empty_tail() {
        let mut segmenter = SentenceSegmenter::new();

        assert_eq!(segmenter.feed("All done! "), vec!["All done!"]);
        assert_eq!(segmenter.pending(), "");
        assert!(segmenter.flush().is_empty());
    }

    #[test]
    fn test_flush_trims_and_skips_blank() {
        let mut segmenter = SentenceSegmenter::new();
        segmenter.feed("   ");
        assert!(segmenter.flush().is_empty());

        segmenter.feed("  trailing words \n");
        assert_eq!(segmenter.flush(), vec!["trailing words"]);
    }

    #[test]
    fn test_unicode_text() {
        let mut segmenter = SentenceSegmenter::new();
        assert_eq!(segmenter.feed("¿Qué tal? Muy bien"), vec!["¿Qué tal?"]);
        assert_eq!(segmenter.pending(), "Muy bien");
    }

    #[test]
    fn test_sentences_rejoin_to_original_text() {
        let tokens = [
            "The ", "weather", " is nice.", " Shall we", " go out?", "  Maybe ",
            "later!", " Ok",
        ];
        let mut segmenter = SentenceSegmenter::new();
        let mut sentences = feed_all(&mut segmenter, &tokens);
        sentences.extend(segmenter.flush());

        let original: String = tokens.concat();
        let normalized_original = original.split_whitespace().collect::<Vec<_>>().join(" ");
        assert_eq!(sentences.join(" "), normalized_original);
        assert_eq!(
            sentences,
            vec!["The weather is nice.", "Shall we go out?", "Maybe later!", "Ok"]
        );
    }

    #[test]
    fn test_token_boundaries_do_not_change_output() {
        let text = "First one. Second one! Third? Tail";

        let mut whole = SentenceSegmenter::new();
        let mut expected = whole.feed(text);
        expected.extend(whole.flush());

        let mut by_char = SentenceSegmenter::new();
        let mut actual: Vec<String> = text
            .chars()
            .flat_map(|c| by_char.feed(&c.to_string()))
            .collect();
        actual.extend(by_char.flush());

        assert_eq!(actual, expected);
    }
}
