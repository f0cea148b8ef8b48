use anyhow::{bail, Context, Result};
use std::collections::VecDeque;
use tiktoken_rs::CoreBPE;
use unicode_segmentation::UnicodeSegmentation;

/// Separators tried from coarsest to finest. The empty separator splits
/// into grapheme clusters.
const SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

/// Recursive splitter that measures chunk length in GPT-2 BPE tokens.
pub struct TextSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
    bpe: CoreBPE,
}

impl TextSplitter {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            bail!("chunk size must be greater than zero");
        }
        if chunk_overlap >= chunk_size {
            bail!(
                "chunk overlap ({}) must be smaller than chunk size ({})",
                chunk_overlap,
                chunk_size
            );
        }

        let bpe = tiktoken_rs::r50k_base().context("failed to load the r50k_base tokenizer")?;

        Ok(Self {
            chunk_size,
            chunk_overlap,
            bpe,
        })
    }

    pub fn count_tokens(&self, text: &str) -> usize {
        self.bpe.encode_ordinary(text).len()
    }

    pub fn split_text(&self, text: &str) -> Vec<String> {
        let chunks = self.split_recursive(text, &SEPARATORS);
        log::debug!("Split {} bytes into {} chunks", text.len(), chunks.len());
        chunks
    }

    fn split_recursive(&self, text: &str, separators: &[&str]) -> Vec<String> {
        let Some(position) = separators
            .iter()
            .position(|separator| separator.is_empty() || text.contains(separator))
        else {
            return trimmed(text).into_iter().collect();
        };

        let separator = separators[position];
        let remaining = &separators[position + 1..];

        let mut chunks = Vec::new();
        let mut fitting: Vec<&str> = Vec::new();

        for piece in split_keeping_separator(text, separator) {
            if self.count_tokens(piece) < self.chunk_size {
                fitting.push(piece);
                continue;
            }

            if !fitting.is_empty() {
                chunks.extend(self.merge_splits(&fitting));
                fitting.clear();
            }

            if remaining.is_empty() {
                chunks.extend(trimmed(piece));
            } else {
                chunks.extend(self.split_recursive(piece, remaining));
            }
        }

        if !fitting.is_empty() {
            chunks.extend(self.merge_splits(&fitting));
        }

        chunks
    }

    /// Greedily packs pieces into chunks of at most `chunk_size` tokens,
    /// carrying up to `chunk_overlap` tokens of tail into the next chunk.
    fn merge_splits(&self, pieces: &[&str]) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut window: VecDeque<(&str, usize)> = VecDeque::new();
        let mut total = 0;

        for &piece in pieces {
            let len = self.count_tokens(piece);

            if total + len > self.chunk_size && !window.is_empty() {
                if total > self.chunk_size {
                    log::warn!(
                        "Created a chunk of {} tokens, longer than the specified {}",
                        total,
                        self.chunk_size
                    );
                }
                chunks.extend(join_window(&window));

                while total > self.chunk_overlap || (total + len > self.chunk_size && total > 0) {
                    match window.pop_front() {
                        Some((_, dropped)) => total -= dropped,
                        None => break,
                    }
                }
            }

            window.push_back((piece, len));
            total += len;
        }

        chunks.extend(join_window(&window));
        chunks
    }
}

/// Splits on `separator`, keeping each separator at the start of the piece
/// that follows it. Empty pieces are dropped.
fn split_keeping_separator<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    if separator.is_empty() {
        return text.graphemes(true).collect();
    }

    let mut pieces = Vec::new();
    let mut start = 0;
    for (idx, _) in text.match_indices(separator) {
        if idx > start {
            pieces.push(&text[start..idx]);
        }
        start = idx;
    }
    if start < text.len() {
        pieces.push(&text[start..]);
    }
    pieces
}

fn join_window(window: &VecDeque<(&str, usize)>) -> Option<String> {
    let joined: String = window.iter().map(|(piece, _)| *piece).collect();
    trimmed(&joined)
}

fn trimmed(text: &str) -> Option<String> {
    let text = text.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered_words(count: usize) -> String {
        (0..count)
            .map(|i| format!("w{}", i))
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn rejects_invalid_sizes() {
        assert!(TextSplitter::new(0, 0).is_err());
        assert!(TextSplitter::new(10, 10).is_err());
        assert!(TextSplitter::new(10, 20).is_err());
        assert!(TextSplitter::new(10, 9).is_ok());
    }

    #[test]
    fn empty_text_gives_no_chunks() {
        let splitter = TextSplitter::new(16, 4).unwrap();
        assert!(splitter.split_text("").is_empty());
        assert!(splitter.split_text(" \n\n \n ").is_empty());
    }

    #[test]
    fn short_text_is_a_single_trimmed_chunk() {
        let splitter = TextSplitter::new(64, 8).unwrap();
        let chunks = splitter.split_text("  just a few words\n");
        assert_eq!(chunks, vec!["just a few words".to_string()]);
    }

    #[test]
    fn chunks_without_overlap_cover_the_text_once() {
        let splitter = TextSplitter::new(12, 0).unwrap();
        let text = numbered_words(120);
        let chunks = splitter.split_text(&text);

        assert!(chunks.len() > 1);
        let rejoined: Vec<&str> = chunks.iter().flat_map(|c| c.split_whitespace()).collect();
        let original: Vec<&str> = text.split_whitespace().collect();
        assert_eq!(rejoined, original);
    }

    #[test]
    fn chunks_stay_within_the_token_budget() {
        let splitter = TextSplitter::new(12, 4).unwrap();
        let text = numbered_words(200);
        for chunk in splitter.split_text(&text) {
            // every word costs at least one token
            assert!(chunk.split_whitespace().count() <= 12, "chunk too long: {chunk}");
        }
    }

    #[test]
    fn consecutive_chunks_overlap() {
        let splitter = TextSplitter::new(12, 4).unwrap();
        let text = numbered_words(200);
        let chunks = splitter.split_text(&text);

        assert!(chunks.len() > 2);
        for pair in chunks.windows(2) {
            let last_word = pair[0].split_whitespace().last().unwrap();
            assert!(
                pair[1].split_whitespace().any(|w| w == last_word),
                "'{}' not carried into '{}'",
                last_word,
                pair[1]
            );
        }
    }

    #[test]
    fn prefers_paragraph_boundaries() {
        let splitter = TextSplitter::new(20, 0).unwrap();
        let first = "Rust uses ownership and borrowing to guarantee memory safety.";
        let second = "The recipe needs flour, sugar, eggs and butter mixed together.";
        let chunks = splitter.split_text(&format!("{first}\n\n{second}"));
        assert_eq!(chunks, vec![first.to_string(), second.to_string()]);
    }

    #[test]
    fn text_without_separators_falls_back_to_graphemes() {
        let splitter = TextSplitter::new(5, 0).unwrap();
        let text = "x".repeat(100);
        let chunks = splitter.split_text(&text);

        assert!(chunks.len() > 1);
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn keeps_separator_with_following_piece() {
        let pieces = split_keeping_separator("\n\n\n\nabc\n\ndef", "\n\n");
        assert_eq!(pieces, vec!["\n\n", "\n\nabc", "\n\ndef"]);
    }
}
