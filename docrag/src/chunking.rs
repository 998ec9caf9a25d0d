//! Document chunking.
//!
//! This module provides the [`Chunker`] trait and [`FixedSizeChunker`], a
//! sliding character window with configurable overlap. Sizes and offsets are
//! counted in Unicode scalar values, so multi-byte text is never split inside
//! a character.
//!
//! Consecutive chunks always share exactly `overlap` characters, which makes
//! the split reversible: the first chunk followed by every later chunk with
//! its first `overlap` characters removed reproduces the input text.

use crate::config::validate_chunking;
use crate::error::Result;

/// A strategy for splitting document text into ordered chunk texts.
pub trait Chunker: Send + Sync {
    /// Split `text` into chunks of at most `chunk_size` characters, each
    /// starting `overlap` characters before the previous one ends.
    ///
    /// Returns an empty `Vec` for empty text.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigurationError`](crate::RagError::ConfigurationError)
    /// unless `chunk_size > 0` and `overlap < chunk_size`.
    fn split(&self, text: &str, chunk_size: usize, overlap: usize) -> Result<Vec<String>>;
}

/// Splits text into fixed-size character windows with overlap.
///
/// With the default tolerance of zero every window is cut at exactly
/// `chunk_size` characters. A non-zero `boundary_tolerance` lets a window end
/// move back by up to that many characters to land after a paragraph break,
/// a sentence terminator, or whitespace, in that order of preference.
///
/// # Example
///
/// ```rust
/// use docrag::{Chunker, FixedSizeChunker};
///
/// let chunks = FixedSizeChunker::new().split("ABCDEFGHIJKLMNO", 10, 3).unwrap();
/// assert_eq!(chunks, vec!["ABCDEFGHIJ", "HIJKLMNO"]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct FixedSizeChunker {
    boundary_tolerance: usize,
}

impl FixedSizeChunker {
    /// Create a pure fixed-width chunker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allow chunk ends to snap back by up to `tolerance` characters.
    pub fn with_boundary_tolerance(mut self, tolerance: usize) -> Self {
        self.boundary_tolerance = tolerance;
        self
    }
}

impl Chunker for FixedSizeChunker {
    fn split(&self, text: &str, chunk_size: usize, overlap: usize) -> Result<Vec<String>> {
        validate_chunking(chunk_size, overlap)?;
        if text.is_empty() {
            return Ok(Vec::new());
        }

        // Byte offset of every char boundary, including the end of the text.
        let offsets: Vec<usize> =
            text.char_indices().map(|(i, _)| i).chain(std::iter::once(text.len())).collect();
        let chars: Vec<char> = text.chars().collect();
        let len = chars.len();

        let mut chunks = Vec::with_capacity(len / (chunk_size - overlap) + 1);
        let mut start = 0;

        loop {
            let hard_end = (start + chunk_size).min(len);
            let end = if hard_end < len && self.boundary_tolerance > 0 {
                self.snap_end(&chars, start, hard_end, overlap)
            } else {
                hard_end
            };

            chunks.push(text[offsets[start]..offsets[end]].to_string());
            if end == len {
                break;
            }
            // end > start + overlap, so the window always advances.
            start = end - overlap;
        }

        Ok(chunks)
    }
}

impl FixedSizeChunker {
    /// Pick the cut point for a window `[start, hard_end)`.
    ///
    /// The returned end is never below `start + overlap + 1`.
    fn snap_end(&self, chars: &[char], start: usize, hard_end: usize, overlap: usize) -> usize {
        let lowest = hard_end.saturating_sub(self.boundary_tolerance).max(start + overlap + 1);
        if lowest >= hard_end {
            return hard_end;
        }

        let candidates = || (lowest..=hard_end).rev();
        let is_paragraph = |e: usize| e >= 2 && chars[e - 1] == '\n' && chars[e - 2] == '\n';
        let is_sentence = |e: usize| {
            e >= 2 && chars[e - 1].is_whitespace() && matches!(chars[e - 2], '.' | '!' | '?')
        };
        let is_space = |e: usize| e >= 1 && chars[e - 1].is_whitespace();

        candidates()
            .find(|&e| is_paragraph(e))
            .or_else(|| candidates().find(|&e| is_sentence(e)))
            .or_else(|| candidates().find(|&e| is_space(e)))
            .unwrap_or(hard_end)
    }
}

/// Rebuild the source text from chunks produced with the given `overlap`.
///
/// This is the inverse of [`Chunker::split`] and is mostly useful for
/// verifying chunk output.
pub fn reassemble(chunks: &[String], overlap: usize) -> String {
    let mut text = String::new();
    for (i, chunk) in chunks.iter().enumerate() {
        if i == 0 {
            text.push_str(chunk);
        } else {
            text.extend(chunk.chars().skip(overlap));
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RagError;

    #[test]
    fn window_scenario_matches_expected_offsets() {
        let chunks = FixedSizeChunker::new().split("ABCDEFGHIJKLMNO", 10, 3).unwrap();
        assert_eq!(chunks, vec!["ABCDEFGHIJ".to_string(), "HIJKLMNO".to_string()]);
    }

    #[test]
    fn empty_text_yields_no_chunks() {
        assert!(FixedSizeChunker::new().split("", 10, 3).unwrap().is_empty());
    }

    #[test]
    fn short_text_is_a_single_chunk() {
        let chunks = FixedSizeChunker::new().split("short", 10, 3).unwrap();
        assert_eq!(chunks, vec!["short".to_string()]);
    }

    #[test]
    fn exact_multiple_does_not_emit_trailing_overlap_chunk() {
        let chunks = FixedSizeChunker::new().split("ABCDEFGHIJ", 10, 3).unwrap();
        assert_eq!(chunks.len(), 1);
    }

    #[test]
    fn invalid_parameters_are_rejected() {
        let chunker = FixedSizeChunker::new();
        assert!(matches!(chunker.split("abc", 0, 0), Err(RagError::ConfigurationError(_))));
        assert!(matches!(chunker.split("abc", 5, 5), Err(RagError::ConfigurationError(_))));
        assert!(matches!(chunker.split("", 5, 7), Err(RagError::ConfigurationError(_))));
    }

    #[test]
    fn multibyte_text_is_split_on_char_boundaries() {
        let text = "héllo wörld ünïcode ✓✓✓";
        let chunks = FixedSizeChunker::new().split(text, 7, 2).unwrap();
        assert!(chunks.iter().all(|c| c.chars().count() <= 7));
        assert_eq!(reassemble(&chunks, 2), text);
    }

    #[test]
    fn tolerance_prefers_sentence_boundary() {
        let text = "One two. Three four five six seven.";
        let chunks =
            FixedSizeChunker::new().with_boundary_tolerance(6).split(text, 12, 2).unwrap();
        assert_eq!(chunks[0], "One two. ");
        assert_eq!(reassemble(&chunks, 2), text);
    }

    #[test]
    fn tolerance_falls_back_to_hard_cut() {
        let text = "abcdefghijklmnopqrstuvwxyz";
        let snapped =
            FixedSizeChunker::new().with_boundary_tolerance(4).split(text, 10, 2).unwrap();
        let fixed = FixedSizeChunker::new().split(text, 10, 2).unwrap();
        assert_eq!(snapped, fixed);
    }
}
