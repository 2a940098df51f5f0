//! Deterministic text chunking with overlap.
//!
//! Splits extracted text into bounded segments, preferring paragraph,
//! then sentence, then word boundaries before a hard character cut.
//! Pure; safe to run in parallel across documents.

use crate::config::RagConfig;
use crate::errors::RagError;

const SENTENCE_ENDINGS: [char; 3] = ['.', '!', '?'];

#[derive(Debug, Clone)]
pub struct Chunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl Chunker {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self, RagError> {
        if chunk_size == 0 {
            return Err(RagError::InvalidInput(
                "chunk_size must be positive".to_string(),
            ));
        }
        if chunk_overlap >= chunk_size {
            return Err(RagError::InvalidInput(format!(
                "chunk_overlap ({chunk_overlap}) must be smaller than chunk_size ({chunk_size})"
            )));
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
        })
    }

    pub fn from_config(config: &RagConfig) -> Result<Self, RagError> {
        Self::new(config.chunk_size, config.chunk_overlap)
    }

    pub fn split(&self, text: &str) -> Result<Vec<String>, RagError> {
        chunk(text, self.chunk_size, self.chunk_overlap)
    }
}

impl Default for Chunker {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
        }
    }
}

/// Splits `text` into an ordered sequence of overlapping segments.
///
/// Each segment is at most `chunk_size` characters; consecutive segments
/// overlap by approximately `chunk_overlap` characters. Text that fits in
/// one segment is returned whole (trimmed).
pub fn chunk(text: &str, chunk_size: usize, chunk_overlap: usize) -> Result<Vec<String>, RagError> {
    if chunk_size == 0 {
        return Err(RagError::InvalidInput(
            "chunk_size must be positive".to_string(),
        ));
    }
    if chunk_overlap >= chunk_size {
        return Err(RagError::InvalidInput(format!(
            "chunk_overlap ({chunk_overlap}) must be smaller than chunk_size ({chunk_size})"
        )));
    }

    let normalized = text.trim();
    if normalized.is_empty() {
        return Err(RagError::InvalidInput(
            "text is empty after normalization".to_string(),
        ));
    }

    let chars: Vec<char> = normalized.chars().collect();
    let total = chars.len();
    if total <= chunk_size {
        return Ok(vec![normalized.to_string()]);
    }

    let mut chunks = Vec::new();
    let mut start = 0;
    while start < total {
        let window_end = (start + chunk_size).min(total);
        let cut = if window_end < total {
            start + find_cut(&chars[start..window_end])
        } else {
            total
        };

        let piece: String = chars[start..cut].iter().collect();
        let piece = piece.trim();
        if !piece.is_empty() {
            chunks.push(piece.to_string());
        }

        if cut >= total {
            break;
        }
        start = cut.saturating_sub(chunk_overlap).max(start + 1);
    }

    Ok(chunks)
}

/// Picks a cut offset (exclusive, relative to the window) for a window that
/// does not reach the end of the text. Prefers a paragraph break in the back
/// half, then a sentence ending or word boundary near the window's end.
fn find_cut(window: &[char]) -> usize {
    let len = window.len();
    debug_assert!(len > 0);

    let para_lo = len / 2;
    for i in (para_lo..len.saturating_sub(1)).rev() {
        if window[i] == '\n' && window[i + 1] == '\n' {
            return i + 2;
        }
    }

    let tail_lo = len * 4 / 5;
    for i in (tail_lo..len.saturating_sub(1)).rev() {
        if SENTENCE_ENDINGS.contains(&window[i]) && window[i + 1].is_whitespace() {
            return i + 2;
        }
    }

    for i in (tail_lo..len).rev() {
        if window[i].is_whitespace() {
            return i + 1;
        }
    }

    len
}
