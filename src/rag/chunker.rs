//! Splits document text into overlapping, sentence-aligned windows.

use serde::{Deserialize, Serialize};

use crate::core::config::IngestionConfig;

/// A text chunk with its position in the source document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextChunk {
    pub text: String,
    /// Character offset in the original document
    pub start_offset: usize,
    pub chunk_index: usize,
}

#[derive(Debug, Clone)]
pub struct TextChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl TextChunker {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            chunk_overlap: chunk_overlap.min(chunk_size - 1),
        }
    }

    pub fn from_config(config: &IngestionConfig) -> Self {
        Self::new(config.chunk_size, config.chunk_overlap)
    }

    /// Split text into overlapping chunks. Whitespace-only windows are
    /// dropped and indices stay contiguous.
    pub fn split(&self, text: &str) -> Vec<TextChunk> {
        let chars: Vec<char> = text.chars().collect();
        let total_chars = chars.len();
        let mut chunks = Vec::new();

        if total_chars == 0 {
            return chunks;
        }

        let mut start = 0;

        while start < total_chars {
            let end = (start + self.chunk_size).min(total_chars);
            let window = &chars[start..end];

            let cut = if end < total_chars {
                sentence_boundary(window)
            } else {
                window.len()
            };
            let chunk_text: String = window[..cut].iter().collect();
            let trimmed = chunk_text.trim();

            if !trimmed.is_empty() {
                chunks.push(TextChunk {
                    text: trimmed.to_string(),
                    start_offset: start,
                    chunk_index: chunks.len(),
                });
            }

            if end == total_chars {
                break;
            }
            // Overlap is measured from the actual cut so a short chunk
            // never leaves a gap before the next one.
            start += cut.saturating_sub(self.chunk_overlap).max(1);
        }

        chunks
    }
}

/// Length of the window up to the last sentence ending in its final 20%,
/// or the full window when there is none.
fn sentence_boundary(window: &[char]) -> usize {
    let search_start = (window.len() * 80) / 100;

    for pos in (search_start..window.len()).rev() {
        let c = window[pos];
        if matches!(c, '.' | '!' | '?') {
            let next = window.get(pos + 1);
            if matches!(next, Some(' ') | Some('\n')) {
                return pos + 2;
            }
        }
    }

    window.len()
}
