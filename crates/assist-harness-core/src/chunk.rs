//! Overlapping sliding-window text chunker.
//!
//! Splits document text into windows of at most `chunk_size` characters.
//! Consecutive windows share `overlap` characters so a query that straddles
//! a cut point still finds its context in at least one chunk.
//!
//! # Algorithm
//!
//! 1. Start a window at `start` and tentatively end it at `start + chunk_size`.
//! 2. If the window does not reach the end of the text, look backwards inside
//!    it for the last paragraph break (`\n\n`) or sentence break (`. `).
//! 3. If that break lies past the window midpoint, cut right after its first
//!    character instead of at the raw boundary.
//! 4. Emit the window; stop if it reached the end of the text.
//! 5. Otherwise continue from `end - overlap`.
//!
//! A break is only taken when the next window would still start after the
//! current one, so every configuration accepted by [`ChunkerConfig::new`]
//! terminates.
//!
//! # Example
//!
//! ```rust
//! use assist_harness_core::chunk::{chunk_text, ChunkerConfig};
//!
//! let config = ChunkerConfig::new(1000, 200).unwrap();
//! let chunks = chunk_text("Hello world.\n\nSecond paragraph.", &config);
//! assert_eq!(chunks.len(), 1);
//! assert!(chunk_text("", &config).is_empty());
//! ```

use std::ops::Range;

use anyhow::{bail, Result};

/// Default window size in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 1000;

/// Default number of characters shared by consecutive windows.
pub const DEFAULT_OVERLAP: usize = 200;

/// Validated chunker settings.
///
/// `overlap` is always strictly smaller than `chunk_size`; anything else
/// would produce windows that never advance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkerConfig {
    chunk_size: usize,
    overlap: usize,
}

impl ChunkerConfig {
    /// Validated chunker settings.
    ///
    /// # Arguments
    ///
    /// * `chunk_size` - maximum window length in characters; must be non-zero.
    /// * `overlap` - characters shared by consecutive windows; must be smaller
    ///   than `chunk_size`.
    ///
    /// # Returns
    ///
    /// The settings, or an error naming the first violated constraint.
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            bail!("chunk_size must be > 0");
        }
        if overlap >= chunk_size {
            bail!(
                "chunk overlap ({}) must be smaller than chunk_size ({}): windows would never advance",
                overlap,
                chunk_size
            );
        }
        Ok(Self {
            chunk_size,
            overlap,
        })
    }

    /// Maximum window length, in characters.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Characters repeated at the start of each following window.
    pub fn overlap(&self) -> usize {
        self.overlap
    }
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_OVERLAP,
        }
    }
}

/// Split `text` into trimmed, overlapping chunks.
///
/// Windows that are empty after trimming are skipped. Empty input yields
/// no chunks.
pub fn chunk_text(text: &str, config: &ChunkerConfig) -> Vec<String> {
    chunk_spans(text, config)
        .into_iter()
        .map(|span| text[span].trim().to_string())
        .filter(|chunk| !chunk.is_empty())
        .collect()
}

/// Byte ranges of every window [`chunk_text`] would produce, untrimmed.
///
/// Ranges always fall on UTF-8 character boundaries. The first range starts
/// at 0, the last ends at `text.len()`, and each range starts at or before
/// the end of the previous one.
pub fn chunk_spans(text: &str, config: &ChunkerConfig) -> Vec<Range<usize>> {
    // Byte offset of every char position, plus the end of the text.
    let bounds: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();
    let total_chars = bounds.len() - 1;

    let mut spans = Vec::new();
    let mut start = 0usize;

    while start < total_chars {
        let mut end = (start + config.chunk_size).min(total_chars);

        if end < total_chars {
            let window = &text[bounds[start]..bounds[end]];
            if let Some(brk) = last_natural_break(window) {
                let cut = start + brk + 1;
                if brk > config.chunk_size / 2 && cut > start + config.overlap {
                    end = cut;
                }
            }
        }

        spans.push(bounds[start]..bounds[end]);

        if end >= total_chars {
            break;
        }
        start = end - config.overlap;
    }

    spans
}

/// Char offset of the last paragraph or sentence break inside `window`.
fn last_natural_break(window: &str) -> Option<usize> {
    let paragraph = window.rfind("\n\n");
    let sentence = window.rfind(". ");
    let byte_pos = match (paragraph, sentence) {
        (Some(p), Some(s)) => p.max(s),
        (Some(p), None) => p,
        (None, Some(s)) => s,
        (None, None) => return None,
    };
    Some(window[..byte_pos].chars().count())
}
