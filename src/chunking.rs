//! Size-bounded, overlapping text chunking.
//!
//! Boundary selection is delegated to `semchunk-rs`, which prefers newline runs, then
//! whitespace, then punctuation, and only cuts inside a word as a last resort. This module adds
//! the size/overlap contract on top of it:
//!
//! - Text that already fits in `chunk_size` comes back as a single, unmodified chunk.
//! - Longer text is split with a budget of `chunk_size - chunk_overlap`, and every chunk after
//!   the first is extended backwards with up to `chunk_overlap` units of the text preceding it.
//!   Chunks therefore stay substrings of the input and consecutive chunks share context.
//! - Length is measured in characters by default, or in `cl100k_base` tokens through
//!   `tiktoken-rs` when the embedding model's token window matters more than raw size.

use anyhow::Error as TokenizerError;
use semchunk_rs::Chunker as SemanticChunker;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tiktoken_rs::cl100k_base;

type TokenCounter = Arc<dyn Fn(&str) -> usize + Send + Sync>;

/// Errors produced while turning raw text into chunks.
#[derive(Debug, Error)]
pub enum ChunkingError {
    /// Chunking configured an impossible size budget.
    #[error("chunk size must be greater than zero")]
    InvalidChunkSize,
    /// Overlap would leave no room for new text in each chunk.
    #[error("chunk overlap ({overlap}) must be smaller than the chunk size ({chunk_size})")]
    InvalidOverlap {
        /// Requested overlap.
        overlap: usize,
        /// Requested maximum chunk size.
        chunk_size: usize,
    },
    /// Tokenizer resources could not be loaded.
    #[error("failed to initialize tokenizer: {0}")]
    Tokenizer(#[source] TokenizerError),
    /// Source file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// File that failed to load.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Unit in which chunk sizes and overlaps are measured.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkUnit {
    /// Unicode scalar values.
    Characters,
    /// `cl100k_base` tokens, the encoding used by the OpenAI embedding models.
    Tokens,
}

impl std::str::FromStr for ChunkUnit {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "characters" | "chars" => Ok(Self::Characters),
            "tokens" => Ok(Self::Tokens),
            _ => Err(()),
        }
    }
}

/// Size and overlap settings for a [`Chunker`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChunkingOptions {
    /// Maximum length of a chunk.
    pub chunk_size: usize,
    /// Length shared between consecutive chunks.
    pub chunk_overlap: usize,
    /// Unit used for both values.
    pub unit: ChunkUnit,
}

impl Default for ChunkingOptions {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
            unit: ChunkUnit::Characters,
        }
    }
}

/// Splits text into ordered, overlapping chunks.
#[derive(Clone)]
pub struct Chunker {
    options: ChunkingOptions,
    counter: TokenCounter,
}

impl std::fmt::Debug for Chunker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Chunker")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl Chunker {
    /// Validate the options and prepare the length counter.
    pub fn new(options: ChunkingOptions) -> Result<Self, ChunkingError> {
        if options.chunk_size == 0 {
            return Err(ChunkingError::InvalidChunkSize);
        }
        if options.chunk_overlap >= options.chunk_size {
            return Err(ChunkingError::InvalidOverlap {
                overlap: options.chunk_overlap,
                chunk_size: options.chunk_size,
            });
        }

        let counter = match options.unit {
            ChunkUnit::Characters => character_counter(),
            ChunkUnit::Tokens => tiktoken_counter()?,
        };

        Ok(Self { options, counter })
    }

    /// Options this chunker was built with.
    pub fn options(&self) -> ChunkingOptions {
        self.options
    }

    /// Measure `text` in the configured unit.
    pub fn measure(&self, text: &str) -> usize {
        self.counter.as_ref()(text)
    }

    /// Split raw text into chunks.
    ///
    /// Returns an empty vector when the input is empty or all whitespace.
    pub fn chunk_text(&self, text: &str) -> Vec<String> {
        if text.trim().is_empty() {
            return Vec::new();
        }

        let ChunkingOptions {
            chunk_size,
            chunk_overlap,
            ..
        } = self.options;

        if self.measure(text) <= chunk_size {
            return vec![text.to_string()];
        }

        let budget = chunk_size - chunk_overlap;
        let counter = self.counter.clone();
        let splitter =
            SemanticChunker::new(budget, Box::new(move |segment: &str| counter.as_ref()(segment)));
        let base_chunks = splitter.chunk(text);

        apply_overlap(text, base_chunks, chunk_overlap, chunk_size, &self.counter)
    }

    /// Read a UTF-8 file and split its contents.
    pub fn chunk_file(&self, path: &Path) -> Result<Vec<String>, ChunkingError> {
        let text = std::fs::read_to_string(path).map_err(|source| ChunkingError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(self.chunk_text(&text))
    }
}

fn character_counter() -> TokenCounter {
    Arc::new(|segment: &str| segment.chars().count())
}

fn tiktoken_counter() -> Result<TokenCounter, ChunkingError> {
    let encoding = Arc::new(cl100k_base().map_err(ChunkingError::Tokenizer)?);
    Ok(Arc::new(move |segment: &str| {
        encoding.encode_ordinary(segment).len()
    }))
}

/// Extend each chunk after the first with the tail of the text that precedes it.
///
/// Chunks are located in `source` in order. A chunk that cannot be located (the splitter
/// normalized its separators) is passed through without overlap.
fn apply_overlap(
    source: &str,
    chunks: Vec<String>,
    overlap: usize,
    chunk_size: usize,
    counter: &TokenCounter,
) -> Vec<String> {
    if overlap == 0 {
        return chunks;
    }

    let mut overlapped = Vec::with_capacity(chunks.len());
    let mut cursor = 0;
    let mut previous_start: Option<usize> = None;

    for chunk in chunks {
        let Some(start) = source[cursor..].find(chunk.as_str()).map(|offset| cursor + offset)
        else {
            overlapped.push(chunk);
            previous_start = None;
            continue;
        };
        let end = start + chunk.len();
        cursor = end;

        let Some(window_start) = previous_start.replace(start) else {
            overlapped.push(chunk);
            continue;
        };

        let tail = longest_suffix_within(&source[window_start..start], overlap, counter);
        let combined = &source[start - tail.len()..end];
        overlapped.push(longest_suffix_within(combined, chunk_size, counter).to_string());
    }

    overlapped
}

/// Return the longest suffix of `text` (leading whitespace trimmed) that measures at most
/// `limit` units.
///
/// Suffix length grows monotonically with the measured size, so the cut point is found by
/// binary search over character boundaries.
fn longest_suffix_within<'a>(text: &'a str, limit: usize, counter: &TokenCounter) -> &'a str {
    if limit == 0 || text.is_empty() {
        return "";
    }
    let fits = |from: usize| counter.as_ref()(text[from..].trim_start()) <= limit;
    if fits(0) {
        return text.trim_start();
    }

    let boundaries: Vec<usize> = text
        .char_indices()
        .map(|(idx, _)| idx)
        .chain(std::iter::once(text.len()))
        .collect();

    // boundaries.last() (the empty suffix) always fits; boundaries[0] does not.
    let (mut low, mut high) = (0, boundaries.len() - 1);
    while high - low > 1 {
        let mid = low + (high - low) / 2;
        if fits(boundaries[mid]) {
            high = mid;
        } else {
            low = mid;
        }
    }

    text[boundaries[high]..].trim_start()
}
