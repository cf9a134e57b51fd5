//! Recursive, offset-exact text splitting.
//!
//! Text goes through two stages: the separator cascade cuts it into
//! under-budget fragments with exact character spans, then the overlap
//! merger packs consecutive fragments into chunks.

mod cascade;
mod config;
mod error;
mod length;
mod merger;
mod separator;

#[cfg(test)]
mod tests;

use std::fmt;
use std::sync::Arc;

use tracing::debug;

pub use cascade::{Fragment, Segment};
pub use config::{SplitterConfig, DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};
pub use error::ConfigError;
pub use length::{CharLength, LengthFunction, TokenLength};
pub use merger::Chunk;
pub use separator::{KeepSeparator, Separator, DEFAULT_SEPARATORS};

use cascade::{Cascade, CharOffsets};
use merger::OverlapMerger;
use separator::CompiledSeparator;

/// A validated, immutable splitter. Cheap to share across threads.
#[derive(Clone)]
pub struct TextSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<CompiledSeparator>,
    keep_separator: KeepSeparator,
    strip_whitespace: bool,
    overlap_aware: bool,
    length: Arc<dyn LengthFunction>,
}

impl TextSplitter {
    /// Validate `config` and compile its separators.
    pub fn new(config: SplitterConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let mut separators = config
            .separators
            .iter()
            .map(CompiledSeparator::compile)
            .collect::<Result<Vec<_>, _>>()?;
        if separators.is_empty() {
            separators.push(CompiledSeparator::compile(&Separator::fallback())?);
        }

        Ok(Self {
            chunk_size: config.chunk_size,
            chunk_overlap: config.chunk_overlap,
            separators,
            keep_separator: config.keep_separator,
            strip_whitespace: config.strip_whitespace,
            overlap_aware: config.overlap_aware,
            length: config.length_function,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Measure `text` with this splitter's length function.
    pub fn size(&self, text: &str) -> usize {
        self.length.size(text)
    }

    /// Split `text` into chunk texts.
    pub fn split(&self, text: &str) -> Vec<String> {
        self.split_with_offsets(text)
            .into_iter()
            .map(|chunk| chunk.text)
            .collect()
    }

    /// Split `text` into chunks carrying character offsets into `text`.
    pub fn split_with_offsets(&self, text: &str) -> Vec<Chunk> {
        let offsets = CharOffsets::new(text);
        let segments = self.fragments_with(text, &offsets);

        let merger = OverlapMerger {
            chunk_size: self.chunk_size,
            chunk_overlap: self.chunk_overlap,
            strip_whitespace: self.strip_whitespace,
            overlap_aware: self.overlap_aware,
            length: self.length.as_ref(),
        };
        let chunks = merger.merge(text, &segments);

        debug!(
            chunks = chunks.len(),
            oversized = chunks.iter().filter(|c| c.oversized).count(),
            "split complete"
        );
        chunks
    }

    /// Run only the separator cascade, exposing the fragments before merging.
    pub fn fragments<'a>(&self, text: &'a str) -> Vec<Segment<'a>> {
        self.fragments_with(text, &CharOffsets::new(text))
    }

    fn fragments_with<'a>(&self, text: &'a str, offsets: &CharOffsets) -> Vec<Segment<'a>> {
        let cascade = Cascade {
            separators: &self.separators,
            keep: self.keep_separator,
            chunk_size: self.chunk_size,
            length: self.length.as_ref(),
        };
        cascade.split(text, offsets)
    }
}

impl fmt::Debug for TextSplitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextSplitter")
            .field("chunk_size", &self.chunk_size)
            .field("chunk_overlap", &self.chunk_overlap)
            .field("separators", &self.separators.len())
            .field("keep_separator", &self.keep_separator)
            .field("strip_whitespace", &self.strip_whitespace)
            .field("overlap_aware", &self.overlap_aware)
            .finish_non_exhaustive()
    }
}
