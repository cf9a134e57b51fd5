use std::fmt;
use std::sync::Arc;

use super::length::{CharLength, LengthFunction};
use super::separator::{KeepSeparator, Separator};
use super::{ConfigError, TextSplitter};

/// Default maximum chunk size, in length-function units.
pub const DEFAULT_CHUNK_SIZE: usize = 4000;

/// Default overlap between consecutive chunks, in length-function units.
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;

/// Splitter settings. Validated when turned into a [`TextSplitter`].
#[derive(Clone)]
pub struct SplitterConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    /// Priority-ordered separators; an empty list means per-character splitting.
    pub separators: Vec<Separator>,
    pub keep_separator: KeepSeparator,
    pub strip_whitespace: bool,
    /// Populate `main_*` on every chunk.
    pub overlap_aware: bool,
    pub length_function: Arc<dyn LengthFunction>,
}

impl SplitterConfig {
    pub fn new() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            separators: vec![Separator::fallback()],
            keep_separator: KeepSeparator::default(),
            strip_whitespace: true,
            overlap_aware: false,
            length_function: Arc::new(CharLength),
        }
    }

    pub fn chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size;
        self
    }

    pub fn chunk_overlap(mut self, overlap: usize) -> Self {
        self.chunk_overlap = overlap;
        self
    }

    pub fn separators(mut self, separators: impl IntoIterator<Item = Separator>) -> Self {
        self.separators = separators.into_iter().collect();
        self
    }

    /// Use [`super::DEFAULT_SEPARATORS`].
    pub fn default_separators(self) -> Self {
        self.separators(Separator::defaults())
    }

    pub fn keep_separator(mut self, keep: KeepSeparator) -> Self {
        self.keep_separator = keep;
        self
    }

    pub fn strip_whitespace(mut self, strip: bool) -> Self {
        self.strip_whitespace = strip;
        self
    }

    pub fn overlap_aware(mut self, enabled: bool) -> Self {
        self.overlap_aware = enabled;
        self
    }

    pub fn length_function(mut self, length: impl LengthFunction + 'static) -> Self {
        self.length_function = Arc::new(length);
        self
    }

    pub fn build(self) -> Result<TextSplitter, ConfigError> {
        TextSplitter::new(self)
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_size == 0 {
            return Err(ConfigError::ZeroChunkSize(self.chunk_size));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(ConfigError::OverlapTooLarge {
                overlap: self.chunk_overlap,
                size: self.chunk_size,
            });
        }
        Ok(())
    }
}

impl Default for SplitterConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SplitterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SplitterConfig")
            .field("chunk_size", &self.chunk_size)
            .field("chunk_overlap", &self.chunk_overlap)
            .field("separators", &self.separators)
            .field("keep_separator", &self.keep_separator)
            .field("strip_whitespace", &self.strip_whitespace)
            .field("overlap_aware", &self.overlap_aware)
            .finish_non_exhaustive()
    }
}
