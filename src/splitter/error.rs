use thiserror::Error;

/// Rejected splitter configuration. Raised before any text is split.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("chunk_size must be > 0, got {0}")]
    ZeroChunkSize(usize),

    #[error("chunk overlap ({overlap}) must be smaller than chunk size ({size})")]
    OverlapTooLarge { overlap: usize, size: usize },

    #[error("invalid separator pattern {pattern:?}: {source}")]
    InvalidSeparator {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("failed to load tokenizer: {0}")]
    Tokenizer(String),
}
