use std::fmt;
use std::sync::Arc;

use tiktoken_rs::{cl100k_base, CoreBPE};

use super::ConfigError;

/// Size measure used to decide when a fragment or chunk exceeds budget.
///
/// Implementations must be deterministic and pure: the same text always
/// yields the same size. The splitter never assumes the size equals the
/// character count.
pub trait LengthFunction: Send + Sync {
    fn size(&self, text: &str) -> usize;
}

impl<F> LengthFunction for F
where
    F: Fn(&str) -> usize + Send + Sync,
{
    fn size(&self, text: &str) -> usize {
        self(text)
    }
}

/// Counts Unicode scalar values. This is the default measure.
#[derive(Debug, Clone, Copy, Default)]
pub struct CharLength;

impl LengthFunction for CharLength {
    fn size(&self, text: &str) -> usize {
        text.chars().count()
    }
}

/// Counts cl100k_base BPE tokens.
#[derive(Clone)]
pub struct TokenLength {
    bpe: Arc<CoreBPE>,
}

impl TokenLength {
    pub fn cl100k() -> Result<Self, ConfigError> {
        let bpe = cl100k_base().map_err(|e| ConfigError::Tokenizer(e.to_string()))?;
        Ok(Self { bpe: Arc::new(bpe) })
    }
}

impl LengthFunction for TokenLength {
    fn size(&self, text: &str) -> usize {
        if text.is_empty() {
            return 0;
        }
        self.bpe.encode_with_special_tokens(text).len()
    }
}

impl fmt::Debug for TokenLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TokenLength(cl100k_base)")
    }
}
