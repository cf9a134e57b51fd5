use std::ops::Range;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Paragraph, line, sentence punctuation (CJK and Latin), zero-width space,
/// space, then per-character fallback.
pub const DEFAULT_SEPARATORS: &[&str] = &[
    "\n\n", "\n", "。", "？", "！", "；", "．", ".", "?", "!", ";", "\u{200b}", " ", "",
];

/// Where a separator's own text goes after a split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeepSeparator {
    /// Discard the separator text.
    None,
    /// Prefix each piece with the separator that precedes it.
    #[default]
    Start,
    /// Suffix each piece with the separator that follows it.
    End,
}

/// One entry of the separator priority list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Separator {
    pub pattern: String,
    #[serde(default)]
    pub is_regex: bool,
}

impl Separator {
    pub fn literal(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            is_regex: false,
        }
    }

    pub fn regex(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            is_regex: true,
        }
    }

    /// The empty separator: splits into single characters and always makes progress.
    pub fn fallback() -> Self {
        Self::literal("")
    }

    /// `DEFAULT_SEPARATORS` as literal entries.
    pub fn defaults() -> Vec<Self> {
        DEFAULT_SEPARATORS.iter().map(|s| Self::literal(*s)).collect()
    }
}

#[derive(Debug, Clone)]
enum Matcher {
    Chars,
    Literal(String),
    Pattern(Regex),
}

/// A separator validated and compiled once at construction.
#[derive(Debug, Clone)]
pub(crate) struct CompiledSeparator {
    matcher: Matcher,
}

impl CompiledSeparator {
    pub(crate) fn compile(separator: &Separator) -> Result<Self, ConfigError> {
        let matcher = if separator.pattern.is_empty() {
            Matcher::Chars
        } else if separator.is_regex {
            let regex =
                Regex::new(&separator.pattern).map_err(|source| ConfigError::InvalidSeparator {
                    pattern: separator.pattern.clone(),
                    source,
                })?;
            Matcher::Pattern(regex)
        } else {
            Matcher::Literal(separator.pattern.clone())
        };

        Ok(Self { matcher })
    }

    #[cfg(test)]
    pub(crate) fn new(separator: Separator) -> Self {
        Self::compile(&separator).unwrap()
    }

    /// Whether this is the terminal per-character separator.
    pub(crate) fn is_fallback(&self) -> bool {
        matches!(self.matcher, Matcher::Chars)
    }

    pub(crate) fn is_present(&self, span: &str) -> bool {
        match &self.matcher {
            Matcher::Chars => true,
            Matcher::Literal(lit) => span.contains(lit.as_str()),
            Matcher::Pattern(regex) => regex.is_match(span),
        }
    }

    fn find_all(&self, span: &str) -> Vec<Range<usize>> {
        match &self.matcher {
            Matcher::Chars => Vec::new(),
            Matcher::Literal(lit) => span
                .match_indices(lit.as_str())
                .map(|(at, m)| at..at + m.len())
                .collect(),
            Matcher::Pattern(regex) => regex.find_iter(span).map(|m| m.range()).collect(),
        }
    }
}

/// Split `span` at every non-overlapping match of `separator`.
///
/// Returns byte ranges relative to `span`, in order, with empty pieces removed.
/// Under `Start`/`End` the pieces tile the span exactly; under `None` the
/// gaps between pieces are the matched separator text.
pub(crate) fn split_span(
    span: &str,
    separator: &CompiledSeparator,
    keep: KeepSeparator,
) -> Vec<Range<usize>> {
    if separator.is_fallback() {
        return span
            .char_indices()
            .map(|(at, c)| at..at + c.len_utf8())
            .collect();
    }

    let matches = separator.find_all(span);
    let mut pieces = Vec::with_capacity(matches.len() + 1);
    let mut cursor = 0;

    for m in matches {
        match keep {
            KeepSeparator::None => {
                pieces.push(cursor..m.start);
                cursor = m.end;
            }
            KeepSeparator::Start => {
                pieces.push(cursor..m.start);
                cursor = m.start;
            }
            KeepSeparator::End => {
                pieces.push(cursor..m.end);
                cursor = m.end;
            }
        }
    }
    pieces.push(cursor..span.len());

    pieces.retain(|r| !r.is_empty());
    pieces
}
