use std::ops::Range;

use serde::Serialize;
use tracing::debug;

use super::length::LengthFunction;
use super::separator::{split_span, CompiledSeparator, KeepSeparator};

/// A piece of the source produced by separator splitting, with its exact
/// character span in the top-level text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Fragment<'a> {
    pub text: &'a str,
    pub char_start: usize,
    pub char_end: usize,
    #[serde(skip)]
    pub(crate) bytes: Range<usize>,
}

/// Output unit of the cascade, in reading order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment<'a> {
    /// Consecutive under-budget pieces from one split level, mergeable together.
    Run(Vec<Fragment<'a>>),
    /// A piece that is not under budget and that no remaining separator can split.
    Indivisible(Fragment<'a>),
}

impl<'a> Segment<'a> {
    pub fn fragments(&self) -> &[Fragment<'a>] {
        match self {
            Segment::Run(fragments) => fragments,
            Segment::Indivisible(fragment) => std::slice::from_ref(fragment),
        }
    }
}

/// Byte to character offset translation for one source text.
pub(crate) struct CharOffsets {
    /// Byte offset of every char; empty for ASCII text where the two coincide.
    starts: Vec<usize>,
}

impl CharOffsets {
    pub(crate) fn new(text: &str) -> Self {
        let starts = if text.is_ascii() {
            Vec::new()
        } else {
            text.char_indices().map(|(at, _)| at).collect()
        };
        Self { starts }
    }

    /// Character offset of a byte offset that lies on a char boundary.
    pub(crate) fn char_at(&self, byte: usize) -> usize {
        if self.starts.is_empty() {
            return byte;
        }
        self.starts.partition_point(|&b| b < byte)
    }
}

/// Recursive descent over the separator priority list.
pub(crate) struct Cascade<'s> {
    pub(crate) separators: &'s [CompiledSeparator],
    pub(crate) keep: KeepSeparator,
    pub(crate) chunk_size: usize,
    pub(crate) length: &'s dyn LengthFunction,
}

impl Cascade<'_> {
    pub(crate) fn split<'a>(&self, text: &'a str, offsets: &CharOffsets) -> Vec<Segment<'a>> {
        let mut segments = Vec::new();
        if text.is_empty() {
            return segments;
        }

        self.descend(text, offsets, 0..text.len(), self.separators, &mut segments);

        debug!(
            segments = segments.len(),
            fragments = segments.iter().map(|s| s.fragments().len()).sum::<usize>(),
            "cascade split complete"
        );
        segments
    }

    /// Split `text[span]` with the first separator of `separators` present in it.
    /// `span` is absolute, so every fragment offset refers to the top-level text.
    fn descend<'a>(
        &self,
        text: &'a str,
        offsets: &CharOffsets,
        span: Range<usize>,
        separators: &[CompiledSeparator],
        out: &mut Vec<Segment<'a>>,
    ) {
        let base = span.start;
        let local = &text[span];
        let (active, tail) = select_separator(separators, local);

        let mut run = Vec::new();
        for piece in split_span(local, active, self.keep) {
            let bytes = base + piece.start..base + piece.end;
            let fragment = Fragment {
                text: &text[bytes.clone()],
                char_start: offsets.char_at(bytes.start),
                char_end: offsets.char_at(bytes.end),
                bytes,
            };

            if self.length.size(fragment.text) < self.chunk_size {
                run.push(fragment);
                continue;
            }

            if !run.is_empty() {
                out.push(Segment::Run(std::mem::take(&mut run)));
            }

            if tail.is_empty() {
                out.push(Segment::Indivisible(fragment));
            } else {
                let bytes = fragment.bytes.clone();
                self.descend(text, offsets, bytes, tail, out);
            }
        }

        if !run.is_empty() {
            out.push(Segment::Run(run));
        }
    }
}

/// First separator present in `span` and the tail left for recursion.
/// Falls back to the last separator with no tail when none is present.
fn select_separator<'c>(
    separators: &'c [CompiledSeparator],
    span: &str,
) -> (&'c CompiledSeparator, &'c [CompiledSeparator]) {
    for (i, separator) in separators.iter().enumerate() {
        if separator.is_fallback() {
            return (separator, &[]);
        }
        if separator.is_present(span) {
            return (separator, &separators[i + 1..]);
        }
    }

    let last = separators.len() - 1;
    (&separators[last], &[])
}
