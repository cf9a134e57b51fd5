use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::cascade::{Fragment, Segment};
use super::length::LengthFunction;

/// A final, size-bounded output unit.
///
/// `start`/`end` are character offsets into the original text, whatever
/// length function sized the chunk. With whitespace stripping enabled
/// `text` is the trimmed content of `start..end`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    pub start: usize,
    pub end: usize,
    /// Content not shared with the preceding chunk (overlap-aware output only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main_start: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main_end: Option<usize>,
    /// `text` measured by the splitter's length function.
    #[serde(default)]
    pub size: usize,
    /// Set when the chunk exceeds the budget and could not be split further.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub oversized: bool,
}

struct Entry<'f, 'a> {
    fragment: &'f Fragment<'a>,
    size: usize,
    /// Size of the source text between this fragment and the previous one in the run.
    junction: usize,
}

/// Greedy sliding accumulation of cascade output into chunks.
pub(crate) struct OverlapMerger<'s> {
    pub(crate) chunk_size: usize,
    pub(crate) chunk_overlap: usize,
    pub(crate) strip_whitespace: bool,
    pub(crate) overlap_aware: bool,
    pub(crate) length: &'s dyn LengthFunction,
}

impl OverlapMerger<'_> {
    pub(crate) fn merge(&self, source: &str, segments: &[Segment<'_>]) -> Vec<Chunk> {
        let mut chunks = Vec::new();
        for segment in segments {
            match segment {
                Segment::Run(fragments) => self.merge_run(source, fragments, &mut chunks),
                Segment::Indivisible(fragment) => self.emit_indivisible(fragment, &mut chunks),
            }
        }
        chunks
    }

    fn merge_run(&self, source: &str, run: &[Fragment<'_>], out: &mut Vec<Chunk>) {
        let mut window: VecDeque<Entry> = VecDeque::new();
        let mut total = 0usize;
        let mut opens_run = true;

        for (i, fragment) in run.iter().enumerate() {
            let size = self.length.size(fragment.text);
            let junction = match i {
                0 => 0,
                _ => self
                    .length
                    .size(&source[run[i - 1].bytes.end..fragment.bytes.start]),
            };
            let joined = |window_empty: bool, total: usize| {
                total + size + if window_empty { 0 } else { junction }
            };

            if joined(window.is_empty(), total) > self.chunk_size && !window.is_empty() {
                if self.close(source, &window, total, opens_run, out) {
                    opens_run = false;
                }

                // Keep popping while the window is larger than the overlap, or
                // while it still cannot take the incoming piece.
                while !window.is_empty()
                    && (total > self.chunk_overlap
                        || (joined(window.is_empty(), total) > self.chunk_size && total > 0))
                {
                    if let Some(head) = window.pop_front() {
                        let next_junction = window.front().map_or(0, |next| next.junction);
                        total -= head.size + next_junction;
                    }
                }
            }

            let counted = if window.is_empty() { 0 } else { junction };
            window.push_back(Entry {
                fragment,
                size,
                junction,
            });
            total += size + counted;
        }

        if !window.is_empty() {
            self.close(source, &window, total, opens_run, out);
        }
    }

    /// Emit a chunk from `window`. Returns false when nothing was emitted.
    fn close(
        &self,
        source: &str,
        window: &VecDeque<Entry>,
        total: usize,
        opens_run: bool,
        out: &mut Vec<Chunk>,
    ) -> bool {
        let (Some(first), Some(last)) = (window.front(), window.back()) else {
            return false;
        };
        let (first, last) = (first.fragment, last.fragment);

        let raw = &source[first.bytes.start..last.bytes.end];
        let text = self.strip(raw);
        if text.is_empty() {
            return false;
        }

        let size = self.length.size(text);
        if total > self.chunk_size {
            warn!(
                size = total,
                chunk_size = self.chunk_size,
                start = first.char_start,
                "created a chunk longer than the specified chunk size"
            );
        }

        let mut chunk = Chunk {
            text: text.to_string(),
            start: first.char_start,
            end: last.char_end,
            main_text: None,
            main_start: None,
            main_end: None,
            size,
            oversized: total > self.chunk_size || size > self.chunk_size,
        };

        if self.overlap_aware {
            if opens_run {
                chunk.main_text = Some(chunk.text.clone());
                chunk.main_start = Some(chunk.start);
            } else if let Some(entry) = window.get(self.chunk_overlap) {
                let main = &source[entry.fragment.bytes.start..last.bytes.end];
                chunk.main_text = Some(self.strip(main).to_string());
                chunk.main_start = Some(entry.fragment.char_start);
            } else {
                // every piece is carried over from the previous chunk
                chunk.main_text = Some(String::new());
                chunk.main_start = Some(chunk.end);
            }
            chunk.main_end = Some(chunk.end);
        }

        out.push(chunk);
        true
    }

    fn emit_indivisible(&self, fragment: &Fragment<'_>, out: &mut Vec<Chunk>) {
        let text = self.strip(fragment.text);
        if text.is_empty() {
            return;
        }

        let size = self.length.size(text);
        let oversized = size > self.chunk_size;
        if oversized {
            warn!(
                size,
                chunk_size = self.chunk_size,
                start = fragment.char_start,
                end = fragment.char_end,
                "piece exceeds chunk size after exhausting all separators; emitting as-is"
            );
        }

        let overlap_aware = self.overlap_aware;
        out.push(Chunk {
            text: text.to_string(),
            start: fragment.char_start,
            end: fragment.char_end,
            main_text: overlap_aware.then(|| text.to_string()),
            main_start: overlap_aware.then_some(fragment.char_start),
            main_end: overlap_aware.then_some(fragment.char_end),
            size,
            oversized,
        });
    }

    fn strip<'t>(&self, text: &'t str) -> &'t str {
        if self.strip_whitespace {
            text.trim()
        } else {
            text
        }
    }
}
