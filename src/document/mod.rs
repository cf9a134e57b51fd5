//! Structured documents: parsed text/image/table entries laid out as one
//! contiguous text, so chunks can be traced back to the entries they cover.

mod attribution;
mod loader;


use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use attribution::{attribute, ChunkAttribution, ImagePayload, TablePayload};
pub use loader::{ContentListEntry, Lines, NodeLoader};

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed JSON in {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Text,
    Image,
    Table,
}

/// One entry of a parsed document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentNode {
    pub id: u64,
    /// Id of the parser entry this node came from; split text entries share it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mineru_id: Option<u64>,
    #[serde(rename = "type")]
    pub kind: RecordKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub footnote: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub img_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_idx: Option<u32>,
    #[serde(default)]
    pub token_count: usize,
}

impl ContentNode {
    fn new(id: u64, kind: RecordKind) -> Self {
        Self {
            id,
            mineru_id: None,
            kind,
            text: None,
            caption: None,
            footnote: None,
            table: None,
            img_path: None,
            page_idx: None,
            token_count: 0,
        }
    }

    pub fn text(id: u64, text: impl Into<String>) -> Self {
        let mut node = Self::new(id, RecordKind::Text);
        node.text = Some(text.into());
        node
    }

    pub fn image(id: u64) -> Self {
        Self::new(id, RecordKind::Image)
    }

    pub fn table(id: u64) -> Self {
        Self::new(id, RecordKind::Table)
    }

    pub fn with_mineru_id(mut self, mineru_id: u64) -> Self {
        self.mineru_id = Some(mineru_id);
        self
    }

    pub fn with_caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = Some(caption.into());
        self
    }

    pub fn with_footnote(mut self, footnote: impl Into<String>) -> Self {
        self.footnote = Some(footnote.into());
        self
    }

    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    pub fn with_img_path(mut self, path: impl Into<String>) -> Self {
        self.img_path = Some(path.into());
        self
    }

    pub fn with_page(mut self, page_idx: u32) -> Self {
        self.page_idx = Some(page_idx);
        self
    }

    /// The text this node contributes to the document.
    ///
    /// Images render as `caption\nfootnote`, tables as
    /// `caption\nfootnote\ntable`, skipping absent or empty parts.
    pub fn render(&self) -> String {
        let parts = match self.kind {
            RecordKind::Text => return self.text.clone().unwrap_or_default(),
            RecordKind::Image => vec![&self.caption, &self.footnote],
            RecordKind::Table => vec![&self.caption, &self.footnote, &self.table],
        };
        parts
            .into_iter()
            .filter_map(|part| part.as_deref())
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// A node placed in the document text at `char_start..char_end`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceRecord {
    pub id: String,
    pub char_start: usize,
    pub char_end: usize,
    pub kind: RecordKind,
    pub page_idx: Option<u32>,
    pub node: ContentNode,
}

/// Node renderings concatenated in order, with one record per rendered node.
#[derive(Debug, Clone, Default)]
pub struct Document {
    pub text: String,
    /// Sorted by `char_start` and contiguous: each record starts where the
    /// previous one ends.
    pub records: Vec<SourceRecord>,
}

impl Document {
    /// Lay out `nodes` back to back. Nodes that render to blank text are left out.
    pub fn from_nodes(nodes: &[ContentNode]) -> Self {
        let mut document = Self::default();
        let mut cursor = 0;

        for node in nodes {
            let rendered = node.render();
            if rendered.trim().is_empty() {
                continue;
            }

            let end = cursor + rendered.chars().count();
            document.text.push_str(&rendered);
            document.records.push(SourceRecord {
                id: node.id.to_string(),
                char_start: cursor,
                char_end: end,
                kind: node.kind,
                page_idx: node.page_idx,
                node: node.clone(),
            });
            cursor = end;
        }

        document
    }

    /// Length of `text` in characters.
    pub fn char_len(&self) -> usize {
        self.records.last().map_or(0, |record| record.char_end)
    }
}
