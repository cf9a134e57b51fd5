use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{ContentNode, Document, RecordKind, SourceRecord};
use crate::splitter::{Chunk, TextSplitter};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImagePayload {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mineru_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub footnote: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub img_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_idx: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TablePayload {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mineru_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub footnote: Option<String>,
    /// Table body as produced by the parser (usually HTML or markdown).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_idx: Option<u32>,
}

/// A chunk together with every source record its span touches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkAttribution {
    pub chunk: Chunk,
    pub record_ids: Vec<String>,
    pub images: Vec<ImagePayload>,
    pub tables: Vec<TablePayload>,
    pub page_indices: BTreeSet<u32>,
}

impl ChunkAttribution {
    fn new(chunk: Chunk) -> Self {
        Self {
            chunk,
            record_ids: Vec::new(),
            images: Vec::new(),
            tables: Vec::new(),
            page_indices: BTreeSet::new(),
        }
    }

    fn add(&mut self, record: &SourceRecord) {
        self.record_ids.push(record.id.clone());
        if let Some(page) = record.page_idx {
            self.page_indices.insert(page);
        }

        let node: &ContentNode = &record.node;
        match record.kind {
            RecordKind::Text => {}
            RecordKind::Image => self.images.push(ImagePayload {
                id: record.id.clone(),
                mineru_id: node.mineru_id,
                caption: node.caption.clone(),
                footnote: node.footnote.clone(),
                img_path: node.img_path.clone(),
                page_idx: record.page_idx,
            }),
            RecordKind::Table => self.tables.push(TablePayload {
                id: record.id.clone(),
                mineru_id: node.mineru_id,
                caption: node.caption.clone(),
                footnote: node.footnote.clone(),
                table: node.table.clone(),
                page_idx: record.page_idx,
            }),
        }
    }
}

/// Collect the records whose span intersects the chunk's span.
///
/// `records` must be sorted by `char_start` and non-overlapping. Spans are
/// half-open, so a record that only touches the chunk boundary is excluded.
pub fn attribute(chunk: Chunk, records: &[SourceRecord]) -> ChunkAttribution {
    let mut attribution = ChunkAttribution::new(chunk);
    let (start, end) = (attribution.chunk.start, attribution.chunk.end);

    for record in records {
        if record.char_start >= end {
            break;
        }
        if record.char_end > start {
            attribution.add(record);
        }
    }

    attribution
}

impl TextSplitter {
    /// Render `nodes` into one document, split it and attribute every chunk.
    pub fn split_structured(&self, nodes: &[ContentNode]) -> Vec<ChunkAttribution> {
        self.split_document(&Document::from_nodes(nodes))
    }

    /// Split an already laid-out document and attribute every chunk.
    pub fn split_document(&self, document: &Document) -> Vec<ChunkAttribution> {
        let attributions: Vec<ChunkAttribution> = self
            .split_with_offsets(&document.text)
            .into_iter()
            .map(|chunk| attribute(chunk, &document.records))
            .collect();

        debug!(
            records = document.records.len(),
            chunks = attributions.len(),
            "attributed chunks to source records"
        );
        attributions
    }
}
