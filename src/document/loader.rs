use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::{debug, info};

use super::{ContentNode, LoadError, RecordKind};
use crate::splitter::TextSplitter;

/// Caption and footnote fields arrive either as a list of lines or as one string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Lines {
    One(String),
    Many(Vec<String>),
}

impl Lines {
    fn joined(&self) -> Option<String> {
        match self {
            Lines::One(line) => Some(line.clone()),
            Lines::Many(lines) if lines.is_empty() => None,
            Lines::Many(lines) => Some(lines.join("\n")),
        }
    }
}

/// One raw entry of a MinerU `*_content_list.json` file.
#[derive(Debug, Clone, Deserialize)]
pub struct ContentListEntry {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub image_caption: Option<Lines>,
    #[serde(default)]
    pub image_footnote: Option<Lines>,
    #[serde(default)]
    pub table_caption: Option<Lines>,
    #[serde(default)]
    pub table_footnote: Option<Lines>,
    #[serde(default)]
    pub table_body: Option<String>,
    #[serde(default)]
    pub img_path: Option<String>,
    #[serde(default)]
    pub page_idx: Option<u32>,
}

fn joined(lines: &Option<Lines>) -> Option<String> {
    lines.as_ref().and_then(Lines::joined)
}

/// Turns parser output into [`ContentNode`]s sized for the given splitter.
#[derive(Debug, Clone)]
pub struct NodeLoader {
    splitter: TextSplitter,
}

impl NodeLoader {
    pub fn new(splitter: TextSplitter) -> Self {
        Self { splitter }
    }

    pub fn splitter(&self) -> &TextSplitter {
        &self.splitter
    }

    /// Convert raw entries into nodes with incremental ids.
    ///
    /// Text entries larger than the splitter's chunk size become several
    /// text nodes sharing the entry's `mineru_id`. Unknown entry types are skipped.
    pub fn from_content_list(&self, entries: &[ContentListEntry]) -> Vec<ContentNode> {
        let mut nodes = Vec::with_capacity(entries.len());
        let mut next_id = 0u64;
        let mut push = |mut node: ContentNode, nodes: &mut Vec<ContentNode>| {
            node.id = next_id;
            node.token_count = self.splitter.size(&node.render());
            nodes.push(node);
            next_id += 1;
        };

        for entry in entries {
            let kind = match entry.kind.as_str() {
                "text" => RecordKind::Text,
                "image" => RecordKind::Image,
                "table" => RecordKind::Table,
                other => {
                    debug!(kind = other, id = ?entry.id, "skipping content entry");
                    continue;
                }
            };

            let mut node = ContentNode::new(0, kind);
            node.mineru_id = entry.id;
            node.page_idx = entry.page_idx;

            match kind {
                RecordKind::Text => {
                    let text = entry.text.clone().unwrap_or_default();
                    if self.splitter.size(&text) > self.splitter.chunk_size() {
                        for piece in self.splitter.split(&text) {
                            let mut part = node.clone();
                            part.text = Some(piece);
                            push(part, &mut nodes);
                        }
                        continue;
                    }
                    node.text = entry.text.clone();
                }
                RecordKind::Image => {
                    node.caption = joined(&entry.image_caption);
                    node.footnote = joined(&entry.image_footnote);
                    node.img_path = entry.img_path.clone();
                }
                RecordKind::Table => {
                    node.caption = joined(&entry.table_caption);
                    node.footnote = joined(&entry.table_footnote);
                    node.table = entry.table_body.clone();
                    node.img_path = entry.img_path.clone();
                }
            }
            push(node, &mut nodes);
        }

        nodes
    }

    /// Merge runs of consecutive text nodes that came from the same parser entry.
    ///
    /// Merged texts are joined with `\n` and every node's id becomes its
    /// `mineru_id` when one is known. Nodes without a `mineru_id` cannot be
    /// traced to an entry and pass through unmerged.
    pub fn merge_text_nodes(&self, nodes: Vec<ContentNode>) -> Vec<ContentNode> {
        let mut merged: Vec<ContentNode> = Vec::with_capacity(nodes.len());
        let mut group: Vec<ContentNode> = Vec::new();

        for mut node in nodes {
            if node.kind == RecordKind::Text && node.mineru_id.is_some() {
                if group
                    .first()
                    .is_some_and(|head| head.mineru_id != node.mineru_id)
                {
                    merged.extend(self.flush_group(&mut group));
                }
                group.push(node);
            } else {
                merged.extend(self.flush_group(&mut group));
                node.id = node.mineru_id.unwrap_or(node.id);
                merged.push(node);
            }
        }
        merged.extend(self.flush_group(&mut group));

        merged
    }

    fn flush_group(&self, group: &mut Vec<ContentNode>) -> Option<ContentNode> {
        let mut drained = group.drain(..);
        let mut head = drained.next()?;

        let mut texts: Vec<String> = head.text.take().into_iter().collect();
        texts.extend(drained.filter_map(|node| node.text));
        texts.retain(|text| !text.is_empty());

        let text = texts.join("\n");
        head.id = head.mineru_id.unwrap_or(head.id);
        head.token_count = self.splitter.size(&text);
        head.text = Some(text);
        Some(head)
    }

    /// Fill in `token_count` for nodes that have none.
    pub fn compute_tokens(&self, nodes: &mut [ContentNode]) {
        for node in nodes.iter_mut().filter(|node| node.token_count == 0) {
            node.token_count = self.splitter.size(&node.render());
        }
    }

    /// Read a MinerU content list and convert it with [`Self::from_content_list`].
    pub fn load_content_list(&self, path: impl AsRef<Path>) -> Result<Vec<ContentNode>, LoadError> {
        let path = path.as_ref();
        let entries: Vec<ContentListEntry> = read_json(path)?;
        let nodes = self.from_content_list(&entries);
        info!(
            path = %path.display(),
            entries = entries.len(),
            nodes = nodes.len(),
            "loaded content list"
        );
        Ok(nodes)
    }

    /// Read nodes previously written by [`Self::save_nodes`].
    pub fn load_nodes(path: impl AsRef<Path>) -> Result<Vec<ContentNode>, LoadError> {
        read_json(path.as_ref())
    }

    pub fn save_nodes(path: impl AsRef<Path>, nodes: &[ContentNode]) -> Result<(), LoadError> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(nodes).map_err(|source| LoadError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, json).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), nodes = nodes.len(), "saved nodes");
        Ok(())
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, LoadError> {
    let raw = fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| LoadError::Json {
        path: path.to_path_buf(),
        source,
    })
}
