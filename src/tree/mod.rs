//! Hierarchical summary tree over attributed chunks.
//!
//! Leaves are chunks; each level above groups a sliding window of nodes and
//! replaces it with a summary, until a single root remains.

mod store;


use std::collections::{BTreeMap, HashSet};
use std::ops::Range;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::document::{ChunkAttribution, ImagePayload, TablePayload};

pub use store::TreeManifest;

#[derive(Debug, Error)]
#[error("summarizer failed: {0}")]
pub struct SummarizeError(pub String);

#[derive(Debug, Error)]
pub enum TreeError {
    #[error("invalid window: group size {group_size} with overlap {overlap}")]
    InvalidWindow { group_size: usize, overlap: usize },

    #[error("cannot build a tree without leaves")]
    NoLeaves,

    #[error(transparent)]
    Summarize(#[from] SummarizeError),

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed tree file {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("root node {0} is missing from the node map")]
    MissingRoot(String),

    #[error("leaf checksum mismatch: manifest has {expected}, leaves hash to {actual}")]
    ChecksumMismatch { expected: String, actual: String },
}

/// Produces the summary text of a group of nodes.
pub trait Summarizer {
    fn summarize(&self, text: &str) -> Result<String, SummarizeError>;
}

impl<F> Summarizer for F
where
    F: Fn(&str) -> Result<String, SummarizeError>,
{
    fn summarize(&self, text: &str) -> Result<String, SummarizeError> {
        self(text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    #[default]
    Leaf,
    Summary,
}

/// Images, tables and pages a leaf was cut from.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MetaNode {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<ImagePayload>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tables: Vec<TablePayload>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub page_idx: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexNode {
    pub id: String,
    #[serde(default)]
    pub node_type: NodeType,
    pub text: String,
    /// Source record ids for leaves, child node ids for summaries.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<MetaNode>,
}

impl IndexNode {
    /// A leaf for one attributed chunk, with a fresh random id.
    pub fn leaf_from_attribution(attribution: &ChunkAttribution) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            node_type: NodeType::Leaf,
            text: attribution.chunk.text.clone(),
            children: attribution.record_ids.clone(),
            parent: None,
            meta: Some(MetaNode {
                images: attribution.images.clone(),
                tables: attribution.tables.clone(),
                page_idx: attribution.page_indices.iter().copied().collect(),
            }),
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.node_type == NodeType::Leaf
    }
}

/// Index ranges of `len` items grouped `group_size` at a time, each window
/// starting `group_size - overlap` after the previous one. The last windows
/// may be shorter.
pub fn sliding_windows(
    len: usize,
    group_size: usize,
    overlap: usize,
) -> Result<Vec<Range<usize>>, TreeError> {
    if group_size == 0 || overlap >= group_size {
        return Err(TreeError::InvalidWindow {
            group_size,
            overlap,
        });
    }

    let step = group_size - overlap;
    Ok((0..len)
        .step_by(step)
        .map(|start| start..(start + group_size).min(len))
        .collect())
}

/// Summarize every window of `nodes` into a new summary node and point the
/// children's `parent` at it. A node shared by two windows keeps the later parent.
pub fn build_level<S: Summarizer + ?Sized>(
    nodes: &mut [IndexNode],
    group_size: usize,
    overlap: usize,
    summarizer: &S,
) -> Result<Vec<IndexNode>, TreeError> {
    let windows = sliding_windows(nodes.len(), group_size, overlap)?;
    let mut level = Vec::with_capacity(windows.len());

    for window in windows {
        let group = &mut nodes[window];
        let combined = group
            .iter()
            .map(|node| node.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        let summary = summarizer.summarize(&combined)?;

        let id = Uuid::new_v4().to_string();
        for child in group.iter_mut() {
            child.parent = Some(id.clone());
        }
        level.push(IndexNode {
            id,
            node_type: NodeType::Summary,
            text: summary,
            children: group.iter().map(|node| node.id.clone()).collect(),
            parent: None,
            meta: None,
        });
    }

    Ok(level)
}

/// All nodes of a summary tree, keyed by id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryTree {
    pub root_id: String,
    pub nodes: BTreeMap<String, IndexNode>,
}

impl SummaryTree {
    pub fn root(&self) -> Option<&IndexNode> {
        self.nodes.get(&self.root_id)
    }

    pub fn get(&self, id: &str) -> Option<&IndexNode> {
        self.nodes.get(id)
    }

    /// Child nodes of a summary node. Leaves have none: their children are record ids.
    pub fn children(&self, id: &str) -> Vec<&IndexNode> {
        match self.get(id) {
            Some(node) if !node.is_leaf() => node
                .children
                .iter()
                .filter_map(|child| self.nodes.get(child))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Leaves in reading order, each once.
    pub fn leaves(&self) -> Vec<&IndexNode> {
        let mut leaves = Vec::new();
        let mut seen = HashSet::new();
        let mut stack: Vec<&str> = vec![self.root_id.as_str()];

        while let Some(id) = stack.pop() {
            if !seen.insert(id) {
                continue;
            }
            let Some(node) = self.nodes.get(id) else {
                continue;
            };
            if node.is_leaf() {
                leaves.push(node);
            } else {
                stack.extend(node.children.iter().rev().map(String::as_str));
            }
        }

        leaves
    }

    /// Number of levels from the root down to the leaves.
    pub fn depth(&self) -> usize {
        let mut depth = 1;
        let mut current = self.root();
        while let Some(node) = current.filter(|node| !node.is_leaf()) {
            current = node.children.first().and_then(|child| self.nodes.get(child));
            depth += 1;
        }
        depth
    }
}

/// Build summary levels over `leaves` until one node remains.
///
/// Every level must shrink, so windows have to advance by at least two nodes.
/// A single leaf is its own root.
pub fn build_tree<S: Summarizer + ?Sized>(
    leaves: Vec<IndexNode>,
    group_size: usize,
    overlap: usize,
    summarizer: &S,
) -> Result<SummaryTree, TreeError> {
    if leaves.is_empty() {
        return Err(TreeError::NoLeaves);
    }
    if group_size < overlap + 2 {
        return Err(TreeError::InvalidWindow {
            group_size,
            overlap,
        });
    }

    let mut nodes = BTreeMap::new();
    let mut level = leaves;
    let mut height = 0;

    while level.len() > 1 {
        let next = build_level(&mut level, group_size, overlap, summarizer)?;
        height += 1;
        debug!(level = height, nodes = next.len(), "built summary level");

        nodes.extend(level.into_iter().map(|node| (node.id.clone(), node)));
        level = next;
    }

    let root = level.remove(0);
    let root_id = root.id.clone();
    nodes.insert(root_id.clone(), root);

    info!(nodes = nodes.len(), levels = height, "summary tree built");
    Ok(SummaryTree { root_id, nodes })
}
