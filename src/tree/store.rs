use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::info;

use super::{IndexNode, SummaryTree, TreeError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeManifest {
    pub version: String,
    pub created_at: String,
    pub generator: String,
    pub node_count: usize,
    pub leaf_count: usize,
    /// SHA-256 of the leaf texts in reading order.
    pub source_sha256: String,
}

#[derive(Serialize, Deserialize)]
struct TreeFile {
    manifest: TreeManifest,
    root_id: String,
    nodes: BTreeMap<String, IndexNode>,
}

impl SummaryTree {
    /// Hex SHA-256 over the concatenated leaf texts.
    pub fn source_sha256(&self) -> String {
        let mut hasher = Sha256::new();
        for leaf in self.leaves() {
            hasher.update(leaf.text.as_bytes());
        }
        hex::encode(hasher.finalize())
    }

    pub fn manifest(&self) -> TreeManifest {
        TreeManifest {
            version: "1.0.0".to_string(),
            created_at: Utc::now().to_rfc3339(),
            generator: format!("docsplit v{}", env!("CARGO_PKG_VERSION")),
            node_count: self.nodes.len(),
            leaf_count: self.leaves().len(),
            source_sha256: self.source_sha256(),
        }
    }

    /// Write the tree and a fresh manifest as pretty JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<TreeManifest, TreeError> {
        let path = path.as_ref();
        let file = TreeFile {
            manifest: self.manifest(),
            root_id: self.root_id.clone(),
            nodes: self.nodes.clone(),
        };

        let json = serde_json::to_string_pretty(&file).map_err(|source| TreeError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, json).map_err(|source| TreeError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        info!(path = %path.display(), nodes = file.nodes.len(), "saved summary tree");
        Ok(file.manifest)
    }

    /// Read a tree written by [`SummaryTree::save`], checking the root and leaf checksum.
    pub fn load(path: impl AsRef<Path>) -> Result<(Self, TreeManifest), TreeError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| TreeError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let file: TreeFile = serde_json::from_str(&raw).map_err(|source| TreeError::Json {
            path: path.to_path_buf(),
            source,
        })?;

        if !file.nodes.contains_key(&file.root_id) {
            return Err(TreeError::MissingRoot(file.root_id));
        }

        let tree = SummaryTree {
            root_id: file.root_id,
            nodes: file.nodes,
        };
        let actual = tree.source_sha256();
        if actual != file.manifest.source_sha256 {
            return Err(TreeError::ChecksumMismatch {
                expected: file.manifest.source_sha256,
                actual,
            });
        }

        Ok((tree, file.manifest))
    }
}
