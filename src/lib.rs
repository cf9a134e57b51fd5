// Public API exports
pub mod document;
pub mod splitter;
pub mod tree;

// Re-export main types for convenience
pub use splitter::{
    CharLength, Chunk, ConfigError, Fragment, KeepSeparator, LengthFunction, Segment, Separator,
    SplitterConfig, TextSplitter, TokenLength, DEFAULT_SEPARATORS,
};

pub use document::{
    attribute, ChunkAttribution, ContentNode, Document, LoadError, NodeLoader, RecordKind,
    SourceRecord,
};

pub use tree::{
    build_tree, IndexNode, MetaNode, NodeType, SummarizeError, Summarizer, SummaryTree, TreeError,
};
