//! docsplit CLI - split text and parsed documents into overlapping chunks.
//!
//! # Usage
//!
//! ```bash
//! # Chunk a plain text file
//! docsplit chunk notes.txt --chunk-size 512 --chunk-overlap 64 --default-separators
//!
//! # Token-sized chunks with overlap-aware output
//! docsplit chunk notes.txt --tokens --overlap-aware
//!
//! # Index a MinerU content list, or every content list under a directory
//! docsplit index paper_content_list.json -o paper.index.json
//! docsplit index parsed/ -o indexes/
//! ```

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use docsplit::{
    IndexNode, KeepSeparator, NodeLoader, Separator, SplitterConfig, TextSplitter, TokenLength,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

#[derive(Parser)]
#[command(name = "docsplit", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Split a UTF-8 text file and print the chunks as JSON
    Chunk {
        file: PathBuf,

        #[command(flatten)]
        splitter: SplitterArgs,
    },

    /// Build leaf index nodes from MinerU content lists
    Index {
        /// A content list file, or a directory searched recursively
        path: PathBuf,

        /// Output file, or output directory when PATH is a directory
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Keep split text entries as separate nodes
        #[arg(long)]
        no_merge: bool,

        #[command(flatten)]
        splitter: SplitterArgs,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum KeepArg {
    None,
    Start,
    End,
}

impl From<KeepArg> for KeepSeparator {
    fn from(arg: KeepArg) -> Self {
        match arg {
            KeepArg::None => KeepSeparator::None,
            KeepArg::Start => KeepSeparator::Start,
            KeepArg::End => KeepSeparator::End,
        }
    }
}

#[derive(Args)]
struct SplitterArgs {
    /// Maximum chunk size, in characters or tokens
    #[arg(long, default_value_t = docsplit::splitter::DEFAULT_CHUNK_SIZE)]
    chunk_size: usize,

    /// Overlap between consecutive chunks
    #[arg(long, default_value_t = docsplit::splitter::DEFAULT_CHUNK_OVERLAP)]
    chunk_overlap: usize,

    /// Separator, highest priority first (repeatable). Literal separators
    /// understand `\n`, `\t` and `\\`; regex separators are passed as is
    #[arg(long = "separator", value_name = "SEP")]
    separators: Vec<String>,

    /// Treat separators as regular expressions
    #[arg(long)]
    regex: bool,

    /// Use the built-in paragraph/line/sentence/space separators
    #[arg(long, conflicts_with = "separators")]
    default_separators: bool,

    #[arg(long, value_enum, default_value = "start")]
    keep_separator: KeepArg,

    /// Keep leading and trailing whitespace in chunk text
    #[arg(long)]
    no_strip: bool,

    /// Measure size in cl100k tokens instead of characters
    #[arg(long)]
    tokens: bool,

    /// Report the non-overlapping part of every chunk
    #[arg(long)]
    overlap_aware: bool,
}

impl SplitterArgs {
    fn build(&self) -> Result<TextSplitter> {
        let mut config = SplitterConfig::new()
            .chunk_size(self.chunk_size)
            .chunk_overlap(self.chunk_overlap)
            .keep_separator(self.keep_separator.into())
            .strip_whitespace(!self.no_strip)
            .overlap_aware(self.overlap_aware);

        if self.default_separators {
            config = config.default_separators();
        } else if !self.separators.is_empty() {
            let regex = self.regex;
            config = config.separators(self.separators.iter().map(|sep| {
                if regex {
                    Separator::regex(sep.as_str())
                } else {
                    Separator::literal(unescape(sep))
                }
            }));
        }

        if self.tokens {
            config = config.length_function(TokenLength::cl100k()?);
        }

        Ok(config.build()?)
    }
}

/// Resolve `\n`, `\t` and `\\` in a literal separator. Other backslashes are kept.
fn unescape(sep: &str) -> String {
    let mut out = String::with_capacity(sep.len());
    let mut chars = sep.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }

    out
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if cli.verbose { "debug" } else { "info" })
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Chunk { file, splitter } => chunk_file(&file, &splitter.build()?),
        Command::Index {
            path,
            output,
            no_merge,
            splitter,
        } => {
            let loader = NodeLoader::new(splitter.build()?);
            if path.is_dir() {
                index_dir(&path, output.as_deref(), &loader, !no_merge)
            } else {
                let leaves = index_file(&path, &loader, !no_merge)?;
                write_json(&leaves, output.as_deref())
            }
        }
    }
}

fn chunk_file(path: &Path, splitter: &TextSplitter) -> Result<()> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let chunks = splitter.split_with_offsets(&text);
    let oversized = chunks.iter().filter(|c| c.oversized).count();
    if oversized > 0 {
        warn!(oversized, "some chunks exceed the chunk size");
    }
    info!(path = %path.display(), chunks = chunks.len(), "chunked file");

    write_json(&chunks, None)
}

fn index_file(path: &Path, loader: &NodeLoader, merge: bool) -> Result<Vec<IndexNode>> {
    let mut nodes = loader
        .load_content_list(path)
        .with_context(|| format!("Failed to load content list {}", path.display()))?;
    if merge {
        nodes = loader.merge_text_nodes(nodes);
    }

    let leaves: Vec<IndexNode> = loader
        .splitter()
        .split_structured(&nodes)
        .iter()
        .map(IndexNode::leaf_from_attribution)
        .collect();

    info!(path = %path.display(), nodes = nodes.len(), leaves = leaves.len(), "indexed");
    Ok(leaves)
}

fn index_dir(root: &Path, output: Option<&Path>, loader: &NodeLoader, merge: bool) -> Result<()> {
    let Some(output) = output else {
        bail!("--output directory is required when indexing a directory");
    };
    fs::create_dir_all(output)
        .with_context(|| format!("Failed to create output directory {}", output.display()))?;

    let inputs = content_lists(root);
    if inputs.is_empty() {
        warn!(root = %root.display(), "no JSON files found");
    }

    let mut targets: HashMap<PathBuf, &Path> = HashMap::new();
    for input in &inputs {
        let target = index_output_path(root, input, output);
        if let Some(earlier) = targets.insert(target.clone(), input) {
            bail!(
                "{} and {} would both be written to {}",
                earlier.display(),
                input.display(),
                target.display()
            );
        }
    }

    for input in &inputs {
        let leaves = index_file(input, loader, merge)?;
        let target = index_output_path(root, input, output);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }
        write_json(&leaves, Some(&target))?;
    }

    info!(files = inputs.len(), output = %output.display(), "indexed directory");
    Ok(())
}

/// Where the index of `input` goes: its directory relative to `root`, mirrored
/// under `output`, with `_content_list.json` replaced by `.index.json`.
fn index_output_path(root: &Path, input: &Path, output: &Path) -> PathBuf {
    let relative_dir = input
        .strip_prefix(root)
        .ok()
        .and_then(Path::parent)
        .unwrap_or(Path::new(""));
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().trim_end_matches("_content_list").to_string())
        .unwrap_or_else(|| "document".to_string());
    output.join(relative_dir).join(format!("{stem}.index.json"))
}

/// `*_content_list.json` files under `root`, or every `*.json` file when there are none.
fn content_lists(root: &Path) -> Vec<PathBuf> {
    let json: Vec<PathBuf> = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
        .collect();

    let content_lists: Vec<PathBuf> = json
        .iter()
        .filter(|path| {
            path.file_name()
                .is_some_and(|name| name.to_string_lossy().ends_with("_content_list.json"))
        })
        .cloned()
        .collect();

    if content_lists.is_empty() {
        json
    } else {
        content_lists
    }
}

fn write_json<T: serde::Serialize + ?Sized>(value: &T, output: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    match output {
        Some(path) => fs::write(path, json)
            .with_context(|| format!("Failed to write {}", path.display())),
        None => {
            println!("{json}");
            Ok(())
        }
    }
}
