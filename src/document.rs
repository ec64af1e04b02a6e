//! Document entries and the loader seam.
//!
//! A [`DocumentEntry`] is produced once per path by a [`DocumentLoader`] and is
//! immutable afterwards; validators only ever see it behind a shared reference.

use std::collections::BTreeMap;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::LoadError;

/// Document metadata (header attribute entries)
pub type Attributes = BTreeMap<String, String>;

/// A section heading found in a document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Heading {
    /// Section level, `0` for the document title
    pub level: usize,
    pub title: String,
    /// 1-based line number
    pub line: usize,
}

/// Parsed form of a document as produced by the loader
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedDocument {
    pub title: Option<String>,
    pub headings: Vec<Heading>,
    /// Targets of `include::` directives, in document order
    pub includes: Vec<String>,
    /// 1-based line ranges of delimited listing, literal, fenced and comment
    /// blocks, delimiters included. An unterminated block runs to the last line.
    pub opaque_blocks: Vec<RangeInclusive<usize>>,
}

impl ParsedDocument {
    /// Whether a 1-based line sits inside (or delimits) an opaque block
    pub fn is_opaque(&self, line: usize) -> bool {
        self.opaque_blocks.iter().any(|block| block.contains(&line))
    }
}

/// Everything a loader returns for one path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedDocument {
    pub original: String,
    pub parsed: ParsedDocument,
    pub attributes: Attributes,
}

/// Root context handed to the loader with every path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadContext {
    root: PathBuf,
}

impl LoadContext {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute (or root-relative) filesystem location of a document path
    pub fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path)
    }
}

/// One loaded document. Fields are write-once: they are set in the constructor
/// and only exposed through accessors.
#[derive(Debug, PartialEq, Eq)]
pub struct DocumentEntry {
    path: String,
    original: String,
    parsed: ParsedDocument,
    attributes: Attributes,
}

impl DocumentEntry {
    pub fn new(path: impl Into<String>, loaded: LoadedDocument) -> Self {
        Self {
            path: path.into(),
            original: loaded.original,
            parsed: loaded.parsed,
            attributes: loaded.attributes,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn original(&self) -> &str {
        &self.original
    }

    pub fn parsed(&self) -> &ParsedDocument {
        &self.parsed
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }
}

/// Turns a path into a parsed document. Implementations must be safe to call
/// from many tasks at once.
#[async_trait]
pub trait DocumentLoader: Send + Sync {
    async fn load(&self, path: &str, context: &LoadContext) -> Result<LoadedDocument, LoadError>;
}
