//! Default document loader.
//!
//! [`HeaderScanner`] is not a markup parser. It reads an AsciiDoc file and pulls
//! out the metadata validators need: the document title, section headings,
//! attribute entries and `include::` targets. Delimited listing, literal and
//! comment blocks are skipped.

use regex::Regex;
use std::sync::OnceLock;

use async_trait::async_trait;
use tokio::fs;

use crate::document::{
    Attributes, DocumentLoader, Heading, LoadContext, LoadedDocument, ParsedDocument,
};
use crate::error::LoadError;

/// Cached regex for section headings (`=` through `======`)
static HEADING_REGEX: OnceLock<Regex> = OnceLock::new();

/// Cached regex for attribute entries, including unset forms (`:!name:` / `:name!:`)
static ATTRIBUTE_ENTRY_REGEX: OnceLock<Regex> = OnceLock::new();

/// Cached regex for include directives
static INCLUDE_REGEX: OnceLock<Regex> = OnceLock::new();

/// Cached regex for `{name}` attribute references; group 1 holds an escaping backslash
static ATTRIBUTE_REFERENCE_REGEX: OnceLock<Regex> = OnceLock::new();

fn get_heading_regex() -> &'static Regex {
    HEADING_REGEX.get_or_init(|| {
        Regex::new(r"^(={1,6})\s+(\S.*?)\s*$").expect("Failed to compile heading regex")
    })
}

fn get_attribute_entry_regex() -> &'static Regex {
    ATTRIBUTE_ENTRY_REGEX.get_or_init(|| {
        Regex::new(r"^:(!?)([A-Za-z0-9_][A-Za-z0-9_-]*)(!?):(?:\s+(.*?))?\s*$")
            .expect("Failed to compile attribute entry regex")
    })
}

fn get_include_regex() -> &'static Regex {
    INCLUDE_REGEX.get_or_init(|| {
        Regex::new(r"^include::([^\[\s]+)\[[^\]]*\]\s*$").expect("Failed to compile include regex")
    })
}

pub(crate) fn get_attribute_reference_regex() -> &'static Regex {
    ATTRIBUTE_REFERENCE_REGEX.get_or_init(|| {
        Regex::new(r"(\\?)\{([A-Za-z0-9_][A-Za-z0-9_-]*)\}")
            .expect("Failed to compile attribute reference regex")
    })
}

/// Block delimiters whose content is opaque to the scanner
const OPAQUE_DELIMITERS: [&str; 4] = ["----", "....", "````", "////"];

fn opaque_delimiter(line: &str) -> Option<&'static str> {
    let trimmed = line.trim_end();
    OPAQUE_DELIMITERS.iter().copied().find(|d| {
        trimmed.len() >= d.len() && trimmed.chars().all(|c| Some(c) == d.chars().next())
    })
}

/// Scans AsciiDoc source for title, headings, attributes and includes
#[derive(Debug, Default, Clone, Copy)]
pub struct HeaderScanner;

impl HeaderScanner {
    pub fn new() -> Self {
        Self
    }

    /// Scan a source text. `path` seeds the intrinsic `docname`/`docfile` attributes.
    pub fn scan(&self, path: &str, source: &str) -> LoadedDocument {
        let mut parsed = ParsedDocument::default();
        let mut attributes = Attributes::new();
        // (delimiter char, delimiter length, opening line)
        let mut open_block: Option<(char, usize, usize)> = None;
        let mut last_line = 0;

        for (index, line) in source.lines().enumerate() {
            let line_number = index + 1;
            last_line = line_number;

            if let Some((ch, len, start)) = open_block {
                let trimmed = line.trim_end();
                if trimmed.len() == len && trimmed.chars().all(|c| c == ch) {
                    parsed.opaque_blocks.push(start..=line_number);
                    open_block = None;
                }
                continue;
            }
            if let Some(delimiter) = opaque_delimiter(line) {
                let trimmed = line.trim_end();
                if let Some(ch) = delimiter.chars().next() {
                    open_block = Some((ch, trimmed.len(), line_number));
                }
                continue;
            }
            if line.starts_with("//") {
                continue;
            }

            if let Some(caps) = get_heading_regex().captures(line) {
                let level = caps[1].len() - 1;
                let title = caps[2].to_string();
                if level == 0 && parsed.title.is_none() && parsed.headings.is_empty() {
                    parsed.title = Some(title.clone());
                }
                parsed.headings.push(Heading {
                    level,
                    title,
                    line: line_number,
                });
            } else if let Some(caps) = get_attribute_entry_regex().captures(line) {
                let name = caps[2].to_string();
                let unset = !caps[1].is_empty() || !caps[3].is_empty();
                if unset {
                    attributes.remove(&name);
                } else {
                    let value = caps.get(4).map(|m| m.as_str()).unwrap_or_default();
                    attributes.insert(name, value.to_string());
                }
            } else if let Some(caps) = get_include_regex().captures(line) {
                parsed.includes.push(caps[1].to_string());
            }
        }

        if let Some((_, _, start)) = open_block {
            parsed.opaque_blocks.push(start..=last_line);
        }

        if let Some(title) = &parsed.title {
            attributes
                .entry("doctitle".to_string())
                .or_insert_with(|| title.clone());
        }
        attributes.insert("docfile".to_string(), path.to_string());
        let docname = std::path::Path::new(path)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(path);
        attributes.insert("docname".to_string(), docname.to_string());

        LoadedDocument {
            original: source.to_string(),
            parsed,
            attributes,
        }
    }
}

/// Loads AsciiDoc files from the filesystem relative to the context root
#[derive(Debug, Default, Clone)]
pub struct AsciidocLoader {
    scanner: HeaderScanner,
}

impl AsciidocLoader {
    pub fn new() -> Self {
        Self {
            scanner: HeaderScanner::new(),
        }
    }
}

#[async_trait]
impl DocumentLoader for AsciidocLoader {
    async fn load(&self, path: &str, context: &LoadContext) -> Result<LoadedDocument, LoadError> {
        let location = context.resolve(path);
        let bytes = fs::read(&location)
            .await
            .map_err(|e| LoadError::from_io(path, &e))?;
        let source = String::from_utf8(bytes).map_err(|e| LoadError::Unparsable {
            path: path.to_string(),
            details: e.to_string(),
        })?;

        Ok(self.scanner.scan(path, &source))
    }
}
