//! Include-set resolution and the partial/include-only exclusion filter.

use globset::{GlobSet, GlobSetBuilder};
use std::collections::HashSet;
use std::path::Path;

use crate::document::{Attributes, DocumentEntry};
use crate::error::{ConfigError, ConfigResult};
use crate::extension::Issue;
use crate::loader::get_attribute_reference_regex;

/// Default extension appended to references that have none
pub const DEFAULT_DOCUMENT_EXTENSION: &str = "adoc";

/// Default location of partials that are only meant to be embedded
pub const DEFAULT_EXCLUDE_PATTERNS: [&str; 1] = ["include/**"];

/// Issue id for include targets that cannot be resolved to a path
pub const UNRESOLVED_INCLUDE_ID: &str = "UNRESOLVED_INCLUDE";

/// One `include::` target of a document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IncludeRef {
    /// The target resolved to a content-relative path
    Resolved { reference: String, path: String },
    /// The target names an attribute that is not defined at that point
    Unresolved { reference: String, attribute: String },
}

impl IncludeRef {
    /// Reference as written in the including document
    pub fn reference(&self) -> &str {
        match self {
            IncludeRef::Resolved { reference, .. } | IncludeRef::Unresolved { reference, .. } => {
                reference
            }
        }
    }

    pub fn path(&self) -> Option<&str> {
        match self {
            IncludeRef::Resolved { path, .. } => Some(path),
            IncludeRef::Unresolved { .. } => None,
        }
    }

    /// Issue to report on the including document, if the target is unusable
    pub fn to_issue(&self) -> Option<Issue> {
        match self {
            IncludeRef::Resolved { .. } => None,
            IncludeRef::Unresolved {
                reference,
                attribute,
            } => Some(Issue::new(
                UNRESOLVED_INCLUDE_ID,
                format!(
                    "include target '{}' references undefined attribute '{}'",
                    reference, attribute
                ),
            )),
        }
    }
}

/// Supplies the direct includes of one document.
///
/// `attributes` are the attributes in effect for `document`: its own entries
/// layered over those inherited from the documents that include it. Nested
/// includes are followed by the engine, which calls this once per document.
pub trait IncludeSetProvider: Send + Sync {
    fn includes(&self, document: &DocumentEntry, attributes: &Attributes) -> Vec<IncludeRef>;
}

/// Strip leading `./` segments and normalise separators
pub fn normalize_path(path: &str) -> String {
    let mut normalized = path.replace('\\', "/");
    while let Some(rest) = normalized.strip_prefix("./") {
        normalized = rest.to_string();
    }
    normalized
}

/// Resolve a reference to a content-relative document path, appending the
/// default extension when the reference has none.
pub fn resolve_reference(reference: &str) -> String {
    let normalized = normalize_path(reference);
    if Path::new(&normalized).extension().is_some() {
        normalized
    } else {
        format!("{}.{}", normalized, DEFAULT_DOCUMENT_EXTENSION)
    }
}

/// Resolve a reference found in `including` against that document's
/// directory. A leading `/` makes the reference relative to the content root.
pub fn resolve_include(including: &str, reference: &str) -> String {
    let reference = normalize_path(reference);
    let joined = match reference.strip_prefix('/') {
        Some(rooted) => rooted.to_string(),
        None => match normalize_path(including).rsplit_once('/') {
            Some((dir, _)) => format!("{}/{}", dir, reference),
            None => reference,
        },
    };

    let mut segments: Vec<&str> = Vec::new();
    for segment in joined.split('/') {
        match segment {
            "" | "." => {}
            ".." if segments.last().is_some_and(|s| *s != "..") => {
                segments.pop();
            }
            _ => segments.push(segment),
        }
    }
    resolve_reference(&segments.join("/"))
}

/// Replace `{name}` references with attribute values.
///
/// Returns the name of the first undefined attribute as the error. Escaped
/// references (`\{name}`) are kept literally without the backslash.
pub fn substitute_attributes(text: &str, attributes: &Attributes) -> Result<String, String> {
    let mut output = String::with_capacity(text.len());
    let mut last = 0;

    for caps in get_attribute_reference_regex().captures_iter(text) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(2)) else {
            continue;
        };
        output.push_str(&text[last..whole.start()]);
        last = whole.end();

        if !caps[1].is_empty() {
            output.push_str(&text[name.start() - 1..whole.end()]);
            continue;
        }
        match attributes.get(name.as_str()) {
            Some(value) => output.push_str(value),
            None => return Err(name.as_str().to_string()),
        }
    }
    output.push_str(&text[last..]);
    Ok(output)
}

/// Include set taken from `include::` directives
#[derive(Debug, Default, Clone, Copy)]
pub struct DirectiveIncludes;

impl IncludeSetProvider for DirectiveIncludes {
    fn includes(&self, document: &DocumentEntry, attributes: &Attributes) -> Vec<IncludeRef> {
        let mut seen = HashSet::new();
        document
            .parsed()
            .includes
            .iter()
            .map(|reference| match substitute_attributes(reference, attributes) {
                Ok(target) => IncludeRef::Resolved {
                    reference: reference.clone(),
                    path: resolve_include(document.path(), &target),
                },
                Err(attribute) => IncludeRef::Unresolved {
                    reference: reference.clone(),
                    attribute,
                },
            })
            .filter(|include| match include.path() {
                Some(path) => seen.insert(path.to_string()),
                None => true,
            })
            .collect()
    }
}

/// Predicate for partial/include-only documents that must never be validated
#[derive(Debug, Clone, Default)]
pub struct ExcludeFilter {
    exclude_set: Option<GlobSet>,
}

impl ExcludeFilter {
    /// Filter that excludes nothing
    pub fn none() -> Self {
        Self { exclude_set: None }
    }

    pub fn new<S: AsRef<str>>(patterns: &[S]) -> ConfigResult<Self> {
        if patterns.is_empty() {
            return Ok(Self::none());
        }

        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            let pattern = pattern.as_ref();
            let glob = globset::GlobBuilder::new(pattern)
                .literal_separator(true)
                .build()
                .map_err(|e| ConfigError::InvalidPattern {
                    pattern: pattern.to_string(),
                    details: e.to_string(),
                })?;
            builder.add(glob);
        }

        let exclude_set = builder.build().map_err(|e| ConfigError::InvalidPattern {
            pattern: patterns
                .iter()
                .map(|p| p.as_ref())
                .collect::<Vec<_>>()
                .join(","),
            details: e.to_string(),
        })?;

        Ok(Self {
            exclude_set: Some(exclude_set),
        })
    }

    /// The default filter, excluding everything under `include/`
    pub fn partials() -> Self {
        Self::new(&DEFAULT_EXCLUDE_PATTERNS).unwrap_or_default()
    }

    pub fn is_excluded(&self, path: &str) -> bool {
        match &self.exclude_set {
            Some(set) => set.is_match(normalize_path(path)),
            None => false,
        }
    }
}
