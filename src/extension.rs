//! Validator plugins and the ordered registry that runs them.

use std::panic::{AssertUnwindSafe, catch_unwind};

use serde::{Deserialize, Serialize};

use crate::builtin;
use crate::document::DocumentEntry;
use crate::error::{ConfigError, ConfigResult, ExtensionError};

/// Issue id used when a validator fails on a document
pub const EXTENSION_ERROR_ID: &str = "EXTENSION_ERROR";

/// One validator finding
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Issue {
    pub id: String,
    pub message: String,
}

impl Issue {
    pub fn new(id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            message: message.into(),
        }
    }
}

/// A validator plugin.
///
/// `run` returns `Ok(None)` when it has nothing to report; that is not an
/// error. Implementations must not block indefinitely.
pub trait Extension: Send + Sync {
    /// Stable name used for registration, ordering and failure messages
    fn name(&self) -> &str;

    fn run(&self, document: &DocumentEntry) -> Result<Option<Vec<Issue>>, ExtensionError>;
}

/// Extract a readable message from a panic payload
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Ordered collection of extensions. Build it at startup, then share it
/// read-only (typically behind an `Arc`).
#[derive(Default)]
pub struct ExtensionRegistry {
    extensions: Vec<Box<dyn Extension>>,
}

impl ExtensionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// All built-in validators, in sorted name order
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for name in builtin::NAMES {
            if let Some(extension) = builtin::create(name) {
                registry.extensions.push(extension);
            }
        }
        registry
    }

    /// Register the named built-in validators in the given order.
    /// An empty list selects every built-in.
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> ConfigResult<Self> {
        if names.is_empty() {
            return Ok(Self::builtin());
        }

        let mut registry = Self::new();
        for name in names {
            let name = name.as_ref();
            let extension = builtin::create(name).ok_or_else(|| ConfigError::UnknownExtension {
                name: name.to_string(),
            })?;
            registry.register(extension)?;
        }
        Ok(registry)
    }

    /// Append an extension. Names must be unique.
    pub fn register(&mut self, extension: Box<dyn Extension>) -> ConfigResult<()> {
        if self.extensions.iter().any(|e| e.name() == extension.name()) {
            return Err(ConfigError::DuplicateExtension {
                name: extension.name().to_string(),
            });
        }
        self.extensions.push(extension);
        Ok(())
    }

    /// Extensions in registration order
    pub fn all(&self) -> &[Box<dyn Extension>] {
        &self.extensions
    }

    pub fn names(&self) -> Vec<&str> {
        self.extensions.iter().map(|e| e.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.extensions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
    }

    /// Run every extension on `document` in registration order.
    ///
    /// A failing or panicking extension contributes one `EXTENSION_ERROR` issue
    /// and the remaining extensions still run.
    pub fn run_all(&self, document: &DocumentEntry) -> Vec<Issue> {
        let mut issues = Vec::new();

        for extension in &self.extensions {
            let outcome = catch_unwind(AssertUnwindSafe(|| extension.run(document)))
                .unwrap_or_else(|payload| {
                    Err(ExtensionError::Panicked {
                        details: panic_message(payload.as_ref()),
                    })
                });

            match outcome {
                Ok(Some(found)) => issues.extend(found),
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(
                        path = document.path(),
                        extension = extension.name(),
                        error = %e,
                        "extension failed"
                    );
                    issues.push(Issue::new(
                        EXTENSION_ERROR_ID,
                        format!("extension '{}' failed: {}", extension.name(), e),
                    ));
                }
            }
        }

        issues
    }
}
