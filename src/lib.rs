//! # validate-docs Library
//!
//! Validates a tree of AsciiDoc documents reachable from an entry document.
//! Each document is loaded once through a shared cache, checked by every
//! registered extension, and the per-document issue lists are collected into
//! a single report. A semaphore bounds how many documents are in flight.

pub mod aggregator;
pub mod builtin;
pub mod cache;
pub mod cli;
pub mod config;
pub mod document;
pub mod engine;
pub mod error;
pub mod extension;
pub mod includes;
pub mod loader;
pub mod output;
pub mod pool;

pub use aggregator::{ResultAggregator, TaskFailure, ValidationResults};
pub use cache::DocumentCache;
pub use cli::{Cli, OutputFormat};
pub use config::{Config, ConfigManager, EnvProvider, SystemEnvProvider};
pub use document::{
    Attributes, DocumentEntry, DocumentLoader, Heading, LoadContext, LoadedDocument,
    ParsedDocument,
};
pub use engine::{EngineConfig, ValidationEngine};
pub use error::{ConfigError, ExtensionError, LoadError, ValidationError};
pub use extension::{EXTENSION_ERROR_ID, Extension, ExtensionRegistry, Issue};
pub use includes::{
    DirectiveIncludes, ExcludeFilter, IncludeRef, IncludeSetProvider, UNRESOLVED_INCLUDE_ID,
    normalize_path, resolve_include, resolve_reference, substitute_attributes,
};
pub use loader::{AsciidocLoader, HeaderScanner};
pub use output::{DEFAULT_THRESHOLD, ReportMode, Reporter};
pub use pool::{
    CancelToken, DEFAULT_POOL_SIZE, PoolOptions, PoolStats, TaskPool, validate_pool_size,
};
