//! Per-run validation context.
//!
//! A [`ValidationEngine`] owns everything one run shares between its tasks:
//! the document cache, the extension registry, the exclusion filter and the
//! cancellation token. Nothing here is process-global; dropping the engine
//! drops the cache.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use futures::stream;
use tokio::time::Instant;

use crate::aggregator::{TaskFailure, ValidationResults};
use crate::cache::DocumentCache;
use crate::document::{Attributes, DocumentEntry, DocumentLoader, LoadContext};
use crate::error::{ConfigError, ConfigResult, Result};
use crate::extension::{ExtensionRegistry, Issue};
use crate::includes::{
    DEFAULT_EXCLUDE_PATTERNS, ExcludeFilter, IncludeRef, IncludeSetProvider, normalize_path,
};
use crate::pool::{CancelToken, DEFAULT_POOL_SIZE, PoolOptions, TaskPool, validate_pool_size};

/// Issues found while walking the include tree, keyed by including document
type IncludeIssues = HashMap<String, Vec<Issue>>;

/// Engine settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub concurrency: usize,
    pub document_timeout: Option<Duration>,
    /// Measured from the start of each check
    pub deadline: Option<Duration>,
    pub exclude_patterns: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_POOL_SIZE,
            document_timeout: None,
            deadline: None,
            exclude_patterns: DEFAULT_EXCLUDE_PATTERNS
                .iter()
                .map(|p| p.to_string())
                .collect(),
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        validate_pool_size(self.concurrency)?;
        if self.document_timeout.is_some_and(|t| t.is_zero()) {
            return Err(ConfigError::Validation(
                "Document timeout must be greater than 0".to_string(),
            ));
        }
        if self.deadline.is_some_and(|d| d.is_zero()) {
            return Err(ConfigError::Validation(
                "Deadline must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

pub struct ValidationEngine {
    cache: Arc<DocumentCache>,
    registry: Arc<ExtensionRegistry>,
    exclude: ExcludeFilter,
    cancel: CancelToken,
    config: EngineConfig,
}

impl ValidationEngine {
    pub fn new(
        loader: Arc<dyn DocumentLoader>,
        context: LoadContext,
        registry: ExtensionRegistry,
        config: EngineConfig,
    ) -> ConfigResult<Self> {
        config.validate()?;
        let exclude = ExcludeFilter::new(&config.exclude_patterns)?;

        tracing::info!(pool_size = config.concurrency, "task pool configured");
        tracing::info!(
            count = registry.len(),
            extensions = ?registry.names(),
            "loaded extensions"
        );

        Ok(Self {
            cache: Arc::new(DocumentCache::new(loader, context)),
            registry: Arc::new(registry),
            exclude,
            cancel: CancelToken::new(),
            config,
        })
    }

    /// Validate the given documents and wait for all of them
    pub async fn check_documents<I, S>(&self, paths: I) -> Result<ValidationResults>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let paths = paths.into_iter().map(|p| normalize_path(p.as_ref()));
        self.run_pool(paths, IncludeIssues::new()).await
    }

    /// Validate an entry document together with every document it includes,
    /// directly or through nested includes.
    ///
    /// The entry document is loaded first; failing to load it is an error for
    /// the whole check since its include set is unknown.
    pub async fn check_index(
        &self,
        entry_path: &str,
        provider: &dyn IncludeSetProvider,
    ) -> Result<ValidationResults> {
        let entry_path = normalize_path(entry_path);
        let entry = self.cache.get_or_load(&entry_path).await?;

        let (paths, include_issues) = self.walk_includes(entry, provider).await;
        tracing::info!(
            entry = %entry_path,
            includes = paths.len() - 1,
            "resolved include set"
        );

        self.run_pool(paths, include_issues).await
    }

    /// Breadth-first walk of the include graph starting at `entry`.
    ///
    /// Returns the reachable paths, entry first, each listed once. Excluded
    /// paths are neither loaded nor descended into. Documents that fail to
    /// load are still listed so their task records the failure.
    async fn walk_includes(
        &self,
        entry: Arc<DocumentEntry>,
        provider: &dyn IncludeSetProvider,
    ) -> (Vec<String>, IncludeIssues) {
        let mut paths = vec![entry.path().to_string()];
        let mut visited: HashSet<String> = paths.iter().cloned().collect();
        let mut issues = IncludeIssues::new();

        let attributes = entry.attributes().clone();
        let mut frontier: Vec<(Arc<DocumentEntry>, Attributes)> = vec![(entry, attributes)];

        while !frontier.is_empty() && !self.cancel.is_cancelled() {
            let mut next: Vec<(String, Attributes)> = Vec::new();

            for (document, attributes) in &frontier {
                for include in provider.includes(document, attributes) {
                    if let Some(issue) = include.to_issue() {
                        issues
                            .entry(document.path().to_string())
                            .or_default()
                            .push(issue);
                        continue;
                    }
                    let IncludeRef::Resolved { path, .. } = include else {
                        continue;
                    };
                    if self.exclude.is_excluded(&path) {
                        tracing::debug!(path, "not following partial document");
                        continue;
                    }
                    if visited.insert(path.clone()) {
                        paths.push(path.clone());
                        next.push((path, attributes.clone()));
                    }
                }
            }

            let cache = &self.cache;
            frontier = stream::iter(next)
                .map(|(path, inherited)| async move {
                    (cache.get_or_load(&path).await, path, inherited)
                })
                .buffered(self.config.concurrency)
                .filter_map(|(loaded, path, mut inherited)| async move {
                    match loaded {
                        Ok(document) => {
                            inherited.extend(
                                document
                                    .attributes()
                                    .iter()
                                    .map(|(k, v)| (k.clone(), v.clone())),
                            );
                            Some((document, inherited))
                        }
                        Err(e) => {
                            tracing::debug!(path, error = %e, "cannot follow includes");
                            None
                        }
                    }
                })
                .collect()
                .await;
        }

        (paths, issues)
    }

    async fn run_pool<I>(
        &self,
        paths: I,
        include_issues: IncludeIssues,
    ) -> Result<ValidationResults>
    where
        I: IntoIterator<Item = String>,
    {
        let mut pool = TaskPool::new(PoolOptions {
            size: self.config.concurrency,
            task_timeout: self.config.document_timeout,
            deadline: self.config.deadline.map(|d| Instant::now() + d),
            cancel: self.cancel.clone(),
            exclude: self.exclude.clone(),
        })?;

        let cache = Arc::clone(&self.cache);
        let registry = Arc::clone(&self.registry);
        let include_issues = Arc::new(include_issues);
        pool.submit_all(paths, move |path| {
            check_document(
                Arc::clone(&cache),
                Arc::clone(&registry),
                Arc::clone(&include_issues),
                path,
            )
        });

        let stats = pool.stats();
        tracing::debug!(
            submitted = stats.submitted,
            excluded = stats.excluded,
            duplicates = stats.duplicates,
            workers = stats.workers,
            "documents submitted"
        );

        Ok(pool.await_completion().await)
    }

    pub fn cache(&self) -> &DocumentCache {
        &self.cache
    }

    pub fn registry(&self) -> &ExtensionRegistry {
        &self.registry
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}

/// Load (or fetch) one document and run every extension on it
async fn check_document(
    cache: Arc<DocumentCache>,
    registry: Arc<ExtensionRegistry>,
    include_issues: Arc<IncludeIssues>,
    path: String,
) -> std::result::Result<Vec<Issue>, TaskFailure> {
    tracing::debug!(path, "checking document");
    let entry = cache.get_or_load(&path).await?;

    // Validators are synchronous and may be CPU heavy
    let mut issues = tokio::task::spawn_blocking(move || registry.run_all(&entry))
        .await
        .map_err(|e| TaskFailure::Panicked {
            details: e.to_string(),
        })?;
    if let Some(found) = include_issues.get(&path) {
        issues.extend(found.iter().cloned());
    }
    Ok(issues)
}
