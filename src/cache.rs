use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use moka::future::Cache;

use crate::document::{DocumentEntry, DocumentLoader, LoadContext};
use crate::error::LoadError;

/// Run-scoped memo of loaded documents keyed by path
///
/// It uses `moka` to handle concurrent access and "thundering herd" protection:
/// when several tasks request the same uncached path at once, one of them runs
/// the loader and the others wait for its result. Failed loads are not cached.
pub struct DocumentCache {
    cache: Cache<String, Arc<DocumentEntry>>,
    loader: Arc<dyn DocumentLoader>,
    context: LoadContext,
    loads: AtomicUsize,
}

impl DocumentCache {
    pub fn new(loader: Arc<dyn DocumentLoader>, context: LoadContext) -> Self {
        // Unbounded: an entry must survive for the whole run once loaded.
        let cache = Cache::builder().build();

        Self {
            cache,
            loader,
            context,
            loads: AtomicUsize::new(0),
        }
    }

    /// Get a document from the cache, or load it if missing.
    ///
    /// The loader is only invoked if the path is missing. Concurrent callers for
    /// the same path wait for the single leader and receive the same entry.
    pub async fn get_or_load(&self, path: &str) -> Result<Arc<DocumentEntry>, LoadError> {
        self.cache
            .try_get_with(path.to_string(), async {
                self.loads.fetch_add(1, Ordering::SeqCst);
                tracing::debug!(path, "loading document");
                let loaded = self.loader.load(path, &self.context).await?;
                Ok::<_, LoadError>(Arc::new(DocumentEntry::new(path, loaded)))
            })
            .await
            .map_err(|e| (*e).clone())
    }

    /// Get a document only if it has already been loaded
    pub async fn get(&self, path: &str) -> Option<Arc<DocumentEntry>> {
        self.cache.get(path).await
    }

    pub fn contains(&self, path: &str) -> bool {
        self.cache.contains_key(path)
    }

    /// Number of loader invocations so far
    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    /// Number of cached documents
    pub async fn len(&self) -> u64 {
        self.cache.run_pending_tasks().await;
        self.cache.entry_count()
    }
}
