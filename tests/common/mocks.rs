use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use validate_docs::{
    DocumentEntry, DocumentLoader, Extension, ExtensionError, HeaderScanner, Issue, LoadContext,
    LoadError, LoadedDocument,
};

/// In-memory loader that records how often each path was loaded
pub struct MockLoader {
    documents: HashMap<String, String>,
    calls: Mutex<HashMap<String, usize>>,
    total: AtomicUsize,
    delay: Duration,
}

impl MockLoader {
    pub fn new(documents: &[(&str, &str)]) -> Self {
        Self {
            documents: documents
                .iter()
                .map(|(path, source)| (path.to_string(), source.to_string()))
                .collect(),
            calls: Mutex::new(HashMap::new()),
            total: AtomicUsize::new(0),
            delay: Duration::ZERO,
        }
    }

    /// Documents named `doc0.adoc` .. `doc{n-1}.adoc`, all empty
    pub fn with_documents(count: usize) -> Self {
        let names: Vec<String> = (0..count).map(|i| format!("doc{}.adoc", i)).collect();
        let documents: Vec<(&str, &str)> = names.iter().map(|n| (n.as_str(), "")).collect();
        Self::new(&documents)
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self, path: &str) -> usize {
        self.calls.lock().get(path).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.total.load(Ordering::SeqCst)
    }

    pub fn into_arc(self) -> Arc<Self> {
        Arc::new(self)
    }
}

#[async_trait]
impl DocumentLoader for MockLoader {
    async fn load(&self, path: &str, _context: &LoadContext) -> Result<LoadedDocument, LoadError> {
        *self.calls.lock().entry(path.to_string()).or_insert(0) += 1;
        self.total.fetch_add(1, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let source = self.documents.get(path).ok_or_else(|| LoadError::NotFound {
            path: path.to_string(),
        })?;
        Ok(HeaderScanner::new().scan(path, source))
    }
}

/// Returns a fixed issue list for selected documents and nothing otherwise
pub struct FixedExtension {
    name: String,
    issues: HashMap<String, Vec<Issue>>,
}

impl FixedExtension {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            issues: HashMap::new(),
        }
    }

    pub fn with_issue(mut self, path: &str, id: &str, message: &str) -> Self {
        self.issues
            .entry(path.to_string())
            .or_default()
            .push(Issue::new(id, message));
        self
    }
}

impl Extension for FixedExtension {
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&self, document: &DocumentEntry) -> Result<Option<Vec<Issue>>, ExtensionError> {
        Ok(self.issues.get(document.path()).cloned())
    }
}

/// Reports one issue per document, tagged with the document path
pub struct EchoExtension;

impl Extension for EchoExtension {
    fn name(&self) -> &str {
        "echo"
    }

    fn run(&self, document: &DocumentEntry) -> Result<Option<Vec<Issue>>, ExtensionError> {
        Ok(Some(vec![Issue::new("ECHO", document.path())]))
    }
}

/// Always returns an error
pub struct FailingExtension;

impl Extension for FailingExtension {
    fn name(&self) -> &str {
        "failing"
    }

    fn run(&self, _document: &DocumentEntry) -> Result<Option<Vec<Issue>>, ExtensionError> {
        Err(ExtensionError::failed("always fails"))
    }
}

/// Always panics
pub struct PanickingExtension;

impl Extension for PanickingExtension {
    fn name(&self) -> &str {
        "panicking"
    }

    fn run(&self, _document: &DocumentEntry) -> Result<Option<Vec<Issue>>, ExtensionError> {
        panic!("validator crashed")
    }
}
