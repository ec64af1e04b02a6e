use std::fs;
use std::path::Path;
use std::sync::Arc;

use tempfile::TempDir;

use validate_docs::{
    DocumentLoader, EngineConfig, Extension, ExtensionRegistry, LoadContext, ValidationEngine,
};

/// Write `files` (relative path, contents) below a fresh temporary directory
pub fn create_content_dir(files: &[(&str, &str)]) -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    for (path, contents) in files {
        write_file(temp_dir.path(), path, contents);
    }
    temp_dir
}

pub fn write_file(root: &Path, path: &str, contents: &str) {
    let full = root.join(path);
    if let Some(parent) = full.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(full, contents).unwrap();
}

pub fn registry_of(extensions: Vec<Box<dyn Extension>>) -> ExtensionRegistry {
    let mut registry = ExtensionRegistry::new();
    for extension in extensions {
        registry.register(extension).unwrap();
    }
    registry
}

pub fn create_engine(
    loader: Arc<dyn DocumentLoader>,
    extensions: Vec<Box<dyn Extension>>,
    config: EngineConfig,
) -> ValidationEngine {
    ValidationEngine::new(loader, LoadContext::new("."), registry_of(extensions), config).unwrap()
}

pub fn with_concurrency(concurrency: usize) -> EngineConfig {
    EngineConfig {
        concurrency,
        ..EngineConfig::default()
    }
}
