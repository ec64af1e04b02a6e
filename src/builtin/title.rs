use crate::document::DocumentEntry;
use crate::error::ExtensionError;
use crate::extension::{Extension, Issue};

/// Reports documents with neither a level-0 title nor a `doctitle` attribute
#[derive(Debug, Default, Clone, Copy)]
pub struct MissingTitle;

impl MissingTitle {
    pub const NAME: &'static str = "missing-title";
    pub const ID: &'static str = "TITLE";
}

impl Extension for MissingTitle {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn run(&self, document: &DocumentEntry) -> Result<Option<Vec<Issue>>, ExtensionError> {
        if document.parsed().title.is_some() || document.attribute("doctitle").is_some() {
            return Ok(None);
        }
        Ok(Some(vec![Issue::new(Self::ID, "document has no title")]))
    }
}
