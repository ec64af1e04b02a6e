use crate::document::DocumentEntry;
use crate::error::ExtensionError;
use crate::extension::{Extension, Issue};

/// Reports section headings that skip levels, e.g. `==` followed by `====`
#[derive(Debug, Default, Clone, Copy)]
pub struct HeadingLevels;

impl HeadingLevels {
    pub const NAME: &'static str = "heading-levels";
    pub const ID: &'static str = "HEADING";
}

impl Extension for HeadingLevels {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn run(&self, document: &DocumentEntry) -> Result<Option<Vec<Issue>>, ExtensionError> {
        let mut issues = Vec::new();
        let mut previous: Option<usize> = None;

        for heading in &document.parsed().headings {
            // Partials may start at any level; only jumps between headings count.
            if let Some(prev) = previous
                && heading.level > prev + 1
            {
                issues.push(Issue::new(
                    Self::ID,
                    format!(
                        "section '{}' on line {} skips from level {} to {}",
                        heading.title, heading.line, prev, heading.level
                    ),
                ));
            }
            previous = Some(heading.level);
        }

        Ok((!issues.is_empty()).then_some(issues))
    }
}
