use crate::document::DocumentEntry;
use crate::error::ExtensionError;
use crate::extension::{Extension, Issue};

/// Reports lines ending in spaces or tabs
#[derive(Debug, Default, Clone, Copy)]
pub struct TrailingWhitespace;

impl TrailingWhitespace {
    pub const NAME: &'static str = "trailing-whitespace";
    pub const ID: &'static str = "WHITESPACE";
}

impl Extension for TrailingWhitespace {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn run(&self, document: &DocumentEntry) -> Result<Option<Vec<Issue>>, ExtensionError> {
        let issues: Vec<Issue> = document
            .original()
            .lines()
            .enumerate()
            .filter(|(_, line)| line.ends_with(' ') || line.ends_with('\t'))
            .map(|(index, _)| {
                Issue::new(
                    Self::ID,
                    format!("line {} has trailing whitespace", index + 1),
                )
            })
            .collect();

        Ok((!issues.is_empty()).then_some(issues))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::test_support::scan;

    #[test]
    fn test_clean_document() {
        assert_eq!(TrailingWhitespace.run(&scan("= T\nok\n")).unwrap(), None);
    }

    #[test]
    fn test_reports_each_line() {
        let issues = TrailingWhitespace
            .run(&scan("= T \nfine\ntab\t\n"))
            .unwrap()
            .unwrap();
        let messages: Vec<&str> = issues.iter().map(|i| i.message.as_str()).collect();
        assert_eq!(
            messages,
            vec![
                "line 1 has trailing whitespace",
                "line 3 has trailing whitespace"
            ]
        );
    }
}
