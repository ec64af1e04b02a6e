use crate::document::DocumentEntry;
use crate::error::ExtensionError;
use crate::extension::{Extension, Issue};
use crate::loader::get_attribute_reference_regex;

/// Character replacement and intrinsic attributes that are always defined
const PREDEFINED: &[&str] = &[
    "amp", "apos", "asterisk", "backslash", "backtick", "blank", "caret", "cpp", "deg", "empty",
    "endsb", "gt", "ldquo", "lsquo", "lt", "nbsp", "plus", "pp", "quot", "rdquo", "rsquo", "sp",
    "startsb", "tilde", "two-colons", "two-semicolons", "vbar", "wj", "zwsp", "docdir",
    "docdate", "doctime", "localdate", "localtime", "localyear", "outfilesuffix",
];

/// Reports `{name}` references to attributes that are never defined
#[derive(Debug, Default, Clone, Copy)]
pub struct UnresolvedAttribute;

impl UnresolvedAttribute {
    pub const NAME: &'static str = "unresolved-attribute";
    pub const ID: &'static str = "ATTRIBUTE";
}

impl Extension for UnresolvedAttribute {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn run(&self, document: &DocumentEntry) -> Result<Option<Vec<Issue>>, ExtensionError> {
        let mut issues = Vec::new();
        let parsed = document.parsed();

        for (index, line) in document.original().lines().enumerate() {
            if parsed.is_opaque(index + 1) || line.starts_with("//") || line.starts_with(':') {
                continue;
            }

            for caps in get_attribute_reference_regex().captures_iter(line) {
                if !caps[1].is_empty() {
                    continue; // escaped
                }
                let name = &caps[2];
                if document.attributes().contains_key(name) || PREDEFINED.contains(&name) {
                    continue;
                }
                issues.push(Issue::new(
                    Self::ID,
                    format!("line {} references undefined attribute '{}'", index + 1, name),
                ));
            }
        }

        Ok((!issues.is_empty()).then_some(issues))
    }
}
