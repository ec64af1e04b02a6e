//! Built-in validators.

mod attributes;
mod headings;
mod title;
mod whitespace;

pub use attributes::UnresolvedAttribute;
pub use headings::HeadingLevels;
pub use title::MissingTitle;
pub use whitespace::TrailingWhitespace;

use crate::extension::Extension;

/// Names of every built-in validator, sorted
pub const NAMES: [&str; 4] = [
    HeadingLevels::NAME,
    MissingTitle::NAME,
    TrailingWhitespace::NAME,
    UnresolvedAttribute::NAME,
];

/// Instantiate a built-in validator by name
pub fn create(name: &str) -> Option<Box<dyn Extension>> {
    match name {
        HeadingLevels::NAME => Some(Box::new(HeadingLevels)),
        MissingTitle::NAME => Some(Box::new(MissingTitle)),
        TrailingWhitespace::NAME => Some(Box::new(TrailingWhitespace)),
        UnresolvedAttribute::NAME => Some(Box::new(UnresolvedAttribute)),
        _ => None,
    }
}
