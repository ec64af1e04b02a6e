use clap::{ArgAction, Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Report output format
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Console text, or CI annotations when running in CI
    #[default]
    Human,
    /// Machine-readable JSON document
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "human" => Ok(OutputFormat::Human),
            "json" => Ok(OutputFormat::Json),
            other => Err(format!("Invalid output format: {}", other)),
        }
    }
}

/// Validate a documentation tree with a set of document checks
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "validate-docs")]
#[command(about = "Validate AsciiDoc documents reachable from an index document")]
#[command(version)]
pub struct Cli {
    /// Configuration file (TOML or JSON)
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Content directory that document paths are relative to
    #[arg(long = "content")]
    pub content_dir: Option<PathBuf>,

    /// Entry document whose include set is validated
    #[arg(long = "index", conflicts_with = "files")]
    pub index: Option<String>,

    /// Validate only these documents
    #[arg(short = 'f', long = "file", action = ArgAction::Append)]
    pub files: Vec<String>,

    /// Number of documents processed concurrently
    #[arg(short = 'j', long = "concurrency")]
    pub concurrency: Option<usize>,

    /// Maximum issue count that is still annotated inline in CI
    #[arg(long = "threshold")]
    pub threshold: Option<usize>,

    /// Output format
    #[arg(long = "format", value_enum)]
    pub format: Option<OutputFormat>,

    /// Force CI annotation output
    #[arg(long = "ci")]
    pub ci: bool,

    /// Per-document timeout in seconds
    #[arg(long = "timeout")]
    pub timeout: Option<u64>,

    /// Overall deadline in seconds; documents not started by then are cancelled
    #[arg(long = "deadline")]
    pub deadline: Option<u64>,

    /// Exclude document patterns (glob syntax)
    #[arg(long = "exclude", action = ArgAction::Append)]
    pub exclude_patterns: Vec<String>,

    /// Enable only these extensions, in this order
    #[arg(short = 'e', long = "extension", action = ArgAction::Append)]
    pub extensions: Vec<String>,

    /// Report issues of the entry document as well
    #[arg(long = "include-entry-document")]
    pub include_entry_document: bool,

    /// Print the registered extensions and exit
    #[arg(long = "list-extensions")]
    pub list_extensions: bool,

    /// Increase logging verbosity (-v, -vv)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    pub verbose: u8,

    /// Enable debug logging
    #[arg(long = "debug")]
    pub debug: bool,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Default log filter directive for the requested verbosity
    pub fn log_filter(&self) -> &'static str {
        if self.debug || self.verbose >= 2 {
            "debug"
        } else if self.verbose == 1 {
            "info"
        } else {
            "warn"
        }
    }
}
