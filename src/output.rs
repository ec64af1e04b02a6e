//! Report rendering
//!
//! The reporter reads a finished result map and picks one of three renderings:
//! inline CI annotations, a single CI summary warning, or verbose console
//! output. It never mutates the map.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::aggregator::ValidationResults;
use crate::cli::OutputFormat;
use crate::error::Result;
use crate::extension::Issue;

/// Default noise-reduction threshold for CI annotations
pub const DEFAULT_THRESHOLD: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportMode {
    /// One annotation line per issue
    Compact,
    /// A single warning pointing at the build log
    Summary,
    /// File headers followed by `id<TAB>message` lines
    Verbose,
}

pub struct Reporter {
    ci: bool,
    threshold: usize,
    format: OutputFormat,
    entry_document: Option<String>,
    include_entry_document: bool,
    show_colors: bool,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    generated_at: DateTime<Utc>,
    mode: ReportMode,
    documents_checked: usize,
    total_issues: usize,
    documents: BTreeMap<&'a str, &'a [Issue]>,
    failures: BTreeMap<&'a str, String>,
}

impl Reporter {
    pub fn new(ci: bool, threshold: usize) -> Self {
        Self {
            ci,
            threshold,
            format: OutputFormat::Human,
            entry_document: None,
            include_entry_document: false,
            show_colors: atty::is(atty::Stream::Stdout),
        }
    }

    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    /// Name the entry document. Its issues are left out of the report unless
    /// `include` is set.
    pub fn with_entry_document(mut self, path: impl Into<String>, include: bool) -> Self {
        self.entry_document = Some(path.into());
        self.include_entry_document = include;
        self
    }

    pub fn with_colors(mut self, show_colors: bool) -> Self {
        self.show_colors = show_colors;
        self
    }

    fn colorize(&self, text: &str, color: &str) -> String {
        if self.show_colors {
            format!("\x1b[{}m{}\x1b[0m", color, text)
        } else {
            text.to_string()
        }
    }

    pub fn mode(&self, results: &ValidationResults) -> ReportMode {
        if !self.ci || results.documents_checked() <= 1 {
            ReportMode::Verbose
        } else if results.total_issues() <= self.threshold {
            ReportMode::Compact
        } else {
            ReportMode::Summary
        }
    }

    fn is_suppressed(&self, path: &str) -> bool {
        !self.include_entry_document && self.entry_document.as_deref() == Some(path)
    }

    fn reported<'a>(
        &'a self,
        results: &'a ValidationResults,
    ) -> impl Iterator<Item = (&'a str, &'a [Issue])> + 'a {
        results
            .documents
            .iter()
            .filter(move |(path, _)| !self.is_suppressed(path))
            .map(|(path, issues)| (path.as_str(), issues.as_slice()))
    }

    /// Number of issues held back because they belong to the entry document
    pub fn suppressed_issues(&self, results: &ValidationResults) -> usize {
        match &self.entry_document {
            Some(entry) if !self.include_entry_document => {
                results.issues(entry).map_or(0, |issues| issues.len())
            }
            _ => 0,
        }
    }

    pub fn render(&self, results: &ValidationResults) -> Result<String> {
        match self.format {
            OutputFormat::Json => self.render_json(results),
            OutputFormat::Human => Ok(match self.mode(results) {
                ReportMode::Compact => self.render_compact(results),
                ReportMode::Summary => self.render_summary(),
                ReportMode::Verbose => self.render_verbose(results),
            }),
        }
    }

    fn render_compact(&self, results: &ValidationResults) -> String {
        let mut output = String::new();
        for (path, issues) in self.reported(results) {
            for issue in issues {
                output.push_str(&format!("::warning file={}::{}\n", path, issue.message));
            }
        }
        output
    }

    fn render_summary(&self) -> String {
        format!(
            "::warning::More than {} errors found, please check Build log\n",
            self.threshold
        )
    }

    fn render_verbose(&self, results: &ValidationResults) -> String {
        let mut output = String::new();
        for (path, issues) in self.reported(results) {
            if issues.is_empty() {
                continue;
            }
            output.push_str(&self.colorize(&format!("[ERRORS] for file {}", path), "31"));
            output.push('\n');
            for issue in issues {
                let line = format!("{}\t{}", issue.id, issue.message);
                output.push_str(&self.colorize(&line, "1;31"));
                output.push('\n');
            }
        }
        output
    }

    fn render_json(&self, results: &ValidationResults) -> Result<String> {
        let report = JsonReport {
            generated_at: Utc::now(),
            mode: self.mode(results),
            documents_checked: results.documents_checked(),
            total_issues: results.total_issues(),
            documents: self.reported(results).collect(),
            failures: results
                .failures
                .iter()
                .filter(|(path, _)| !self.is_suppressed(path))
                .map(|(path, failure)| (path.as_str(), failure.to_string()))
                .collect(),
        };
        let mut json = serde_json::to_string_pretty(&report)?;
        json.push('\n');
        Ok(json)
    }

    /// Write the report to stdout
    pub fn report(&self, results: &ValidationResults) -> Result<()> {
        let suppressed = self.suppressed_issues(results);
        if suppressed > 0 {
            tracing::warn!(
                entry = self.entry_document.as_deref().unwrap_or_default(),
                suppressed,
                "entry document issues not reported; see --include-entry-document"
            );
        }

        print!("{}", self.render(results)?);
        Ok(())
    }
}
