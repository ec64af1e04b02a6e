//! Shared result map written by pool workers.

use std::collections::BTreeMap;
use std::time::Duration;

use parking_lot::Mutex;
use thiserror::Error;

use crate::error::LoadError;
use crate::extension::Issue;

/// Why a document's task did not produce validator output
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskFailure {
    #[error("{0}")]
    Load(LoadError),

    #[error("not started: validation run was cancelled")]
    Cancelled,

    #[error("validation timed out after {after:?}")]
    TimedOut { after: Duration },

    #[error("validation task panicked: {details}")]
    Panicked { details: String },
}

impl TaskFailure {
    /// Issue id under which this failure is reported
    pub fn issue_id(&self) -> &'static str {
        match self {
            TaskFailure::Load(_) => "LOAD_ERROR",
            TaskFailure::Cancelled => "TASK_CANCELLED",
            TaskFailure::TimedOut { .. } => "TASK_TIMEOUT",
            TaskFailure::Panicked { .. } => "TASK_PANIC",
        }
    }

    pub fn to_issue(&self) -> Issue {
        Issue::new(self.issue_id(), self.to_string())
    }
}

impl From<LoadError> for TaskFailure {
    fn from(err: LoadError) -> Self {
        TaskFailure::Load(err)
    }
}

/// Aggregated outcome of a validation run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationResults {
    /// Issues per document path; every checked path has exactly one entry
    pub documents: BTreeMap<String, Vec<Issue>>,
    /// Paths whose task failed, also present in `documents`
    pub failures: BTreeMap<String, TaskFailure>,
}

impl ValidationResults {
    pub fn documents_checked(&self) -> usize {
        self.documents.len()
    }

    pub fn total_issues(&self) -> usize {
        self.documents.values().map(Vec::len).sum()
    }

    pub fn has_issues(&self) -> bool {
        self.total_issues() > 0
    }

    pub fn issues(&self, path: &str) -> Option<&[Issue]> {
        self.documents.get(path).map(Vec::as_slice)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.documents.contains_key(path)
    }
}

/// Mutex-protected result map.
///
/// The lock is held for a single insertion only, never across loading or
/// validation.
#[derive(Debug, Default)]
pub struct ResultAggregator {
    inner: Mutex<ValidationResults>,
}

impl ResultAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the full issue list for `path`
    pub fn record(&self, path: impl Into<String>, issues: Vec<Issue>) {
        let path = path.into();
        let mut results = self.inner.lock();
        if results.documents.insert(path.clone(), issues).is_some() {
            tracing::warn!(path, "result recorded twice; keeping the latest");
        }
    }

    /// Record a failed task. The failure is also stored as the path's issue
    /// list so it shows up in the report.
    pub fn record_failure(&self, path: impl Into<String>, failure: TaskFailure) {
        let path = path.into();
        tracing::warn!(path, error = %failure, "document task failed");
        let issue = failure.to_issue();
        let mut results = self.inner.lock();
        results.documents.insert(path.clone(), vec![issue]);
        results.failures.insert(path, failure);
    }

    pub fn len(&self) -> usize {
        self.inner.lock().documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of the current map
    pub fn snapshot(&self) -> ValidationResults {
        self.inner.lock().clone()
    }

    pub fn into_results(self) -> ValidationResults {
        self.inner.into_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_record_and_snapshot() {
        let aggregator = ResultAggregator::new();
        aggregator.record("foo", vec![Issue::new("E1", "bad link")]);
        aggregator.record("bar", vec![]);

        let results = aggregator.snapshot();
        assert_eq!(results.documents_checked(), 2);
        assert_eq!(results.total_issues(), 1);
        assert_eq!(results.issues("foo").unwrap()[0].message, "bad link");
        assert!(results.issues("bar").unwrap().is_empty());
        assert!(results.failures.is_empty());
    }

    #[test]
    fn test_record_failure_is_visible() {
        let aggregator = ResultAggregator::new();
        aggregator.record_failure(
            "gone.adoc",
            LoadError::NotFound {
                path: "gone.adoc".to_string(),
            }
            .into(),
        );

        let results = aggregator.into_results();
        let issues = results.issues("gone.adoc").unwrap();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].id, "LOAD_ERROR");
        assert!(issues[0].message.contains("gone.adoc"));
        assert!(matches!(
            results.failures.get("gone.adoc"),
            Some(TaskFailure::Load(_))
        ));
    }

    #[test]
    fn test_concurrent_writers_lose_nothing() {
        let aggregator = Arc::new(ResultAggregator::new());

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let aggregator = Arc::clone(&aggregator);
                std::thread::spawn(move || {
                    for i in 0..250 {
                        let issues = (0..(i % 4)).map(|n| Issue::new("E", n.to_string())).collect();
                        aggregator.record(format!("t{}/doc{}", t, i), issues);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let results = aggregator.snapshot();
        assert_eq!(results.documents_checked(), 2000);
        for (path, issues) in &results.documents {
            let i: usize = path.rsplit("doc").next().unwrap().parse().unwrap();
            assert_eq!(issues.len(), i % 4);
        }
    }

    #[test]
    fn test_failure_issue_ids() {
        assert_eq!(TaskFailure::Cancelled.issue_id(), "TASK_CANCELLED");
        assert_eq!(
            TaskFailure::TimedOut {
                after: Duration::from_secs(1)
            }
            .to_issue()
            .id,
            "TASK_TIMEOUT"
        );
        assert_eq!(
            TaskFailure::Panicked {
                details: "x".to_string()
            }
            .issue_id(),
            "TASK_PANIC"
        );
    }
}
