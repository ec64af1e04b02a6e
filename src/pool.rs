//! Bounded-concurrency task pool for document validation.
//!
//! `submit_all` queues the paths and starts at most `size` workers that
//! drain the queue one document at a time. A semaphore shared by every batch
//! keeps the number of documents in flight at `size` even when batches
//! overlap. Each document records exactly one result (or failure) in the
//! pool's [`ResultAggregator`].

use std::collections::{HashSet, VecDeque};
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures::FutureExt;
use parking_lot::Mutex;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::Instant;

use crate::aggregator::{ResultAggregator, TaskFailure, ValidationResults};
use crate::error::{ConfigError, ConfigResult};
use crate::extension::{Issue, panic_message};
use crate::includes::ExcludeFilter;

/// Default concurrency limit; amortises file I/O latency
pub const DEFAULT_POOL_SIZE: usize = 32;

/// Upper bound accepted for the concurrency limit
pub const MAX_POOL_SIZE: usize = 1000;

/// Check a concurrency limit against `1..=MAX_POOL_SIZE`
pub fn validate_pool_size(size: usize) -> ConfigResult<()> {
    if size == 0 {
        return Err(ConfigError::Validation(
            "Concurrency must be greater than 0".to_string(),
        ));
    }
    if size > MAX_POOL_SIZE {
        return Err(ConfigError::Validation(format!(
            "Concurrency cannot exceed {}",
            MAX_POOL_SIZE
        )));
    }
    Ok(())
}

/// Cooperative cancellation flag shared by the pool and its callers
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Pool options
#[derive(Debug, Clone)]
pub struct PoolOptions {
    pub size: usize,
    /// Per-document timeout
    pub task_timeout: Option<Duration>,
    /// No document is started after this instant
    pub deadline: Option<Instant>,
    pub cancel: CancelToken,
    pub exclude: ExcludeFilter,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self {
            size: DEFAULT_POOL_SIZE,
            task_timeout: None,
            deadline: None,
            cancel: CancelToken::new(),
            exclude: ExcludeFilter::partials(),
        }
    }
}

/// Counters for one pool run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    pub submitted: usize,
    pub excluded: usize,
    pub duplicates: usize,
    /// Workers started across all batches
    pub workers: usize,
}

pub struct TaskPool {
    options: PoolOptions,
    semaphore: Arc<Semaphore>,
    aggregator: Arc<ResultAggregator>,
    workers: JoinSet<()>,
    seen: HashSet<String>,
    stats: PoolStats,
}

impl TaskPool {
    pub fn new(options: PoolOptions) -> ConfigResult<Self> {
        validate_pool_size(options.size)?;

        Ok(Self {
            semaphore: Arc::new(Semaphore::new(options.size)),
            options,
            aggregator: Arc::new(ResultAggregator::new()),
            workers: JoinSet::new(),
            seen: HashSet::new(),
            stats: PoolStats::default(),
        })
    }

    pub fn size(&self) -> usize {
        self.options.size
    }

    pub fn stats(&self) -> PoolStats {
        self.stats
    }

    /// Queue the paths and start workers for them. Excluded and
    /// already-submitted paths are skipped.
    ///
    /// `job` validates a single document; its `Err` is recorded as that
    /// path's failure.
    pub fn submit_all<I, S, F, Fut>(&mut self, paths: I, job: F)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: Fn(String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Vec<Issue>, TaskFailure>> + Send + 'static,
    {
        let mut queue = VecDeque::new();
        for path in paths {
            let path = path.into();
            if self.options.exclude.is_excluded(&path) {
                tracing::debug!(path, "skipping partial document");
                self.stats.excluded += 1;
                continue;
            }
            if !self.seen.insert(path.clone()) {
                self.stats.duplicates += 1;
                continue;
            }
            self.stats.submitted += 1;
            queue.push_back(path);
        }

        let count = self.options.size.min(queue.len());
        let queue = Arc::new(Mutex::new(queue));
        let job = Arc::new(job);

        for _ in 0..count {
            let worker = Worker {
                job: Arc::clone(&job),
                queue: Arc::clone(&queue),
                semaphore: Arc::clone(&self.semaphore),
                aggregator: Arc::clone(&self.aggregator),
                cancel: self.options.cancel.clone(),
                deadline: self.options.deadline,
                timeout: self.options.task_timeout,
            };
            self.workers.spawn(worker.run());
        }
        self.stats.workers += count;
    }

    /// Wait for every worker to drain its queue and hand back the result map
    pub async fn await_completion(mut self) -> ValidationResults {
        while let Some(joined) = self.workers.join_next().await {
            if let Err(e) = joined {
                // Panics are caught per document; this only covers aborts.
                tracing::error!(error = %e, "validation worker did not complete");
            }
        }

        match Arc::try_unwrap(self.aggregator) {
            Ok(aggregator) => aggregator.into_results(),
            Err(shared) => shared.snapshot(),
        }
    }
}

/// One worker draining a batch queue
struct Worker<F> {
    job: Arc<F>,
    queue: Arc<Mutex<VecDeque<String>>>,
    semaphore: Arc<Semaphore>,
    aggregator: Arc<ResultAggregator>,
    cancel: CancelToken,
    deadline: Option<Instant>,
    timeout: Option<Duration>,
}

impl<F, Fut> Worker<F>
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Vec<Issue>, TaskFailure>> + Send + 'static,
{
    async fn run(self) {
        loop {
            let next = self.queue.lock().pop_front();
            let Some(path) = next else {
                break;
            };

            // Acquire semaphore permit to limit concurrency across batches
            let _permit = match self.semaphore.acquire().await {
                Ok(permit) => permit,
                Err(_) => {
                    self.aggregator.record_failure(path, TaskFailure::Cancelled);
                    continue;
                }
            };
            self.process(path).await;
        }
    }

    async fn process(&self, path: String) {
        let past_deadline = self.deadline.is_some_and(|d| Instant::now() >= d);
        if self.cancel.is_cancelled() || past_deadline {
            self.aggregator.record_failure(path, TaskFailure::Cancelled);
            return;
        }

        let run = AssertUnwindSafe((self.job)(path.clone())).catch_unwind();
        let outcome = match self.timeout {
            Some(after) => match tokio::time::timeout(after, run).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    self.aggregator
                        .record_failure(path, TaskFailure::TimedOut { after });
                    return;
                }
            },
            None => run.await,
        };

        match outcome {
            Ok(Ok(issues)) => self.aggregator.record(path, issues),
            Ok(Err(failure)) => self.aggregator.record_failure(path, failure),
            Err(payload) => self.aggregator.record_failure(
                path,
                TaskFailure::Panicked {
                    details: panic_message(payload.as_ref()),
                },
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn options(size: usize) -> PoolOptions {
        PoolOptions {
            size,
            ..PoolOptions::default()
        }
    }

    #[test]
    fn test_pool_size_validation() {
        assert!(validate_pool_size(1).is_ok());
        assert!(validate_pool_size(MAX_POOL_SIZE).is_ok());
        assert!(matches!(validate_pool_size(0), Err(ConfigError::Validation(_))));
        assert!(TaskPool::new(options(0)).is_err());
        assert!(TaskPool::new(options(MAX_POOL_SIZE + 1)).is_err());
        assert_eq!(TaskPool::new(options(4)).unwrap().size(), 4);
    }

    #[tokio::test]
    async fn test_fixed_number_of_workers() {
        let mut pool = TaskPool::new(options(3)).unwrap();
        pool.submit_all((0..50).map(|i| format!("doc{}", i)), |_path| async {
            Ok(vec![])
        });
        assert_eq!(pool.stats().workers, 3);

        pool.submit_all(["late"], |_path| async { Ok(vec![]) });
        assert_eq!(pool.stats().workers, 4);

        let results = pool.await_completion().await;
        assert_eq!(results.documents_checked(), 51);
    }

    #[tokio::test]
    async fn test_overlapping_batches_share_the_bound() {
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let mut pool = TaskPool::new(options(2)).unwrap();

        for batch in 0..3 {
            let (a, p) = (Arc::clone(&active), Arc::clone(&peak));
            pool.submit_all(
                (0..4).map(move |i| format!("b{}/doc{}", batch, i)),
                move |_path| {
                    let (active, peak) = (Arc::clone(&a), Arc::clone(&p));
                    async move {
                        let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                        peak.fetch_max(now, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(5)).await;
                        active.fetch_sub(1, Ordering::SeqCst);
                        Ok(vec![])
                    }
                },
            );
        }

        let results = pool.await_completion().await;
        assert_eq!(results.documents_checked(), 12);
        assert!(peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrency_is_bounded() {
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut pool = TaskPool::new(options(3)).unwrap();
        let (a, p) = (Arc::clone(&active), Arc::clone(&peak));
        pool.submit_all((0..20).map(|i| format!("doc{}", i)), move |_path| {
            let (active, peak) = (Arc::clone(&a), Arc::clone(&p));
            async move {
                let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(10)).await;
                active.fetch_sub(1, Ordering::SeqCst);
                Ok(vec![])
            }
        });

        let results = pool.await_completion().await;
        assert_eq!(results.documents_checked(), 20);
        assert!(peak.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn test_excluded_and_duplicate_paths_skipped() {
        let mut pool = TaskPool::new(options(2)).unwrap();
        pool.submit_all(["foo", "include/baz", "foo", "bar"], |_path| async {
            Ok(vec![])
        });
        assert_eq!(
            pool.stats(),
            PoolStats {
                submitted: 2,
                excluded: 1,
                duplicates: 1,
                workers: 2,
            }
        );

        let results = pool.await_completion().await;
        let keys: Vec<&str> = results.documents.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["bar", "foo"]);
    }

    #[tokio::test]
    async fn test_job_failure_and_panic_recorded() {
        let mut pool = TaskPool::new(options(2)).unwrap();
        pool.submit_all(["ok", "fails", "panics"], |path| async move {
            match path.as_str() {
                "fails" => Err(TaskFailure::Cancelled),
                "panics" => panic!("boom"),
                _ => Ok(vec![Issue::new("E1", "found")]),
            }
        });

        let results = pool.await_completion().await;
        assert_eq!(results.documents_checked(), 3);
        assert_eq!(results.issues("ok").unwrap()[0].id, "E1");
        assert_eq!(results.issues("fails").unwrap()[0].id, "TASK_CANCELLED");
        assert!(matches!(
            results.failures.get("panics"),
            Some(TaskFailure::Panicked { details }) if details == "boom"
        ));
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let mut pool = TaskPool::new(PoolOptions {
            size: 1,
            cancel,
            ..PoolOptions::default()
        })
        .unwrap();

        let runs = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&runs);
        pool.submit_all(["a", "b"], move |_path| {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Ok(vec![]) }
        });

        let results = pool.await_completion().await;
        assert_eq!(runs.load(Ordering::SeqCst), 0);
        assert_eq!(results.failures.len(), 2);
        assert_eq!(results.issues("a").unwrap()[0].id, "TASK_CANCELLED");
    }

    #[tokio::test]
    async fn test_task_timeout() {
        let mut pool = TaskPool::new(PoolOptions {
            size: 1,
            task_timeout: Some(Duration::from_millis(10)),
            ..PoolOptions::default()
        })
        .unwrap();

        pool.submit_all(["slow"], |_path| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(vec![])
        });

        let results = pool.await_completion().await;
        assert!(matches!(
            results.failures.get("slow"),
            Some(TaskFailure::TimedOut { .. })
        ));
    }

    #[tokio::test]
    async fn test_past_deadline_starts_nothing() {
        let mut pool = TaskPool::new(PoolOptions {
            size: 4,
            deadline: Some(Instant::now()),
            ..PoolOptions::default()
        })
        .unwrap();

        pool.submit_all(["a", "b", "c"], |_path| async { Ok(vec![]) });

        let results = pool.await_completion().await;
        assert_eq!(results.documents_checked(), 3);
        assert_eq!(results.failures.len(), 3);
    }
}
