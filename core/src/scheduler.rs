//! Task scheduling
//!
//! Actions hand one task per partition to a `TaskRunner`, which either runs
//! them inline (sequential policy) or fans them out to a pluggable
//! `TaskExecutor`. The bundled executor is a rayon thread pool sized to the
//! configured degree of parallelism.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{mpsc, Arc, Mutex};
use tracing::debug;

use crate::config::ParallelPolicy;
use crate::traits::{DatasetError, DatasetResult};

/// A fire-and-forget task sink.
///
/// Implementations must run every submitted task exactly once, on some
/// thread, without blocking `submit` indefinitely. Completion and error
/// propagation are layered on top by the runner.
pub trait TaskExecutor: Send + Sync {
    fn submit(&self, task: Box<dyn FnOnce() + Send>);
}

/// The bundled executor: a dedicated rayon thread pool.
pub struct RayonExecutor {
    pool: rayon::ThreadPool,
}

impl RayonExecutor {
    pub fn new(threads: usize) -> DatasetResult<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("rapids-worker-{i}"))
            .build()
            .map_err(|e| DatasetError::Config(format!("failed to build worker pool: {e}")))?;
        Ok(Self { pool })
    }
}

impl TaskExecutor for RayonExecutor {
    fn submit(&self, task: Box<dyn FnOnce() + Send>) {
        self.pool.spawn(task);
    }
}

/// Dispatches per-partition tasks and gathers their results in submission
/// order.
pub(crate) struct TaskRunner {
    policy: ParallelPolicy,
    width: usize,
    // Built on first threaded action so that purely sequential contexts
    // never spin up a pool.
    executor: Mutex<Option<Arc<dyn TaskExecutor>>>,
}

impl TaskRunner {
    pub(crate) fn new(policy: ParallelPolicy, width: usize) -> Self {
        Self {
            policy,
            width,
            executor: Mutex::new(None),
        }
    }

    pub(crate) fn with_executor(
        policy: ParallelPolicy,
        width: usize,
        executor: Arc<dyn TaskExecutor>,
    ) -> Self {
        Self {
            policy,
            width,
            executor: Mutex::new(Some(executor)),
        }
    }

    fn executor(&self) -> DatasetResult<Arc<dyn TaskExecutor>> {
        let mut slot = self.executor.lock().unwrap();
        if let Some(executor) = slot.as_ref() {
            return Ok(Arc::clone(executor));
        }
        debug!(threads = self.width, "starting worker pool");
        let built: Arc<dyn TaskExecutor> = Arc::new(RayonExecutor::new(self.width)?);
        *slot = Some(Arc::clone(&built));
        Ok(built)
    }

    /// Runs `tasks` under the configured policy and returns their results
    /// in task order.
    ///
    /// A panicking task is reported as `TaskFailed`; the remaining tasks
    /// still run to completion and their results are discarded.
    pub(crate) fn run<T, F>(&self, tasks: Vec<F>) -> DatasetResult<Vec<T>>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        match self.policy {
            ParallelPolicy::Sequential => {
                let mut results = Vec::with_capacity(tasks.len());
                let mut first_error = None;
                for task in tasks {
                    match catch_unwind(AssertUnwindSafe(task)) {
                        Ok(value) => results.push(value),
                        Err(payload) => {
                            let _ = first_error
                                .get_or_insert(DatasetError::TaskFailed(panic_message(payload.as_ref())));
                        }
                    }
                }
                match first_error {
                    Some(error) => Err(error),
                    None => Ok(results),
                }
            }
            ParallelPolicy::Threaded => {
                let executor = self.executor()?;
                let mut completions = Vec::with_capacity(tasks.len());
                for task in tasks {
                    let (sender, receiver) = mpsc::channel();
                    executor.submit(Box::new(move || {
                        let result = catch_unwind(AssertUnwindSafe(task))
                            .map_err(|payload| panic_message(payload.as_ref()));
                        let _ = sender.send(result);
                    }));
                    completions.push(receiver);
                }

                let mut results = Vec::with_capacity(completions.len());
                let mut first_error = None;
                for receiver in completions {
                    match receiver.recv() {
                        Ok(Ok(value)) => results.push(value),
                        Ok(Err(message)) => {
                            let _ = first_error.get_or_insert(DatasetError::TaskFailed(message));
                        }
                        Err(_) => {
                            let _ = first_error.get_or_insert(DatasetError::TaskFailed(
                                "executor dropped the task".to_string(),
                            ));
                        }
                    }
                }
                match first_error {
                    Some(error) => Err(error),
                    None => Ok(results),
                }
            }
        }
    }
}

/// Best-effort extraction of a panic payload's message.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "task panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn squares(n: usize) -> Vec<impl FnOnce() -> usize + Send + 'static> {
        (0..n).map(|i| move || i * i).collect()
    }

    #[test]
    fn test_sequential_preserves_order() {
        let runner = TaskRunner::new(ParallelPolicy::Sequential, 1);
        let results = runner.run(squares(5)).unwrap();
        assert_eq!(results, vec![0, 1, 4, 9, 16]);
    }

    #[test]
    fn test_threaded_preserves_order() {
        let runner = TaskRunner::new(ParallelPolicy::Threaded, 4);
        let results = runner.run(squares(32)).unwrap();
        let expected: Vec<usize> = (0..32).map(|i| i * i).collect();
        assert_eq!(results, expected);
    }

    #[test]
    fn test_panic_becomes_task_failed() {
        let runner = TaskRunner::new(ParallelPolicy::Threaded, 2);
        let tasks: Vec<Box<dyn FnOnce() -> usize + Send>> = vec![
            Box::new(|| 1),
            Box::new(|| panic!("bad element")),
            Box::new(|| 3),
        ];
        let error = runner.run(tasks).unwrap_err();
        match error {
            DatasetError::TaskFailed(message) => assert!(message.contains("bad element")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_custom_executor_is_used() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        struct CountingExecutor(AtomicUsize);
        impl TaskExecutor for CountingExecutor {
            fn submit(&self, task: Box<dyn FnOnce() + Send>) {
                self.0.fetch_add(1, Ordering::SeqCst);
                task();
            }
        }

        let executor = Arc::new(CountingExecutor(AtomicUsize::new(0)));
        let runner = TaskRunner::with_executor(
            ParallelPolicy::Threaded,
            2,
            Arc::clone(&executor) as Arc<dyn TaskExecutor>,
        );
        let results = runner.run(squares(3)).unwrap();
        assert_eq!(results, vec![0, 1, 4]);
        assert_eq!(executor.0.load(Ordering::SeqCst), 3);
    }
}
