//! Configuration for execution contexts
//!
//! A `Config` is a plain value that is handed to `ExecutionContext::new`.
//! Setters follow the builder style so configs can be assembled inline.

use serde::{Deserialize, Serialize};
use std::thread;

/// How actions dispatch their per-partition tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParallelPolicy {
    /// Run every task on the calling thread, in partition order.
    Sequential,
    /// Submit tasks to the task executor.
    Threaded,
}

/// Configuration recognized by the execution context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    debug_name: String,
    parallel_task_num: usize,
    parallel_policy: ParallelPolicy,
    sample_seed: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            debug_name: String::new(),
            parallel_task_num: default_parallelism(),
            parallel_policy: ParallelPolicy::Threaded,
            sample_seed: None,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tag included in log records emitted for this context.
    pub fn debug_name(&self) -> &str {
        &self.debug_name
    }

    /// Degree of parallelism: the partition count of source datasets and
    /// the width of the bundled executor. Always at least 1.
    pub fn parallel_task_num(&self) -> usize {
        self.parallel_task_num
    }

    pub fn parallel_policy(&self) -> ParallelPolicy {
        self.parallel_policy
    }

    /// Seed that makes `sample` reproducible; `None` samples from entropy.
    pub fn sample_seed(&self) -> Option<u64> {
        self.sample_seed
    }

    pub fn with_debug_name(mut self, name: impl Into<String>) -> Self {
        self.debug_name = name.into();
        self
    }

    /// Sets the degree of parallelism. Zero means "detect": the number of
    /// hardware threads, or 8 if that cannot be determined.
    pub fn with_parallel_task_num(mut self, num: usize) -> Self {
        self.parallel_task_num = if num == 0 { default_parallelism() } else { num };
        self
    }

    pub fn with_parallel_policy(mut self, policy: ParallelPolicy) -> Self {
        self.parallel_policy = policy;
        self
    }

    pub fn with_sample_seed(mut self, seed: u64) -> Self {
        self.sample_seed = Some(seed);
        self
    }
}

fn default_parallelism() -> usize {
    thread::available_parallelism().map(|n| n.get()).unwrap_or(8)
}
