//! Execution context
//!
//! The execution context is the shared world for a family of datasets: it
//! issues dataset and partition identities, tracks which partitions are
//! consumed by multiple children, owns the partition cache, and dispatches
//! action tasks. Every dataset and partition holds an `Arc` to its context,
//! so the context always outlives the pipelines built on it.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, RwLock, Weak};
use tracing::debug;

use crate::cache::{CacheManager, Elements};
use crate::config::Config;
use crate::dataset::{RangeDataset, RangeNum, VecDataset};
use crate::scheduler::{TaskExecutor, TaskRunner};
use crate::traits::{Data, DatasetId, PartitionId};

pub struct ExecutionContext {
    handle: Weak<ExecutionContext>,
    config: Config,
    next_dataset_id: AtomicU32,
    next_partition_id: AtomicU32,
    // Reverse dependency index: which child partitions consume each
    // partition. A partition with two or more distinct children is cached.
    dependents: RwLock<HashMap<PartitionId, HashSet<PartitionId>>>,
    cache: CacheManager,
    runner: TaskRunner,
}

impl ExecutionContext {
    /// Creates a context with the bundled rayon executor.
    pub fn new(config: Config) -> Arc<Self> {
        Self::build(config, None)
    }

    /// Creates a context that dispatches threaded tasks to `executor`.
    pub fn with_executor(config: Config, executor: Arc<dyn TaskExecutor>) -> Arc<Self> {
        Self::build(config, Some(executor))
    }

    fn build(config: Config, executor: Option<Arc<dyn TaskExecutor>>) -> Arc<Self> {
        debug!(
            name = %config.debug_name(),
            tasks = config.parallel_task_num(),
            "created execution context"
        );
        let runner = match executor {
            Some(executor) => TaskRunner::with_executor(
                config.parallel_policy(),
                config.parallel_task_num(),
                executor,
            ),
            None => TaskRunner::new(config.parallel_policy(), config.parallel_task_num()),
        };
        Arc::new_cyclic(|handle| ExecutionContext {
            handle: handle.clone(),
            config,
            next_dataset_id: AtomicU32::new(0),
            next_partition_id: AtomicU32::new(0),
            dependents: RwLock::new(HashMap::new()),
            cache: CacheManager::new(),
            runner,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn handle(&self) -> Arc<ExecutionContext> {
        // The Weak is installed by new_cyclic and upgrades for as long as
        // any Arc to this context exists, which includes `self`.
        self.handle.upgrade().expect("execution context handle")
    }

    /// Returns the next unique dataset id.
    pub(crate) fn next_dataset_id(&self) -> DatasetId {
        let id = self.next_dataset_id.fetch_add(1, Ordering::Relaxed);
        assert!(id != DatasetId::MAX, "dataset id counter overflowed");
        id
    }

    /// Returns the next unique partition id.
    pub(crate) fn next_partition_id(&self) -> PartitionId {
        let id = self.next_partition_id.fetch_add(1, Ordering::Relaxed);
        assert!(id != PartitionId::MAX, "partition id counter overflowed");
        id
    }

    /// Records that `child` consumes `parent`.
    pub(crate) fn mark_dependency(&self, parent: PartitionId, child: PartitionId) {
        self.dependents
            .write()
            .unwrap()
            .entry(parent)
            .or_default()
            .insert(child);
    }

    /// A partition is worth caching once at least two distinct children
    /// consume it.
    pub fn should_cache(&self, partition: PartitionId) -> bool {
        self.dependents
            .read()
            .unwrap()
            .get(&partition)
            .is_some_and(|children| children.len() >= 2)
    }

    /// Whether a materialization for `partition` has completed.
    pub fn is_cached(&self, partition: PartitionId) -> bool {
        self.cache.is_done(partition)
    }

    /// The cache-aware element stream for one partition: shared partitions
    /// read (and on first demand, populate) the memoized vector; private
    /// partitions compute directly.
    pub(crate) fn partition_stream<I>(
        &self,
        id: PartitionId,
        compute: impl FnOnce() -> I,
    ) -> Elements<I>
    where
        I: Iterator,
        I::Item: Data,
    {
        if !self.should_cache(id) {
            return Elements::Direct(compute());
        }
        let data = self.cache.get_or_materialize(id, || compute().collect());
        Elements::Cached { data, pos: 0 }
    }

    pub(crate) fn runner(&self) -> &TaskRunner {
        &self.runner
    }

    /// Creates a dataset that lazily applies `f` to every number in
    /// `[begin, end)`, split into `parallel_task_num` partitions.
    pub fn range<N, T, F>(&self, begin: N, end: N, f: F) -> RangeDataset<N, T, F>
    where
        N: RangeNum,
        T: Data,
        F: Fn(N) -> T + Send + Sync + 'static,
    {
        RangeDataset::new(&self.handle(), begin, end, f)
    }

    /// Creates a dataset over an existing sequence, split into
    /// `parallel_task_num` partitions.
    pub fn from_vec<T: Data>(&self, data: Vec<T>) -> VecDataset<T> {
        let partitions = self.config.parallel_task_num();
        VecDataset::new(&self.handle(), data, partitions)
    }

    /// Like `from_vec`, with an explicit partition count (zero means one).
    pub fn from_vec_with_partitions<T: Data>(
        &self,
        data: Vec<T>,
        num_partitions: usize,
    ) -> VecDataset<T> {
        VecDataset::new(&self.handle(), data, num_partitions)
    }

    /// Alias for `from_vec`.
    pub fn parallelize<T: Data>(&self, data: Vec<T>) -> VecDataset<T> {
        self.from_vec(data)
    }
}
