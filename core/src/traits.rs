//! Core traits for the rapids dataset engine
//!
//! This module defines the fundamental abstractions: the `Partition` and
//! `Dataset` traits, the shared per-partition bookkeeping, and the error
//! types used across the crate.

use std::fmt::Debug;
use std::sync::Arc;
use thiserror::Error;

use crate::cache::Elements;
use crate::context::ExecutionContext;

/// Unique identifier of a dataset within one execution context.
pub type DatasetId = u32;

/// Unique identifier of a partition within one execution context.
pub type PartitionId = u32;

/// Error types for dataset operations
#[derive(Error, Debug, Clone)]
pub enum DatasetError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("task failed: {0}")]
    TaskFailed(String),
}

/// Result type for dataset operations
pub type DatasetResult<T> = Result<T, DatasetError>;

/// A data type that can flow through a dataset pipeline.
///
/// Elements are cloned out of shared caches and moved between worker
/// threads, hence the `Clone + Send + Sync` requirements.
pub trait Data: Send + Sync + Clone + Debug + 'static {}
impl<T> Data for T where T: Send + Sync + Clone + Debug + 'static {}

/// What a partition's element sequence supports.
///
/// Sources backed by indexable storage report `RandomAccess` and expose an
/// exact `size()`; lazy transforms such as filter degrade to `Forward`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IterKind {
    Forward,
    RandomAccess,
}

/// Identity and lineage state shared by every partition implementation.
///
/// Constructing a `PartitionBase` allocates a fresh partition id from the
/// execution context. Dependency edges are single-assignment: they are
/// recorded here and in the context's reverse index while the owning
/// partition is being built, and never change afterwards.
#[derive(Clone)]
pub struct PartitionBase {
    context: Arc<ExecutionContext>,
    id: PartitionId,
    dependencies: Vec<PartitionId>,
}

impl PartitionBase {
    /// Creates a base with a fresh partition id and no dependencies.
    pub fn new(context: &Arc<ExecutionContext>) -> Self {
        Self {
            context: Arc::clone(context),
            id: context.next_partition_id(),
            dependencies: Vec::new(),
        }
    }

    /// Convenience constructor for the common one-parent case.
    pub fn with_parent(context: &Arc<ExecutionContext>, parent: PartitionId) -> Self {
        let mut base = Self::new(context);
        base.add_dependency(parent);
        base
    }

    /// Records `parent` as a dependency of this partition, both locally and
    /// in the context's reverse index used for cache arbitration.
    pub fn add_dependency(&mut self, parent: PartitionId) {
        self.context.mark_dependency(parent, self.id);
        self.dependencies.push(parent);
    }

    pub fn id(&self) -> PartitionId {
        self.id
    }

    pub fn dependencies(&self) -> &[PartitionId] {
        &self.dependencies
    }

    pub fn context(&self) -> &Arc<ExecutionContext> {
        &self.context
    }
}

impl Debug for PartitionBase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PartitionBase")
            .field("id", &self.id)
            .field("dependencies", &self.dependencies)
            .finish()
    }
}

/// A lazy, finite, re-iterable sequence of elements with an identity and a
/// dependency list.
///
/// `compute` is the raw lineage computation; calling it again yields an
/// equivalent sequence. `iter` is the entry point consumers should use: it
/// consults the execution context's cache first and is the only place where
/// partitions synchronize internally.
pub trait Partition: Clone + Send + Sync + 'static {
    type Item: Data;
    type Iter: Iterator<Item = Self::Item>;

    /// The identity and lineage state of this partition.
    fn base(&self) -> &PartitionBase;

    /// Produces the element sequence from the parent partitions.
    fn compute(&self) -> Self::Iter;

    fn id(&self) -> PartitionId {
        self.base().id()
    }

    fn dependencies(&self) -> &[PartitionId] {
        self.base().dependencies()
    }

    fn context(&self) -> &Arc<ExecutionContext> {
        self.base().context()
    }

    /// Exact element count, when the partition knows it without iterating.
    fn size(&self) -> Option<usize> {
        None
    }

    fn kind(&self) -> IterKind {
        IterKind::Forward
    }

    /// Cache-aware iteration: reads the memoized elements if this partition
    /// is shared, materializing them first if necessary.
    fn iter(&self) -> Elements<Self::Iter> {
        self.context().partition_stream(self.id(), || self.compute())
    }
}

/// An ordered collection of partitions representing one logical collection.
///
/// Datasets are values: cloning one is shallow and preserves partition
/// identities. Deriving a new dataset (map, filter, ...) allocates fresh
/// ids and explicit dependency edges instead.
pub trait Dataset: Clone {
    type Item: Data;
    type Part: Partition<Item = Self::Item>;

    fn id(&self) -> DatasetId;

    fn context(&self) -> &Arc<ExecutionContext>;

    /// The partitions of this dataset, in index order.
    fn partitions(&self) -> &[Self::Part];

    fn num_partitions(&self) -> usize {
        self.partitions().len()
    }
}
