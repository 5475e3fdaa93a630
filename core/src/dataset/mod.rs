//! Dataset implementations
//!
//! One module per operator, plus the combinator traits that chain them and
//! the actions that run them.

pub mod actions;
pub mod filter;
pub mod flat_map;
pub mod group_by_key;
pub mod map;
pub mod merge;
pub mod partition_by;
pub mod range;
pub mod sample;
pub mod union;
pub mod vec;
pub mod zip;

pub use actions::DatasetActions;
pub use filter::{FilterDataset, FilterPartition};
pub use flat_map::{FlatMapDataset, FlatMapPartition};
pub use group_by_key::{GroupByKeyDataset, GroupByKeyPartition};
pub use map::{MapDataset, MapPartition};
pub use merge::{MergeDataset, MergePartition};
pub use partition_by::{PartitionByDataset, PartitionByPartition};
pub use range::{RangeDataset, RangeNum, RangePartition};
pub use sample::{SampleDataset, SamplePartition};
pub use union::{UnionDataset, UnionPartition};
pub use vec::{VecDataset, VecPartition};
pub use zip::{ZipDataset, ZipPartition};

use std::hash::Hash;

use crate::partitioner::{HashPartitioner, Partitioner};
use crate::traits::{Data, Dataset, DatasetResult};

/// Transformation combinators available on every dataset.
///
/// Transformations are lazy: they only record lineage, and the supplied
/// functions run later on worker threads (potentially concurrently), so
/// they must be `Send + Sync`.
pub trait DatasetExt: Dataset + Sized {
    /// Transforms every element with `f`.
    fn map<B, F>(&self, f: F) -> MapDataset<Self::Part, B, F>
    where
        B: Data,
        F: Fn(Self::Item) -> B + Send + Sync + 'static,
    {
        MapDataset::new(self, f)
    }

    /// Keeps the elements for which `predicate` holds.
    fn filter<F>(&self, predicate: F) -> FilterDataset<Self::Part, F>
    where
        F: Fn(&Self::Item) -> bool + Send + Sync + 'static,
    {
        FilterDataset::new(self, predicate)
    }

    /// Expands every element into a sub-sequence and flattens the result.
    fn flat_map<U, F>(&self, f: F) -> FlatMapDataset<Self::Part, U, F>
    where
        U: IntoIterator + 'static,
        U::Item: Data,
        F: Fn(Self::Item) -> U + Send + Sync + 'static,
    {
        FlatMapDataset::new(self, f)
    }

    /// Keeps each element with independent probability `rate`.
    ///
    /// Fails with `DatasetError::Config` when `rate` is outside `[0, 1]`.
    fn sample(&self, rate: f64) -> DatasetResult<SampleDataset<Self::Part>> {
        SampleDataset::new(self, rate)
    }

    /// Concatenates the partitions of `self` and `other`.
    fn union<D>(&self, other: &D) -> UnionDataset<Self::Part, D::Part>
    where
        D: Dataset<Item = Self::Item>,
    {
        UnionDataset::new(self, other)
    }

    /// Pairs this dataset's elements with `other`'s, partition by
    /// partition, truncating each pair of partitions to the shorter side.
    ///
    /// Fails with `DatasetError::ShapeMismatch` when the partition counts
    /// differ.
    fn zip<D>(&self, other: &D) -> DatasetResult<ZipDataset<Self::Part, D::Part>>
    where
        D: Dataset,
    {
        ZipDataset::new(self, other)
    }

    /// Collapses all partitions into one, concatenated in index order.
    fn merge(&self) -> MergeDataset<Self::Part> {
        MergeDataset::new(self)
    }
}

impl<D: Dataset> DatasetExt for D {}

/// Extra combinators for datasets of key-value pairs.
pub trait PairDatasetExt<K, V>: Dataset<Item = (K, V)> + Sized
where
    K: Data + Eq + Hash,
    V: Data,
{
    /// Re-buckets the pairs so that `(k, v)` lands in partition
    /// `partitioner.partition_of(k)`.
    fn partition_by_key_with<Pt>(&self, partitioner: Pt) -> PartitionByDataset<Self::Part, Pt>
    where
        Pt: Partitioner<K>,
    {
        PartitionByDataset::new(self, partitioner)
    }

    /// Re-buckets by a standard hash of the key, into the configured number
    /// of partitions.
    fn partition_by_key(&self) -> PartitionByDataset<Self::Part, HashPartitioner> {
        let num_partitions = self.context().config().parallel_task_num();
        self.partition_by_key_with(HashPartitioner::new(num_partitions))
    }

    /// Groups the values of each partition by key. The dataset is expected
    /// to already be partitioned by key for the grouping to be global.
    fn group_by_key(&self) -> GroupByKeyDataset<Self::Part, K, V> {
        GroupByKeyDataset::new(self)
    }
}

impl<D, K, V> PairDatasetExt<K, V> for D
where
    D: Dataset<Item = (K, V)>,
    K: Data + Eq + Hash,
    V: Data,
{
}
