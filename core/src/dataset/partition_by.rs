//! Hash re-bucketing of a key-value dataset

use std::sync::Arc;

use crate::context::ExecutionContext;
use crate::dataset::merge::ConcatIter;
use crate::partitioner::Partitioner;
use crate::traits::{Data, Dataset, DatasetId, Partition, PartitionBase};

/// Scans the concatenation of every parent partition, keeping the pairs the
/// partitioner assigns to this partition's index.
pub struct PartitionByIter<P: Partition, Pt> {
    inner: ConcatIter<P>,
    partitioner: Arc<Pt>,
    index: usize,
}

impl<P, Pt, K, V> Iterator for PartitionByIter<P, Pt>
where
    P: Partition<Item = (K, V)>,
    Pt: Partitioner<K>,
    K: Data,
    V: Data,
{
    type Item = (K, V);

    fn next(&mut self) -> Option<(K, V)> {
        loop {
            let (key, value) = self.inner.next()?;
            if self.partitioner.partition_of(&key) == self.index {
                return Some((key, value));
            }
        }
    }
}

pub struct PartitionByPartition<P, Pt> {
    base: PartitionBase,
    parents: Arc<Vec<P>>,
    partitioner: Arc<Pt>,
    index: usize,
}

impl<P: Clone, Pt> Clone for PartitionByPartition<P, Pt> {
    fn clone(&self) -> Self {
        Self {
            base: self.base.clone(),
            parents: Arc::clone(&self.parents),
            partitioner: Arc::clone(&self.partitioner),
            index: self.index,
        }
    }
}

impl<P, Pt, K, V> Partition for PartitionByPartition<P, Pt>
where
    P: Partition<Item = (K, V)>,
    Pt: Partitioner<K>,
    K: Data,
    V: Data,
{
    type Item = (K, V);
    type Iter = PartitionByIter<P, Pt>;

    fn base(&self) -> &PartitionBase {
        &self.base
    }

    fn compute(&self) -> Self::Iter {
        PartitionByIter {
            inner: ConcatIter::new(Arc::clone(&self.parents)),
            partitioner: Arc::clone(&self.partitioner),
            index: self.index,
        }
    }
}

/// A dataset whose pairs are re-bucketed by key: `(k, v)` lands in the
/// partition the partitioner assigns to `k`.
///
/// Every output partition rescans every parent partition; parents consumed
/// by two or more outputs are cached after the first scan, which bounds the
/// recomputation.
pub struct PartitionByDataset<P, Pt> {
    context: Arc<ExecutionContext>,
    id: DatasetId,
    partitions: Vec<PartitionByPartition<P, Pt>>,
}

impl<P: Clone, Pt> Clone for PartitionByDataset<P, Pt> {
    fn clone(&self) -> Self {
        Self {
            context: Arc::clone(&self.context),
            id: self.id,
            partitions: self.partitions.clone(),
        }
    }
}

impl<P, Pt, K, V> PartitionByDataset<P, Pt>
where
    P: Partition<Item = (K, V)>,
    Pt: Partitioner<K>,
    K: Data,
    V: Data,
{
    pub(crate) fn new<D: Dataset<Part = P>>(prev: &D, partitioner: Pt) -> Self {
        let context = Arc::clone(prev.context());
        let id = context.next_dataset_id();
        let parents = Arc::new(prev.partitions().to_vec());
        let partitioner = Arc::new(partitioner);

        let partitions = (0..partitioner.num_partitions())
            .map(|index| {
                let mut base = PartitionBase::new(&context);
                for parent in parents.iter() {
                    base.add_dependency(parent.id());
                }
                PartitionByPartition {
                    base,
                    parents: Arc::clone(&parents),
                    partitioner: Arc::clone(&partitioner),
                    index,
                }
            })
            .collect();

        Self {
            context,
            id,
            partitions,
        }
    }
}

impl<P, Pt, K, V> Dataset for PartitionByDataset<P, Pt>
where
    P: Partition<Item = (K, V)>,
    Pt: Partitioner<K>,
    K: Data,
    V: Data,
{
    type Item = (K, V);
    type Part = PartitionByPartition<P, Pt>;

    fn id(&self) -> DatasetId {
        self.id
    }

    fn context(&self) -> &Arc<ExecutionContext> {
        &self.context
    }

    fn partitions(&self) -> &[Self::Part] {
        &self.partitions
    }
}
