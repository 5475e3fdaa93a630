//! Union of two datasets with the same element type

use std::sync::Arc;

use crate::cache::Elements;
use crate::context::ExecutionContext;
use crate::traits::{Dataset, DatasetId, Partition, PartitionBase};

pub enum UnionIter<L, R> {
    Left(L),
    Right(R),
}

impl<L, R> Iterator for UnionIter<L, R>
where
    L: Iterator,
    R: Iterator<Item = L::Item>,
{
    type Item = L::Item;

    fn next(&mut self) -> Option<L::Item> {
        match self {
            UnionIter::Left(inner) => inner.next(),
            UnionIter::Right(inner) => inner.next(),
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self {
            UnionIter::Left(inner) => inner.size_hint(),
            UnionIter::Right(inner) => inner.size_hint(),
        }
    }
}

#[derive(Clone)]
enum UnionSource<L, R> {
    Left(L),
    Right(R),
}

/// Mirrors one partition of either parent.
#[derive(Clone)]
pub struct UnionPartition<L, R> {
    base: PartitionBase,
    source: UnionSource<L, R>,
}

impl<L, R> Partition for UnionPartition<L, R>
where
    L: Partition,
    R: Partition<Item = L::Item>,
{
    type Item = L::Item;
    type Iter = UnionIter<Elements<L::Iter>, Elements<R::Iter>>;

    fn base(&self) -> &PartitionBase {
        &self.base
    }

    fn compute(&self) -> Self::Iter {
        match &self.source {
            UnionSource::Left(parent) => UnionIter::Left(parent.iter()),
            UnionSource::Right(parent) => UnionIter::Right(parent.iter()),
        }
    }

    fn size(&self) -> Option<usize> {
        match &self.source {
            UnionSource::Left(parent) => parent.size(),
            UnionSource::Right(parent) => parent.size(),
        }
    }
}

/// A dataset concatenating the partitions of two parents: the first block
/// of partitions mirrors the left parent's, the second the right's.
#[derive(Clone)]
pub struct UnionDataset<L, R> {
    context: Arc<ExecutionContext>,
    id: DatasetId,
    partitions: Vec<UnionPartition<L, R>>,
}

impl<L, R> UnionDataset<L, R>
where
    L: Partition,
    R: Partition<Item = L::Item>,
{
    pub(crate) fn new<DA, DB>(left: &DA, right: &DB) -> Self
    where
        DA: Dataset<Part = L>,
        DB: Dataset<Part = R, Item = DA::Item>,
    {
        let context = Arc::clone(left.context());
        let id = context.next_dataset_id();

        let mut partitions = Vec::with_capacity(left.num_partitions() + right.num_partitions());
        for parent in left.partitions() {
            partitions.push(UnionPartition {
                base: PartitionBase::with_parent(&context, parent.id()),
                source: UnionSource::Left(parent.clone()),
            });
        }
        for parent in right.partitions() {
            partitions.push(UnionPartition {
                base: PartitionBase::with_parent(&context, parent.id()),
                source: UnionSource::Right(parent.clone()),
            });
        }

        Self {
            context,
            id,
            partitions,
        }
    }
}

impl<L, R> Dataset for UnionDataset<L, R>
where
    L: Partition,
    R: Partition<Item = L::Item>,
{
    type Item = L::Item;
    type Part = UnionPartition<L, R>;

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
