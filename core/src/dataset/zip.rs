//! Pairwise zip of two datasets with matching partition counts

use std::sync::Arc;

use crate::cache::Elements;
use crate::context::ExecutionContext;
use crate::traits::{
    Dataset, DatasetError, DatasetId, DatasetResult, Partition, PartitionBase,
};

/// Pairs partition `i` of the left parent with partition `i` of the right,
/// truncating to the shorter side.
#[derive(Clone)]
pub struct ZipPartition<L, R> {
    base: PartitionBase,
    left: L,
    right: R,
}

impl<L, R> Partition for ZipPartition<L, R>
where
    L: Partition,
    R: Partition,
{
    type Item = (L::Item, R::Item);
    type Iter = std::iter::Zip<Elements<L::Iter>, Elements<R::Iter>>;

    fn base(&self) -> &PartitionBase {
        &self.base
    }

    fn compute(&self) -> Self::Iter {
        self.left.iter().zip(self.right.iter())
    }

    fn size(&self) -> Option<usize> {
        match (self.left.size(), self.right.size()) {
            (Some(left), Some(right)) => Some(left.min(right)),
            _ => None,
        }
    }
}

/// A dataset of `(left, right)` pairs, formed partition by partition.
#[derive(Clone)]
pub struct ZipDataset<L, R> {
    context: Arc<ExecutionContext>,
    id: DatasetId,
    partitions: Vec<ZipPartition<L, R>>,
}

impl<L, R> ZipDataset<L, R>
where
    L: Partition,
    R: Partition,
{
    pub(crate) fn new<DA, DB>(left: &DA, right: &DB) -> DatasetResult<Self>
    where
        DA: Dataset<Part = L>,
        DB: Dataset<Part = R>,
    {
        if left.num_partitions() != right.num_partitions() {
            return Err(DatasetError::ShapeMismatch(format!(
                "zip requires equal partition counts, got {} and {}",
                left.num_partitions(),
                right.num_partitions()
            )));
        }

        let context = Arc::clone(left.context());
        let id = context.next_dataset_id();
        let partitions = left
            .partitions()
            .iter()
            .zip(right.partitions())
            .map(|(a, b)| {
                let mut base = PartitionBase::with_parent(&context, a.id());
                base.add_dependency(b.id());
                ZipPartition {
                    base,
                    left: a.clone(),
                    right: b.clone(),
                }
            })
            .collect();

        Ok(Self {
            context,
            id,
            partitions,
        })
    }
}

impl<L, R> Dataset for ZipDataset<L, R>
where
    L: Partition,
    R: Partition,
{
    type Item = (L::Item, R::Item);
    type Part = ZipPartition<L, R>;

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
