//! Merge of all partitions into one

use std::sync::Arc;

use crate::cache::Elements;
use crate::context::ExecutionContext;
use crate::traits::{Dataset, DatasetId, Partition, PartitionBase};

/// Concatenates the element sequences of a list of partitions in their
/// declared order, stepping past empty parents on advance.
pub struct ConcatIter<P: Partition> {
    parents: Arc<Vec<P>>,
    index: usize,
    current: Option<Elements<P::Iter>>,
}

impl<P: Partition> ConcatIter<P> {
    pub(crate) fn new(parents: Arc<Vec<P>>) -> Self {
        Self {
            parents,
            index: 0,
            current: None,
        }
    }
}

impl<P: Partition> Iterator for ConcatIter<P> {
    type Item = P::Item;

    fn next(&mut self) -> Option<P::Item> {
        loop {
            if let Some(current) = &mut self.current {
                if let Some(item) = current.next() {
                    return Some(item);
                }
            }
            if self.index >= self.parents.len() {
                return None;
            }
            self.current = Some(self.parents[self.index].iter());
            self.index += 1;
        }
    }
}

/// The single partition of a merged dataset, spanning every parent
/// partition.
#[derive(Clone)]
pub struct MergePartition<P> {
    base: PartitionBase,
    parents: Arc<Vec<P>>,
}

impl<P: Partition> Partition for MergePartition<P> {
    type Item = P::Item;
    type Iter = ConcatIter<P>;

    fn base(&self) -> &PartitionBase {
        &self.base
    }

    fn compute(&self) -> Self::Iter {
        ConcatIter::new(Arc::clone(&self.parents))
    }

    fn size(&self) -> Option<usize> {
        self.parents.iter().map(|parent| parent.size()).sum()
    }
}

/// A dataset collapsing all of its parent's partitions into exactly one.
#[derive(Clone)]
pub struct MergeDataset<P> {
    context: Arc<ExecutionContext>,
    id: DatasetId,
    partitions: Vec<MergePartition<P>>,
}

impl<P: Partition> MergeDataset<P> {
    pub(crate) fn new<D: Dataset<Part = P>>(prev: &D) -> Self {
        let context = Arc::clone(prev.context());
        let id = context.next_dataset_id();

        let mut base = PartitionBase::new(&context);
        for parent in prev.partitions() {
            base.add_dependency(parent.id());
        }
        let partitions = vec![MergePartition {
            base,
            parents: Arc::new(prev.partitions().to_vec()),
        }];

        Self {
            context,
            id,
            partitions,
        }
    }
}

impl<P: Partition> Dataset for MergeDataset<P> {
    type Item = P::Item;
    type Part = MergePartition<P>;

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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::dataset::DatasetExt;

    #[test]
    fn test_merge_concatenates_in_partition_order() {
        let context = ExecutionContext::new(Config::new().with_parallel_task_num(4));
        let merged = context.from_vec((0..20).collect::<Vec<i32>>()).merge();

        assert_eq!(merged.num_partitions(), 1);
        let elements: Vec<i32> = merged.partitions()[0].compute().collect();
        assert_eq!(elements, (0..20).collect::<Vec<_>>());
        assert_eq!(merged.partitions()[0].size(), Some(20));
    }

    #[test]
    fn test_merge_steps_past_empty_parents() {
        let context = ExecutionContext::new(Config::new().with_parallel_task_num(8));
        // Two elements spread over eight partitions leaves most empty.
        let merged = context.from_vec(vec![1, 2]).merge();
        let elements: Vec<i32> = merged.partitions()[0].compute().collect();
        assert_eq!(elements, vec![1, 2]);
    }
}
