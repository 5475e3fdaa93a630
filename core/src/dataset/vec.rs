//! Source dataset over an existing in-memory sequence

use std::sync::Arc;

use crate::context::ExecutionContext;
use crate::traits::{Data, Dataset, DatasetId, IterKind, Partition, PartitionBase};

/// Clones elements out of a shared backing vector.
pub struct VecIter<T> {
    data: Arc<Vec<T>>,
    pos: usize,
    end: usize,
}

impl<T: Clone> Iterator for VecIter<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        if self.pos >= self.end {
            return None;
        }
        let item = self.data[self.pos].clone();
        self.pos += 1;
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.end - self.pos;
        (remaining, Some(remaining))
    }
}

/// One contiguous slice `[start, end)` of the backing vector.
#[derive(Clone)]
pub struct VecPartition<T> {
    base: PartitionBase,
    data: Arc<Vec<T>>,
    start: usize,
    end: usize,
}

impl<T: Data> Partition for VecPartition<T> {
    type Item = T;
    type Iter = VecIter<T>;

    fn base(&self) -> &PartitionBase {
        &self.base
    }

    fn compute(&self) -> Self::Iter {
        VecIter {
            data: Arc::clone(&self.data),
            pos: self.start,
            end: self.end,
        }
    }

    fn size(&self) -> Option<usize> {
        Some(self.end - self.start)
    }

    fn kind(&self) -> IterKind {
        IterKind::RandomAccess
    }
}

/// A source dataset wrapping an owned vector.
///
/// The vector is shared between partitions; partition `i` of `n` exposes
/// the sub-range `[i*s/n, (i+1)*s/n)`.
#[derive(Clone)]
pub struct VecDataset<T> {
    context: Arc<ExecutionContext>,
    id: DatasetId,
    partitions: Vec<VecPartition<T>>,
}

impl<T: Data> VecDataset<T> {
    pub(crate) fn new(
        context: &Arc<ExecutionContext>,
        data: Vec<T>,
        num_partitions: usize,
    ) -> Self {
        let num_partitions = if num_partitions == 0 { 1 } else { num_partitions };
        let id = context.next_dataset_id();
        let data = Arc::new(data);
        let total = data.len();

        let partitions = (0..num_partitions)
            .map(|i| VecPartition {
                base: PartitionBase::new(context),
                data: Arc::clone(&data),
                start: i * total / num_partitions,
                end: (i + 1) * total / num_partitions,
            })
            .collect();

        Self {
            context: Arc::clone(context),
            id,
            partitions,
        }
    }
}

impl<T: Data> Dataset for VecDataset<T> {
    type Item = T;
    type Part = VecPartition<T>;

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

    #[test]
    fn test_slices_cover_sequence_in_order() {
        let context = ExecutionContext::new(Config::new().with_parallel_task_num(4));
        let data: Vec<i32> = (1..=10).collect();
        let dataset = context.from_vec(data.clone());

        assert_eq!(dataset.num_partitions(), 4);
        let concatenated: Vec<i32> = dataset
            .partitions()
            .iter()
            .flat_map(|p| p.compute())
            .collect();
        assert_eq!(concatenated, data);
    }

    #[test]
    fn test_zero_partitions_collapses_to_one() {
        let context = ExecutionContext::new(Config::default());
        let dataset = context.from_vec_with_partitions(vec![1, 2, 3], 0);
        assert_eq!(dataset.num_partitions(), 1);
        assert_eq!(dataset.partitions()[0].size(), Some(3));
    }

    #[test]
    fn test_more_partitions_than_elements() {
        let context = ExecutionContext::new(Config::default());
        let dataset = context.from_vec_with_partitions(vec![7, 8], 5);
        assert_eq!(dataset.num_partitions(), 5);
        let total: usize = dataset
            .partitions()
            .iter()
            .map(|p| p.size().unwrap())
            .sum();
        assert_eq!(total, 2);
    }
}
