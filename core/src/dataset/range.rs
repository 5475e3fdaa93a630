//! Generator source over a numeric range

use std::marker::PhantomData;
use std::sync::Arc;

use crate::context::ExecutionContext;
use crate::traits::{Data, Dataset, DatasetId, IterKind, Partition, PartitionBase};

/// Numeric index types a `RangeDataset` can generate from.
pub trait RangeNum: Copy + Send + Sync + 'static {
    /// Number of steps in `[begin, end)`; zero when the range is inverted.
    fn distance(begin: Self, end: Self) -> usize;

    fn advance(self, steps: usize) -> Self;
}

macro_rules! impl_range_num {
    ($($ty:ty),*) => {
        $(impl RangeNum for $ty {
            fn distance(begin: Self, end: Self) -> usize {
                if end > begin { (end - begin) as usize } else { 0 }
            }

            fn advance(self, steps: usize) -> Self {
                self + steps as $ty
            }
        })*
    };
}

impl_range_num!(i32, i64, u32, u64, usize, isize);

/// Lazily computes `f(k)` for each index in one partition's sub-range.
pub struct RangeIter<N, T, F> {
    f: Arc<F>,
    current: N,
    remaining: usize,
    _marker: PhantomData<fn() -> T>,
}

impl<N, T, F> Iterator for RangeIter<N, T, F>
where
    N: RangeNum,
    F: Fn(N) -> T,
{
    type Item = T;

    fn next(&mut self) -> Option<T> {
        if self.remaining == 0 {
            return None;
        }
        let value = (self.f)(self.current);
        self.current = self.current.advance(1);
        self.remaining -= 1;
        Some(value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

/// One contiguous index sub-range of a `RangeDataset`.
pub struct RangePartition<N, T, F> {
    base: PartitionBase,
    start: N,
    len: usize,
    f: Arc<F>,
    _marker: PhantomData<fn() -> T>,
}

impl<N: Copy, T, F> Clone for RangePartition<N, T, F> {
    fn clone(&self) -> Self {
        Self {
            base: self.base.clone(),
            start: self.start,
            len: self.len,
            f: Arc::clone(&self.f),
            _marker: PhantomData,
        }
    }
}

impl<N, T, F> Partition for RangePartition<N, T, F>
where
    N: RangeNum,
    T: Data,
    F: Fn(N) -> T + Send + Sync + 'static,
{
    type Item = T;
    type Iter = RangeIter<N, T, F>;

    fn base(&self) -> &PartitionBase {
        &self.base
    }

    fn compute(&self) -> Self::Iter {
        RangeIter {
            f: Arc::clone(&self.f),
            current: self.start,
            remaining: self.len,
            _marker: PhantomData,
        }
    }

    fn size(&self) -> Option<usize> {
        Some(self.len)
    }

    fn kind(&self) -> IterKind {
        IterKind::RandomAccess
    }
}

/// A source dataset generating `f(k)` for every `k` in `[begin, end)`.
///
/// The index range is split evenly: partition `i` of `n` covers
/// `[begin + i*s/n, begin + (i+1)*s/n)`, so the last partition absorbs the
/// rounding remainder. `f` runs lazily, on whichever worker thread pulls
/// the element, and may be invoked concurrently for different partitions.
pub struct RangeDataset<N, T, F> {
    context: Arc<ExecutionContext>,
    id: DatasetId,
    partitions: Vec<RangePartition<N, T, F>>,
}

impl<N: Copy, T, F> Clone for RangeDataset<N, T, F> {
    fn clone(&self) -> Self {
        Self {
            context: Arc::clone(&self.context),
            id: self.id,
            partitions: self.partitions.clone(),
        }
    }
}

impl<N, T, F> RangeDataset<N, T, F>
where
    N: RangeNum,
    T: Data,
    F: Fn(N) -> T + Send + Sync + 'static,
{
    pub(crate) fn new(context: &Arc<ExecutionContext>, begin: N, end: N, f: F) -> Self {
        let id = context.next_dataset_id();
        let total = N::distance(begin, end);
        let num_partitions = context.config().parallel_task_num();
        let f = Arc::new(f);

        let partitions = (0..num_partitions)
            .map(|i| {
                let lo = (i as u128 * total as u128 / num_partitions as u128) as usize;
                let hi = ((i + 1) as u128 * total as u128 / num_partitions as u128) as usize;
                RangePartition {
                    base: PartitionBase::new(context),
                    start: begin.advance(lo),
                    len: hi - lo,
                    f: Arc::clone(&f),
                    _marker: PhantomData,
                }
            })
            .collect();

        Self {
            context: Arc::clone(context),
            id,
            partitions,
        }
    }
}

impl<N, T, F> Dataset for RangeDataset<N, T, F>
where
    N: RangeNum,
    T: Data,
    F: Fn(N) -> T + Send + Sync + 'static,
{
    type Item = T;
    type Part = RangePartition<N, T, F>;

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
