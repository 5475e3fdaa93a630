//! Predicate filter transform

use std::sync::Arc;

use crate::cache::Elements;
use crate::context::ExecutionContext;
use crate::traits::{Dataset, DatasetId, Partition, PartitionBase};

/// Advances past elements the predicate rejects.
pub struct FilterIter<I, F> {
    inner: I,
    predicate: Arc<F>,
}

impl<I, F> Iterator for FilterIter<I, F>
where
    I: Iterator,
    F: Fn(&I::Item) -> bool,
{
    type Item = I::Item;

    fn next(&mut self) -> Option<I::Item> {
        loop {
            let item = self.inner.next()?;
            if (self.predicate)(&item) {
                return Some(item);
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, self.inner.size_hint().1)
    }
}

pub struct FilterPartition<P, F> {
    base: PartitionBase,
    parent: P,
    predicate: Arc<F>,
}

impl<P: Clone, F> Clone for FilterPartition<P, F> {
    fn clone(&self) -> Self {
        Self {
            base: self.base.clone(),
            parent: self.parent.clone(),
            predicate: Arc::clone(&self.predicate),
        }
    }
}

impl<P, F> Partition for FilterPartition<P, F>
where
    P: Partition,
    F: Fn(&P::Item) -> bool + Send + Sync + 'static,
{
    type Item = P::Item;
    type Iter = FilterIter<Elements<P::Iter>, F>;

    fn base(&self) -> &PartitionBase {
        &self.base
    }

    fn compute(&self) -> Self::Iter {
        FilterIter {
            inner: self.parent.iter(),
            predicate: Arc::clone(&self.predicate),
        }
    }
}

/// A dataset keeping only the elements the predicate accepts.
///
/// The predicate runs on worker threads, potentially concurrently.
pub struct FilterDataset<P, F> {
    context: Arc<ExecutionContext>,
    id: DatasetId,
    partitions: Vec<FilterPartition<P, F>>,
}

impl<P: Clone, F> Clone for FilterDataset<P, F> {
    fn clone(&self) -> Self {
        Self {
            context: Arc::clone(&self.context),
            id: self.id,
            partitions: self.partitions.clone(),
        }
    }
}

impl<P, F> FilterDataset<P, F>
where
    P: Partition,
    F: Fn(&P::Item) -> bool + Send + Sync + 'static,
{
    pub(crate) fn new<D: Dataset<Part = P>>(prev: &D, predicate: F) -> Self {
        let context = Arc::clone(prev.context());
        let id = context.next_dataset_id();
        let predicate = Arc::new(predicate);
        let partitions = prev
            .partitions()
            .iter()
            .map(|parent| FilterPartition {
                base: PartitionBase::with_parent(&context, parent.id()),
                parent: parent.clone(),
                predicate: Arc::clone(&predicate),
            })
            .collect();
        Self {
            context,
            id,
            partitions,
        }
    }
}

impl<P, F> Dataset for FilterDataset<P, F>
where
    P: Partition,
    F: Fn(&P::Item) -> bool + Send + Sync + 'static,
{
    type Item = P::Item;
    type Part = FilterPartition<P, F>;

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
