//! One-to-many flat-map transform

use std::marker::PhantomData;
use std::sync::Arc;

use crate::cache::Elements;
use crate::context::ExecutionContext;
use crate::traits::{Data, Dataset, DatasetId, Partition, PartitionBase};

/// Expands each parent element into a sub-sequence, skipping empty
/// expansions on advance.
pub struct FlatMapIter<I, U: IntoIterator, F> {
    outer: I,
    f: Arc<F>,
    inner: Option<U::IntoIter>,
}

impl<I, U, F> Iterator for FlatMapIter<I, U, F>
where
    I: Iterator,
    U: IntoIterator,
    F: Fn(I::Item) -> U,
{
    type Item = U::Item;

    fn next(&mut self) -> Option<U::Item> {
        loop {
            if let Some(inner) = &mut self.inner {
                if let Some(item) = inner.next() {
                    return Some(item);
                }
            }
            match self.outer.next() {
                Some(element) => self.inner = Some((self.f)(element).into_iter()),
                None => return None,
            }
        }
    }
}

pub struct FlatMapPartition<P, U, F> {
    base: PartitionBase,
    parent: P,
    f: Arc<F>,
    _marker: PhantomData<fn() -> U>,
}

impl<P: Clone, U, F> Clone for FlatMapPartition<P, U, F> {
    fn clone(&self) -> Self {
        Self {
            base: self.base.clone(),
            parent: self.parent.clone(),
            f: Arc::clone(&self.f),
            _marker: PhantomData,
        }
    }
}

impl<P, U, F> Partition for FlatMapPartition<P, U, F>
where
    P: Partition,
    U: IntoIterator + 'static,
    U::Item: Data,
    F: Fn(P::Item) -> U + Send + Sync + 'static,
{
    type Item = U::Item;
    type Iter = FlatMapIter<Elements<P::Iter>, U, F>;

    fn base(&self) -> &PartitionBase {
        &self.base
    }

    fn compute(&self) -> Self::Iter {
        FlatMapIter {
            outer: self.parent.iter(),
            f: Arc::clone(&self.f),
            inner: None,
        }
    }
}

/// A dataset where each parent element expands into a sub-sequence.
///
/// `f` runs on worker threads, potentially concurrently.
pub struct FlatMapDataset<P, U, F> {
    context: Arc<ExecutionContext>,
    id: DatasetId,
    partitions: Vec<FlatMapPartition<P, U, F>>,
}

impl<P: Clone, U, F> Clone for FlatMapDataset<P, U, F> {
    fn clone(&self) -> Self {
        Self {
            context: Arc::clone(&self.context),
            id: self.id,
            partitions: self.partitions.clone(),
        }
    }
}

impl<P, U, F> FlatMapDataset<P, U, F>
where
    P: Partition,
    U: IntoIterator + 'static,
    U::Item: Data,
    F: Fn(P::Item) -> U + Send + Sync + 'static,
{
    pub(crate) fn new<D: Dataset<Part = P>>(prev: &D, f: F) -> Self {
        let context = Arc::clone(prev.context());
        let id = context.next_dataset_id();
        let f = Arc::new(f);
        let partitions = prev
            .partitions()
            .iter()
            .map(|parent| FlatMapPartition {
                base: PartitionBase::with_parent(&context, parent.id()),
                parent: parent.clone(),
                f: Arc::clone(&f),
                _marker: PhantomData,
            })
            .collect();
        Self {
            context,
            id,
            partitions,
        }
    }
}

impl<P, U, F> Dataset for FlatMapDataset<P, U, F>
where
    P: Partition,
    U: IntoIterator + 'static,
    U::Item: Data,
    F: Fn(P::Item) -> U + Send + Sync + 'static,
{
    type Item = U::Item;
    type Part = FlatMapPartition<P, U, F>;

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
