//! Dataset actions
//!
//! Actions trigger computation and return a value to the caller. They all
//! share one skeleton: one task per partition, dispatched through the
//! context's task runner, with the partial results folded in partition
//! index order.

use std::sync::Arc;
use tracing::debug;

use crate::traits::{Dataset, DatasetResult, Partition};

/// Terminal operations available on every dataset.
///
/// User-supplied functions run on arbitrary worker threads, potentially
/// concurrently; a panic in one of them fails the action with
/// `DatasetError::TaskFailed` after the remaining tasks have run.
pub trait DatasetActions: Dataset {
    /// Folds all elements with the associative operation `op`, starting
    /// from `Default::default()` in every partition and again across the
    /// per-partition partials. Empty partitions contribute the identity.
    fn reduce<F>(&self, op: F) -> DatasetResult<Self::Item>
    where
        Self::Item: Default,
        F: Fn(Self::Item, Self::Item) -> Self::Item + Send + Sync + 'static,
    {
        let context = self.context();
        debug!(
            dataset = self.id(),
            partitions = self.num_partitions(),
            name = %context.config().debug_name(),
            "running reduce"
        );
        let op = Arc::new(op);
        let tasks: Vec<_> = self
            .partitions()
            .iter()
            .map(|partition| {
                let partition = partition.clone();
                let op = Arc::clone(&op);
                move || {
                    partition
                        .iter()
                        .fold(<Self::Item>::default(), |acc, item| op(acc, item))
                }
            })
            .collect();

        let partials = context.runner().run(tasks)?;
        Ok(partials
            .into_iter()
            .fold(<Self::Item>::default(), |acc, partial| op(acc, partial)))
    }

    /// Counts the elements, using exact partition sizes where available.
    fn count(&self) -> DatasetResult<usize> {
        let context = self.context();
        debug!(
            dataset = self.id(),
            partitions = self.num_partitions(),
            name = %context.config().debug_name(),
            "running count"
        );
        let tasks: Vec<_> = self
            .partitions()
            .iter()
            .map(|partition| {
                let partition = partition.clone();
                move || match partition.size() {
                    Some(size) => size,
                    None => partition.iter().count(),
                }
            })
            .collect();

        let partials = context.runner().run(tasks)?;
        Ok(partials.into_iter().sum())
    }

    /// Gathers every element into one vector, partitions concatenated in
    /// index order.
    fn collect(&self) -> DatasetResult<Vec<Self::Item>> {
        let context = self.context();
        debug!(
            dataset = self.id(),
            partitions = self.num_partitions(),
            name = %context.config().debug_name(),
            "running collect"
        );
        let tasks: Vec<_> = self
            .partitions()
            .iter()
            .map(|partition| {
                let partition = partition.clone();
                move || partition.iter().collect::<Vec<_>>()
            })
            .collect();

        let partials = context.runner().run(tasks)?;
        let mut result = Vec::with_capacity(partials.iter().map(Vec::len).sum());
        for partial in partials {
            result.extend(partial);
        }
        Ok(result)
    }

    /// Returns the first `n` elements in partition order.
    ///
    /// Unlike the fan-out actions, this scans partitions one at a time on
    /// the calling thread and stops as soon as enough elements are found,
    /// so trailing partitions are never computed.
    fn take(&self, n: usize) -> DatasetResult<Vec<Self::Item>> {
        let mut result = Vec::with_capacity(n.min(1024));
        for partition in self.partitions() {
            if result.len() >= n {
                break;
            }
            result.extend(partition.iter().take(n - result.len()));
        }
        Ok(result)
    }

    /// Returns the first element, or `None` when the dataset is empty.
    fn first(&self) -> DatasetResult<Option<Self::Item>> {
        for partition in self.partitions() {
            if let Some(item) = partition.iter().next() {
                return Ok(Some(item));
            }
        }
        Ok(None)
    }

    /// Applies `f` to every element for its side effects.
    fn foreach<F>(&self, f: F) -> DatasetResult<()>
    where
        F: Fn(&Self::Item) + Send + Sync + 'static,
    {
        let context = self.context();
        let f = Arc::new(f);
        let tasks: Vec<_> = self
            .partitions()
            .iter()
            .map(|partition| {
                let partition = partition.clone();
                let f = Arc::clone(&f);
                move || {
                    for item in partition.iter() {
                        f(&item);
                    }
                }
            })
            .collect();

        context.runner().run(tasks)?;
        Ok(())
    }
}

impl<D: Dataset> DatasetActions for D {}
