//! Bernoulli sampling transform

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;

use crate::cache::Elements;
use crate::context::ExecutionContext;
use crate::traits::{Dataset, DatasetError, DatasetId, DatasetResult, Partition, PartitionBase};

// Mixes the partition id into the configured seed so sibling partitions
// draw independent streams.
fn partition_seed(seed: u64, partition: u32) -> u64 {
    seed.wrapping_add((partition as u64).wrapping_mul(0x9e37_79b9_7f4a_7c15))
}

/// Keeps each element with independent probability `rate`.
///
/// The boundaries are exact: rate 0 yields nothing and rate 1 passes every
/// element through, neither consuming any randomness.
pub struct SampleIter<I> {
    inner: I,
    rate: f64,
    rng: StdRng,
}

impl<I: Iterator> Iterator for SampleIter<I> {
    type Item = I::Item;

    fn next(&mut self) -> Option<I::Item> {
        if self.rate <= 0.0 {
            return None;
        }
        loop {
            let item = self.inner.next()?;
            if self.rate >= 1.0 || self.rng.gen_bool(self.rate) {
                return Some(item);
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, self.inner.size_hint().1)
    }
}

#[derive(Clone)]
pub struct SamplePartition<P> {
    base: PartitionBase,
    parent: P,
    rate: f64,
    seed: Option<u64>,
}

impl<P: Partition> Partition for SamplePartition<P> {
    type Item = P::Item;
    type Iter = SampleIter<Elements<P::Iter>>;

    fn base(&self) -> &PartitionBase {
        &self.base
    }

    fn compute(&self) -> Self::Iter {
        let rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(partition_seed(seed, self.id())),
            None => StdRng::from_entropy(),
        };
        SampleIter {
            inner: self.parent.iter(),
            rate: self.rate,
            rng,
        }
    }
}

/// A dataset that keeps a Bernoulli sample of its parent.
///
/// With `Config::sample_seed` set, every partition seeds its generator from
/// the configured seed and its own partition id, so repeated iterations and
/// repeated runs select the same elements. Without a seed the sample is
/// drawn from entropy and is not reproducible.
pub struct SampleDataset<P> {
    context: Arc<ExecutionContext>,
    id: DatasetId,
    partitions: Vec<SamplePartition<P>>,
}

impl<P: Clone> Clone for SampleDataset<P> {
    fn clone(&self) -> Self {
        Self {
            context: Arc::clone(&self.context),
            id: self.id,
            partitions: self.partitions.clone(),
        }
    }
}

impl<P: Partition> SampleDataset<P> {
    pub(crate) fn new<D: Dataset<Part = P>>(prev: &D, rate: f64) -> DatasetResult<Self> {
        if !rate.is_finite() || !(0.0..=1.0).contains(&rate) {
            return Err(DatasetError::Config(format!(
                "sample rate must be within [0, 1], got {rate}"
            )));
        }
        let context = Arc::clone(prev.context());
        let id = context.next_dataset_id();
        let seed = context.config().sample_seed();
        let partitions = prev
            .partitions()
            .iter()
            .map(|parent| SamplePartition {
                base: PartitionBase::with_parent(&context, parent.id()),
                parent: parent.clone(),
                rate,
                seed,
            })
            .collect();
        Ok(Self {
            context,
            id,
            partitions,
        })
    }
}

impl<P: Partition> Dataset for SampleDataset<P> {
    type Item = P::Item;
    type Part = SamplePartition<P>;

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
