//! Key partitioners for hash re-bucketing

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Maps keys to output partition indices.
///
/// Partitioners are invoked from arbitrary worker threads, potentially
/// concurrently, and must return the same index for equal keys for the
/// lifetime of the derived dataset.
pub trait Partitioner<K>: Send + Sync + 'static {
    fn num_partitions(&self) -> usize;

    /// The partition index for `key`, in `0..num_partitions()`.
    fn partition_of(&self, key: &K) -> usize;
}

/// A partitioner that buckets by a seeded standard hash of the key.
#[derive(Clone, Debug)]
pub struct HashPartitioner {
    num_partitions: usize,
    seed: u64,
}

impl HashPartitioner {
    pub fn new(num_partitions: usize) -> Self {
        Self::with_seed(num_partitions, 0)
    }

    pub fn with_seed(num_partitions: usize, seed: u64) -> Self {
        assert!(num_partitions > 0, "number of partitions must be positive");
        Self {
            num_partitions,
            seed,
        }
    }
}

impl<K: Hash> Partitioner<K> for HashPartitioner {
    fn num_partitions(&self) -> usize {
        self.num_partitions
    }

    fn partition_of(&self, key: &K) -> usize {
        let mut hasher = DefaultHasher::new();
        self.seed.hash(&mut hasher);
        key.hash(&mut hasher);
        (hasher.finish() % self.num_partitions as u64) as usize
    }
}
