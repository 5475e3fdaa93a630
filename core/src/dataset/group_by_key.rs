//! Group-by-key over an already key-partitioned dataset

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, OnceLock};

use crate::context::ExecutionContext;
use crate::traits::{Data, Dataset, DatasetId, Partition, PartitionBase};

type Groups<K, V> = Arc<Vec<(K, Vec<V>)>>;

/// Replays one partition's materialized grouping table.
pub struct GroupedIter<K, V> {
    groups: Groups<K, V>,
    pos: usize,
}

impl<K: Clone, V: Clone> Iterator for GroupedIter<K, V> {
    type Item = (K, Vec<V>);

    fn next(&mut self) -> Option<(K, Vec<V>)> {
        let entry = self.groups.get(self.pos).cloned();
        if entry.is_some() {
            self.pos += 1;
        }
        entry
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.groups.len() - self.pos;
        (remaining, Some(remaining))
    }
}

/// Groups the values of one parent partition by key.
///
/// The grouping table is built on first demand and memoized for the
/// lifetime of the partition; all clones share it. Key order is
/// unspecified but stable once materialized.
#[derive(Clone)]
pub struct GroupByKeyPartition<P, K, V> {
    base: PartitionBase,
    parent: P,
    groups: Arc<OnceLock<Groups<K, V>>>,
}

impl<P, K, V> Partition for GroupByKeyPartition<P, K, V>
where
    P: Partition<Item = (K, V)>,
    K: Data + Eq + Hash,
    V: Data,
{
    type Item = (K, Vec<V>);
    type Iter = GroupedIter<K, V>;

    fn base(&self) -> &PartitionBase {
        &self.base
    }

    fn compute(&self) -> Self::Iter {
        let groups = self.groups.get_or_init(|| {
            let mut table: HashMap<K, Vec<V>> = HashMap::new();
            for (key, value) in self.parent.iter() {
                table.entry(key).or_default().push(value);
            }
            Arc::new(table.into_iter().collect())
        });
        GroupedIter {
            groups: Arc::clone(groups),
            pos: 0,
        }
    }

    fn size(&self) -> Option<usize> {
        self.groups.get().map(|groups| groups.len())
    }
}

/// A dataset of `(key, values)` pairs, one per distinct key of each parent
/// partition.
///
/// The parent is expected to already be partitioned by key (the output of
/// `partition_by_key`, or anything equivalent); grouping is local to each
/// partition. Memory use of a partition is proportional to its element
/// count, since grouping materializes the partition eagerly.
#[derive(Clone)]
pub struct GroupByKeyDataset<P, K, V> {
    context: Arc<ExecutionContext>,
    id: DatasetId,
    partitions: Vec<GroupByKeyPartition<P, K, V>>,
}

impl<P, K, V> GroupByKeyDataset<P, K, V>
where
    P: Partition<Item = (K, V)>,
    K: Data + Eq + Hash,
    V: Data,
{
    pub(crate) fn new<D: Dataset<Part = P>>(prev: &D) -> Self {
        let context = Arc::clone(prev.context());
        let id = context.next_dataset_id();
        let partitions = prev
            .partitions()
            .iter()
            .map(|parent| GroupByKeyPartition {
                base: PartitionBase::with_parent(&context, parent.id()),
                parent: parent.clone(),
                groups: Arc::new(OnceLock::new()),
            })
            .collect();
        Self {
            context,
            id,
            partitions,
        }
    }
}

impl<P, K, V> Dataset for GroupByKeyDataset<P, K, V>
where
    P: Partition<Item = (K, V)>,
    K: Data + Eq + Hash,
    V: Data,
{
    type Item = (K, Vec<V>);
    type Part = GroupByKeyPartition<P, K, V>;

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
