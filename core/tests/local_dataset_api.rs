//! Integration tests for dataset transformations and actions
//!
//! These exercise the whole pipeline surface on a single machine: sources,
//! narrow transforms, multi-parent transforms, repartitioning, and the
//! actions that drive them.

use rapids_core::{
    Config, Dataset, DatasetActions, DatasetError, DatasetExt, ExecutionContext, IterKind,
    Partition,
};

#[test]
fn test_range_reduce_sum() {
    let context = ExecutionContext::new(Config::new().with_parallel_task_num(8));
    let total = context
        .range(0i64, 100, |x| x)
        .reduce(|a, b| a + b)
        .unwrap();
    assert_eq!(total, 4950);
}

#[test]
fn test_chained_filters_match_sequential_computation() {
    let context = ExecutionContext::new(Config::new().with_parallel_task_num(8));
    let total = context
        .range(1i64, 10001, |x| x * x)
        .filter(|x| x % 5 == 0)
        .map(|x| x + 2)
        .filter(|x| x % 3 == 0)
        .reduce(|a, b| a + b)
        .unwrap();

    let expected: i64 = (1..10001i64)
        .map(|x| x * x)
        .filter(|x| x % 5 == 0)
        .map(|x| x + 2)
        .filter(|x| x % 3 == 0)
        .sum();
    assert_eq!(total, expected);
}

#[test]
fn test_union_filter_merge_collect() {
    let context = ExecutionContext::new(Config::new().with_parallel_task_num(4));
    let front = context.from_vec((1..50).collect::<Vec<i32>>());
    let back = context.from_vec((50..100).collect::<Vec<i32>>());

    let unioned = front.union(&back);
    assert_eq!(
        unioned.num_partitions(),
        front.num_partitions() + back.num_partitions()
    );

    let evens = unioned.filter(|x| x % 2 == 0).merge();
    assert_eq!(evens.num_partitions(), 1);

    let collected = evens.collect().unwrap();
    let expected: Vec<i32> = (1..100).filter(|x| x % 2 == 0).collect();
    assert_eq!(collected.len(), 49);
    assert_eq!(collected, expected);
}

#[test]
fn test_zip_pairs_identical_ranges() {
    let context = ExecutionContext::new(Config::new().with_parallel_task_num(8));
    let left = context.range(0i64, 1001, |x| x);
    let right = context.range(0i64, 1001, |x| x);

    let zipped = left.zip(&right).unwrap();
    assert_eq!(zipped.count().unwrap(), 1001);

    let pairs = zipped.collect().unwrap();
    assert!(pairs.iter().all(|(a, b)| a == b));
}

#[test]
fn test_zip_truncates_to_shorter_side() {
    let context = ExecutionContext::new(Config::default());
    let left = context.from_vec_with_partitions((0..10).collect::<Vec<i32>>(), 2);
    let right = context.from_vec_with_partitions((0..7).collect::<Vec<i32>>(), 2);

    let zipped = left.zip(&right).unwrap();
    for (pair, (a, b)) in zipped
        .partitions()
        .iter()
        .zip(left.partitions().iter().zip(right.partitions()))
    {
        let expected = a.size().unwrap().min(b.size().unwrap());
        assert_eq!(pair.compute().count(), expected);
    }
    assert_eq!(zipped.count().unwrap(), 7);
}

#[test]
fn test_zip_rejects_mismatched_partition_counts() {
    let context = ExecutionContext::new(Config::default());
    let left = context.from_vec_with_partitions(vec![1, 2, 3], 3);
    let right = context.from_vec_with_partitions(vec![4, 5, 6], 4);

    match left.zip(&right) {
        Err(DatasetError::ShapeMismatch(message)) => {
            assert!(message.contains('3') && message.contains('4'));
        }
        other => panic!("expected shape mismatch, got {:?}", other.map(|d| d.id())),
    }
}

#[test]
fn test_map_covers_all_elements_in_order() {
    let context = ExecutionContext::new(Config::new().with_parallel_task_num(6));
    let collected = context.range(0i32, 57, |x| x).map(|x| x * 10).collect().unwrap();
    let expected: Vec<i32> = (0..57).map(|x| x * 10).collect();
    assert_eq!(collected, expected);
}

#[test]
fn test_narrow_transforms_preserve_partition_count() {
    let context = ExecutionContext::new(Config::new().with_parallel_task_num(5));
    let source = context.range(0i64, 40, |x| x);
    assert_eq!(source.num_partitions(), 5);

    assert_eq!(source.map(|x| x).num_partitions(), 5);
    assert_eq!(source.filter(|_| true).num_partitions(), 5);
    assert_eq!(source.flat_map(|x| vec![x]).num_partitions(), 5);
    assert_eq!(source.sample(0.5).unwrap().num_partitions(), 5);
    assert_eq!(source.merge().num_partitions(), 1);
}

#[test]
fn test_flat_map_skips_empty_expansions() {
    let context = ExecutionContext::new(Config::new().with_parallel_task_num(3));
    let expanded = context
        .range(0u64, 10, |x| x)
        .flat_map(|x| vec![x; (x % 3) as usize])
        .collect()
        .unwrap();

    let expected: Vec<u64> = (0..10u64).flat_map(|x| vec![x; (x % 3) as usize]).collect();
    assert_eq!(expanded, expected);
}

#[test]
fn test_count_is_independent_of_partitioning() {
    for partitions in [1, 2, 7, 16] {
        let context = ExecutionContext::new(Config::new().with_parallel_task_num(partitions));
        let dataset = context.range(0i64, 123, |x| x).filter(|_| true);
        assert_eq!(dataset.count().unwrap(), 123);
    }
}

#[test]
fn test_reduce_on_empty_dataset_yields_identity() {
    let context = ExecutionContext::new(Config::new().with_parallel_task_num(4));
    let total = context.range(0i64, 0, |x| x).reduce(|a, b| a + b).unwrap();
    assert_eq!(total, 0);
}

#[test]
fn test_sample_boundaries_are_exact() {
    let context = ExecutionContext::new(Config::new().with_parallel_task_num(4));
    let source = context.range(0i64, 500, |x| x);

    let none = source.sample(0.0).unwrap();
    assert_eq!(none.count().unwrap(), 0);

    let all = source.sample(1.0).unwrap();
    assert_eq!(all.collect().unwrap(), source.collect().unwrap());
}

#[test]
fn test_seeded_sample_is_reproducible_across_contexts() {
    let config = Config::new().with_parallel_task_num(4).with_sample_seed(7);

    let first = ExecutionContext::new(config.clone())
        .range(0i64, 1000, |x| x)
        .sample(0.2)
        .unwrap()
        .collect()
        .unwrap();
    let second = ExecutionContext::new(config)
        .range(0i64, 1000, |x| x)
        .sample(0.2)
        .unwrap()
        .collect()
        .unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_take_stops_early() {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let context = ExecutionContext::new(Config::new().with_parallel_task_num(4));
    let dataset = context.range(0i64, 100, move |x| {
        counter.fetch_add(1, Ordering::SeqCst);
        x
    });

    assert_eq!(dataset.take(10).unwrap(), (0..10).collect::<Vec<_>>());
    // Only the first partition is touched for ten elements out of 25.
    assert!(calls.load(Ordering::SeqCst) <= 25);

    assert_eq!(dataset.take(0).unwrap(), Vec::<i64>::new());
    assert_eq!(dataset.take(1000).unwrap().len(), 100);
}

#[test]
fn test_first_element_in_partition_order() {
    let context = ExecutionContext::new(Config::new().with_parallel_task_num(4));
    let first = context
        .range(0i64, 100, |x| x)
        .filter(|x| *x >= 90)
        .first()
        .unwrap();
    assert_eq!(first, Some(90));

    let none = context
        .range(0i64, 100, |x| x)
        .filter(|_| false)
        .first()
        .unwrap();
    assert_eq!(none, None);
}

#[test]
fn test_iteration_capability_degrades_through_transforms() {
    let context = ExecutionContext::new(Config::new().with_parallel_task_num(2));
    let source = context.range(0i64, 10, |x| x);
    assert_eq!(source.partitions()[0].kind(), IterKind::RandomAccess);
    assert_eq!(source.partitions()[0].size(), Some(5));

    // Map is one-to-one: capability and size carry over.
    let mapped = source.map(|x| x + 1);
    assert_eq!(mapped.partitions()[0].kind(), IterKind::RandomAccess);
    assert_eq!(mapped.partitions()[0].size(), Some(5));

    // Filter cannot know its size without running the predicate.
    let filtered = source.filter(|_| true);
    assert_eq!(filtered.partitions()[0].kind(), IterKind::Forward);
    assert_eq!(filtered.partitions()[0].size(), None);
}

#[test]
fn test_datasets_are_cheap_values() {
    let context = ExecutionContext::new(Config::new().with_parallel_task_num(3));
    let dataset = context.range(0i64, 30, |x| x).map(|x| x + 1);
    let copy = dataset.clone();

    // A clone is the same dataset: same id, same partition identities.
    assert_eq!(dataset.id(), copy.id());
    let ids: Vec<_> = dataset.partitions().iter().map(|p| p.id()).collect();
    let copy_ids: Vec<_> = copy.partitions().iter().map(|p| p.id()).collect();
    assert_eq!(ids, copy_ids);

    // A derived dataset is not: fresh ids, explicit dependency edges.
    let derived = dataset.map(|x| x);
    assert_ne!(derived.id(), dataset.id());
    for (child, parent) in derived.partitions().iter().zip(dataset.partitions()) {
        assert_ne!(child.id(), parent.id());
        assert_eq!(child.dependencies(), &[parent.id()]);
    }
}
