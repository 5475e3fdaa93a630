//! Shared-partition cache tests
//!
//! A partition consumed by two or more children is materialized once and
//! replayed for every consumer. These tests count user-function
//! side-effects to prove the single-producer guarantee end to end.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use rapids_core::{
    Config, Dataset, DatasetActions, DatasetError, DatasetExt, ExecutionContext, ParallelPolicy,
    Partition,
};

#[test]
fn test_shared_intermediate_computes_once_across_actions() {
    let calls = Arc::new(AtomicUsize::new(0));
    let context = ExecutionContext::new(Config::new().with_parallel_task_num(4));

    let counter = Arc::clone(&calls);
    let shared = context.range(0i64, 100, |x| x).map(move |x| {
        counter.fetch_add(1, Ordering::SeqCst);
        x * 2
    });

    // Two children push the shared partitions' in-degree to two, which is
    // what makes them cacheable.
    let summed = shared.map(|x| x);
    let counted = shared.filter(|_| true);

    for partition in shared.partitions() {
        assert!(context.should_cache(partition.id()));
        assert!(!context.is_cached(partition.id()));
    }

    let total = summed.reduce(|a, b| a + b).unwrap();
    assert_eq!(total, (0..100).map(|x| x * 2).sum::<i64>());
    assert_eq!(calls.load(Ordering::SeqCst), 100);

    for partition in shared.partitions() {
        assert!(context.is_cached(partition.id()));
    }

    // The second action replays the cache instead of re-running the map.
    assert_eq!(counted.count().unwrap(), 100);
    assert_eq!(calls.load(Ordering::SeqCst), 100);
}

#[test]
fn test_concurrent_actions_share_one_producer() {
    let calls = Arc::new(AtomicUsize::new(0));
    let context = ExecutionContext::new(Config::new().with_parallel_task_num(4));

    let counter = Arc::clone(&calls);
    let shared = context.range(0i64, 400, |x| x).map(move |x| {
        counter.fetch_add(1, Ordering::SeqCst);
        x + 7
    });
    let summed = shared.map(|x| x);
    let counted = shared.filter(|_| true);

    let reduce_thread = thread::spawn(move || summed.reduce(|a, b| a + b).unwrap());
    let count_thread = thread::spawn(move || counted.count().unwrap());

    assert_eq!(reduce_thread.join().unwrap(), (0..400).map(|x| x + 7).sum::<i64>());
    assert_eq!(count_thread.join().unwrap(), 400);
    assert_eq!(calls.load(Ordering::SeqCst), 400);
}

#[test]
fn test_single_consumer_is_not_cached() {
    let calls = Arc::new(AtomicUsize::new(0));
    let context = ExecutionContext::new(Config::new().with_parallel_task_num(2));

    let counter = Arc::clone(&calls);
    let source = context.range(0i64, 50, |x| x).map(move |x| {
        counter.fetch_add(1, Ordering::SeqCst);
        x
    });
    let only_child = source.map(|x| x);

    for partition in source.partitions() {
        assert!(!context.should_cache(partition.id()));
    }

    only_child.collect().unwrap();
    only_child.collect().unwrap();
    // Recomputed per action, because nothing shares the intermediate.
    assert_eq!(calls.load(Ordering::SeqCst), 100);
    for partition in source.partitions() {
        assert!(!context.is_cached(partition.id()));
    }
}

#[test]
fn test_failed_producer_poisons_every_consumer() {
    let context = ExecutionContext::new(
        Config::new()
            .with_parallel_task_num(2)
            .with_parallel_policy(ParallelPolicy::Sequential),
    );

    let shared = context.range(0i64, 10, |x| x).map(|x| {
        if x == 5 {
            panic!("corrupt element");
        }
        x
    });
    let first = shared.map(|x| x);
    let second = shared.map(|x| x);

    match first.collect() {
        Err(DatasetError::TaskFailed(message)) => assert!(message.contains("corrupt element")),
        other => panic!("expected task failure, got {other:?}"),
    }

    // The failed entry is terminal: the second consumer observes the same
    // error without the map function running again.
    match second.collect() {
        Err(DatasetError::TaskFailed(message)) => assert!(message.contains("corrupt element")),
        other => panic!("expected task failure, got {other:?}"),
    }
}

#[test]
fn test_cached_replay_matches_direct_computation() {
    let context = ExecutionContext::new(Config::new().with_parallel_task_num(3));
    let shared = context.range(0i64, 60, |x| x).map(|x| x * x);
    let left = shared.map(|x| x);
    let right = shared.map(|x| x);

    let expected: Vec<i64> = (0..60).map(|x| x * x).collect();
    assert_eq!(left.collect().unwrap(), expected);
    assert_eq!(right.collect().unwrap(), expected);
}
