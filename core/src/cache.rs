//! Per-partition memoization
//!
//! Partitions consumed by two or more children are materialized once and
//! replayed from memory. The cache guarantees a single producer per
//! partition id: every other reader blocks on the entry's completion state
//! until the producer publishes the elements or fails.

use std::any::Any;
use std::collections::HashMap;
use std::panic::{catch_unwind, resume_unwind, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, RwLock};
use tracing::debug;

use crate::scheduler::panic_message;
use crate::traits::{Data, PartitionId};

/// Completion state of one cache entry.
///
/// `Failed` is terminal: a failed materialization is not retried within the
/// same execution context, and every waiter observes the original error.
enum CellState {
    Pending,
    Ready(Arc<dyn Any + Send + Sync>),
    Failed(String),
}

/// A one-shot completion future shared by the producer and all waiters.
struct CacheCell {
    state: Mutex<CellState>,
    ready: Condvar,
}

impl CacheCell {
    fn new() -> Self {
        Self {
            state: Mutex::new(CellState::Pending),
            ready: Condvar::new(),
        }
    }

    fn is_done(&self) -> bool {
        !matches!(*self.state.lock().unwrap(), CellState::Pending)
    }

    /// Blocks until the entry resolves. A failed entry re-raises the
    /// producer's panic message in the waiting task.
    fn await_ready<T: Data>(&self, id: PartitionId) -> Arc<Vec<T>> {
        let mut state = self.state.lock().unwrap();
        while matches!(*state, CellState::Pending) {
            state = self.ready.wait(state).unwrap();
        }
        // Resolve the outcome before releasing the guard; the panic below
        // must not happen while the lock is held.
        let outcome = match &*state {
            CellState::Ready(values) => Ok(Arc::clone(values)),
            CellState::Failed(message) => Err(message.clone()),
            CellState::Pending => unreachable!(),
        };
        drop(state);
        match outcome {
            Ok(values) => downcast(id, values),
            Err(message) => panic!("cache producer failed for partition {id}: {message}"),
        }
    }

    fn fulfill(&self, values: Arc<dyn Any + Send + Sync>) {
        *self.state.lock().unwrap() = CellState::Ready(values);
        self.ready.notify_all();
    }

    fn fail(&self, message: String) {
        *self.state.lock().unwrap() = CellState::Failed(message);
        self.ready.notify_all();
    }
}

fn downcast<T: Data>(id: PartitionId, values: Arc<dyn Any + Send + Sync>) -> Arc<Vec<T>> {
    values
        .downcast::<Vec<T>>()
        .unwrap_or_else(|_| panic!("cache entry for partition {id} holds a different element type"))
}

/// The per-context cache store: partition id to completion cell.
///
/// The lock only guards the map itself; materialization runs outside it.
pub(crate) struct CacheManager {
    cells: RwLock<HashMap<PartitionId, Arc<CacheCell>>>,
}

impl CacheManager {
    pub(crate) fn new() -> Self {
        Self {
            cells: RwLock::new(HashMap::new()),
        }
    }

    /// True once a materialization for `id` has completed, successfully or
    /// not.
    pub(crate) fn is_done(&self, id: PartitionId) -> bool {
        self.cells
            .read()
            .unwrap()
            .get(&id)
            .is_some_and(|cell| cell.is_done())
    }

    /// Returns the memoized elements for `id`, running `produce` if this is
    /// the first request. Concurrent callers block until the single producer
    /// publishes; a producer panic marks the entry failed for everyone and
    /// resumes in the producing task.
    pub(crate) fn get_or_materialize<T, F>(&self, id: PartitionId, produce: F) -> Arc<Vec<T>>
    where
        T: Data,
        F: FnOnce() -> Vec<T>,
    {
        // The map guard must not be held while blocking on a cell: a
        // producer may need the write lock to install entries for its own
        // parents.
        let existing = { self.cells.read().unwrap().get(&id).cloned() };
        if let Some(cell) = existing {
            return cell.await_ready(id);
        }

        let (cell, is_producer) = {
            let mut cells = self.cells.write().unwrap();
            match cells.get(&id) {
                Some(cell) => (Arc::clone(cell), false),
                None => {
                    let cell = Arc::new(CacheCell::new());
                    cells.insert(id, Arc::clone(&cell));
                    (cell, true)
                }
            }
        };

        if !is_producer {
            return cell.await_ready(id);
        }

        debug!(partition = id, "materializing shared partition");
        match catch_unwind(AssertUnwindSafe(produce)) {
            Ok(values) => {
                let values = Arc::new(values);
                cell.fulfill(Arc::clone(&values) as Arc<dyn Any + Send + Sync>);
                values
            }
            Err(payload) => {
                cell.fail(panic_message(payload.as_ref()));
                resume_unwind(payload)
            }
        }
    }
}

/// The element stream handed out by `Partition::iter`: either a replay of
/// the memoized vector or the partition's own computation.
pub enum Elements<I: Iterator> {
    Cached { data: Arc<Vec<I::Item>>, pos: usize },
    Direct(I),
}

impl<I> Iterator for Elements<I>
where
    I: Iterator,
    I::Item: Clone,
{
    type Item = I::Item;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            Elements::Cached { data, pos } => {
                let item = data.get(*pos).cloned();
                if item.is_some() {
                    *pos += 1;
                }
                item
            }
            Elements::Direct(inner) => inner.next(),
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self {
            Elements::Cached { data, pos } => {
                let remaining = data.len() - *pos;
                (remaining, Some(remaining))
            }
            Elements::Direct(inner) => inner.size_hint(),
        }
    }
}
