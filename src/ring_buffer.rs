//! # Bounded Ring Buffer
//!
//! Fixed-capacity circular container with overwrite-on-full semantics. This is
//! the piece that lets arbitrary application threads hand off log lines
//! without ever waiting on the slow side of the pipeline.
//!
//! ## Behaviour
//!
//! - **Push never fails**: a push into a full buffer is accepted and the oldest
//!   unread element is discarded to make room.
//! - **Pop never blocks**: an empty buffer yields `None`.
//! - **Wrap rule**: `write == read` means empty, so at most `capacity - 1`
//!   elements are retrievable at any moment.
//! - **Metrics**: buffered count, load percentile and the lifetime push total
//!   are always consistent with the most recent push or pop.
//!
//! ## Locking
//!
//! A single `parking_lot::Mutex` guards the slots, both cursors and the push
//! counter. Observers live behind a separate `RwLock` and are invoked only
//! after the state lock has been released, so an observer may freely call
//! back into the buffer.

use crate::error::{LoggerError, Result};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Metrics tracked by the buffer and reported to observers when they change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BufferMetric {
    BufferedElementCount,
    LoadPercentile,
    TotalPushed,
}

/// Handle returned by [`BoundedRingBuffer::subscribe`].
pub type ObserverId = u64;

type Observer = Arc<dyn Fn(BufferMetric) + Send + Sync>;

/// Point-in-time view of the buffer state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BufferSnapshot {
    pub capacity: usize,
    pub write_cursor: usize,
    pub read_cursor: usize,
    pub buffered_count: usize,
    pub load_percentile: u64,
    pub total_pushed: u64,
}

/// Load formula with the `+1` bias: reports 100 once `capacity - 1` elements
/// are buffered, and more than 100 is representable.
fn load_percentile(buffered_count: usize, capacity: usize) -> u64 {
    ((buffered_count as u64 + 1) * 100) / capacity as u64
}

struct RingState<T> {
    slots: Vec<Option<T>>,
    write: usize,
    read: usize,
    total_pushed: u64,
}

impl<T> RingState<T> {
    fn capacity(&self) -> usize {
        self.slots.len()
    }

    fn buffered_count(&self) -> usize {
        if self.write == self.read {
            0
        } else {
            (self.write + self.capacity() - self.read) % self.capacity()
        }
    }

    fn load_percentile(&self) -> u64 {
        load_percentile(self.buffered_count(), self.capacity())
    }
}

/// Which metrics a single mutation changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct MetricChanges {
    buffered_count: bool,
    load_percentile: bool,
    total_pushed: bool,
}

impl MetricChanges {
    fn is_empty(&self) -> bool {
        !(self.buffered_count || self.load_percentile || self.total_pushed)
    }

    fn iter(self) -> impl Iterator<Item = BufferMetric> {
        [
            (self.buffered_count, BufferMetric::BufferedElementCount),
            (self.load_percentile, BufferMetric::LoadPercentile),
            (self.total_pushed, BufferMetric::TotalPushed),
        ]
        .into_iter()
        .filter_map(|(changed, metric)| changed.then_some(metric))
    }
}

/// Thread-safe bounded ring buffer shared between many producers and one
/// draining consumer.
pub struct BoundedRingBuffer<T> {
    state: Mutex<RingState<T>>,
    observers: RwLock<Vec<(ObserverId, Observer)>>,
    next_observer_id: AtomicU64,
}

impl<T> BoundedRingBuffer<T> {
    /// Create a buffer with `capacity` pre-allocated slots.
    ///
    /// Fails with [`LoggerError::InvalidCapacity`] when `capacity` is zero.
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity < 1 {
            return Err(LoggerError::InvalidCapacity(capacity));
        }

        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || None);

        Ok(Self {
            state: Mutex::new(RingState {
                slots,
                write: 0,
                read: 0,
                total_pushed: 0,
            }),
            observers: RwLock::new(Vec::new()),
            next_observer_id: AtomicU64::new(1),
        })
    }

    /// Insert an element, discarding the oldest unread one if the buffer is full.
    pub fn push(&self, elem: T) {
        let (changes, _evicted) = {
            let mut state = self.state.lock();
            let count_before = state.buffered_count();
            let load_before = state.load_percentile();
            let capacity = state.capacity();

            let write = state.write;
            state.slots[write] = Some(elem);
            state.write = (write + 1) % capacity;

            let mut evicted = None;
            if state.write == state.read {
                let read = state.read;
                evicted = state.slots[read].take();
                state.read = (read + 1) % capacity;
            }
            state.total_pushed += 1;

            let changes = MetricChanges {
                buffered_count: state.buffered_count() != count_before,
                load_percentile: state.load_percentile() != load_before,
                total_pushed: true,
            };
            (changes, evicted)
        };

        self.notify(changes);
    }

    /// Remove and return the oldest unread element, or `None` when empty.
    ///
    /// An empty pop leaves the buffer untouched and notifies nobody.
    pub fn pop(&self) -> Option<T> {
        let (elem, changes) = {
            let mut state = self.state.lock();
            if state.write == state.read {
                return None;
            }
            let count_before = state.buffered_count();
            let load_before = state.load_percentile();
            let capacity = state.capacity();

            let read = state.read;
            let elem = state.slots[read].take();
            state.read = (read + 1) % capacity;

            let changes = MetricChanges {
                buffered_count: state.buffered_count() != count_before,
                load_percentile: state.load_percentile() != load_before,
                total_pushed: false,
            };
            (elem, changes)
        };

        self.notify(changes);
        elem
    }

    /// Clones of the unread elements, oldest first. Nothing is consumed.
    pub fn buffered_items(&self) -> Vec<T>
    where
        T: Clone,
    {
        let state = self.state.lock();
        let capacity = state.capacity();
        (0..state.buffered_count())
            .filter_map(|offset| state.slots[(state.read + offset) % capacity].clone())
            .collect()
    }

    pub fn capacity(&self) -> usize {
        self.state.lock().capacity()
    }

    /// Number of unread elements currently retrievable.
    pub fn buffered_count(&self) -> usize {
        self.state.lock().buffered_count()
    }

    pub fn is_empty(&self) -> bool {
        self.buffered_count() == 0
    }

    /// `floor((buffered_count + 1) / capacity * 100)`; may exceed 100.
    pub fn load_percentile(&self) -> u64 {
        self.state.lock().load_percentile()
    }

    /// Lifetime number of `push` calls, overwritten elements included.
    pub fn total_pushed(&self) -> u64 {
        self.state.lock().total_pushed
    }

    pub fn snapshot(&self) -> BufferSnapshot {
        let state = self.state.lock();
        BufferSnapshot {
            capacity: state.capacity(),
            write_cursor: state.write,
            read_cursor: state.read,
            buffered_count: state.buffered_count(),
            load_percentile: state.load_percentile(),
            total_pushed: state.total_pushed,
        }
    }

    /// Single-line human-readable description of the buffer state.
    pub fn status(&self) -> String {
        let snapshot = self.snapshot();
        format!(
            "capacity={} write={} read={} buffered={} total_pushed={}",
            snapshot.capacity,
            snapshot.write_cursor,
            snapshot.read_cursor,
            snapshot.buffered_count,
            snapshot.total_pushed
        )
    }

    /// Register an observer invoked on the mutating thread whenever a tracked
    /// metric changes.
    pub fn subscribe<F>(&self, observer: F) -> ObserverId
    where
        F: Fn(BufferMetric) + Send + Sync + 'static,
    {
        let id = self.next_observer_id.fetch_add(1, Ordering::Relaxed);
        self.observers.write().push((id, Arc::new(observer)));
        id
    }

    /// Remove a previously registered observer. Returns false if it was unknown.
    pub fn unsubscribe(&self, id: ObserverId) -> bool {
        let mut observers = self.observers.write();
        let before = observers.len();
        observers.retain(|(observer_id, _)| *observer_id != id);
        observers.len() != before
    }

    // Called with the state lock already released.
    fn notify(&self, changes: MetricChanges) {
        if changes.is_empty() {
            return;
        }

        let observers: Vec<Observer> = {
            let guard = self.observers.read();
            if guard.is_empty() {
                return;
            }
            guard.iter().map(|(_, observer)| Arc::clone(observer)).collect()
        };

        for metric in changes.iter() {
            for observer in &observers {
                observer(metric);
            }
        }
    }
}

impl<T> fmt::Display for BoundedRingBuffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BoundedRingBuffer[{}]", self.status())
    }
}

impl<T> fmt::Debug for BoundedRingBuffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundedRingBuffer")
            .field("snapshot", &self.snapshot())
            .field("observers", &self.observers.read().len())
            .finish()
    }
}
