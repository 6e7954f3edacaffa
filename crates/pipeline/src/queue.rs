//! Bounded blocking queue with end-of-stream signalling.
//!
//! The queue is the sole coordination primitive of the pipeline: `put` is
//! the only place backpressure is exerted and `get` the only place a
//! worker waits for input. Everything else in the core is straight-line
//! code between a `get` and a `put`.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

use crate::{PipelineError, Result};

/// FIFO with blocking put/get, a close latch, and put/get counters.
///
/// Capacity 0 means unbounded: `put` never blocks. Any other capacity
/// blocks producers while the queue is full, which is how downstream
/// slowness propagates upstream.
///
/// Delivery is single-consumption: each value is observed by exactly one
/// `get`. Ordering is FIFO per producer; values from different producers
/// interleave in arrival order at the queue mutex.
#[derive(Debug)]
pub struct Queue<T> {
    state: Mutex<State<T>>,
    not_empty: Condvar,
    not_full: Condvar,
    capacity: usize,
}

#[derive(Debug)]
struct State<T> {
    items: VecDeque<T>,
    closed: bool,
    put_count: u64,
    get_count: u64,
}

impl<T> Queue<T> {
    /// Create a queue with the given capacity (0 = unbounded).
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Mutex::new(State {
                items: VecDeque::new(),
                closed: false,
                put_count: 0,
                get_count: 0,
            }),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
            capacity,
        }
    }

    /// Append a value, blocking while a bounded queue is full.
    ///
    /// Fails with [`PipelineError::Closed`] once the queue is closed,
    /// whether on entry or while waiting for space.
    pub fn put(&self, value: T) -> Result<()> {
        let mut state = self.lock();
        loop {
            if state.closed {
                return Err(PipelineError::Closed);
            }
            if self.capacity == 0 || state.items.len() < self.capacity {
                break;
            }
            state = self.wait(&self.not_full, state);
        }
        state.items.push_back(value);
        state.put_count += 1;
        self.not_empty.notify_one();
        Ok(())
    }

    /// Pop the next value, blocking while the queue is open and empty.
    ///
    /// Returns `None` only once the queue is both closed and drained, so
    /// no value put before `close` is ever lost.
    pub fn get(&self) -> Option<T> {
        let mut state = self.lock();
        loop {
            if let Some(value) = state.items.pop_front() {
                state.get_count += 1;
                self.not_full.notify_one();
                return Some(value);
            }
            if state.closed {
                return None;
            }
            state = self.wait(&self.not_empty, state);
        }
    }

    /// Close the queue and wake every waiter. Idempotent.
    pub fn close(&self) {
        let mut state = self.lock();
        state.closed = true;
        self.not_empty.notify_all();
        self.not_full.notify_all();
    }

    /// True once `close` has been called.
    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Number of buffered values right now.
    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    /// True when no values are buffered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Configured capacity (0 = unbounded).
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Total values accepted by `put`.
    pub fn put_count(&self) -> u64 {
        self.lock().put_count
    }

    /// Total values delivered by `get`.
    pub fn get_count(&self) -> u64 {
        self.lock().get_count
    }

    fn lock(&self) -> MutexGuard<'_, State<T>> {
        // A worker that panicked mid-operation must not wedge survivors.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn wait<'a>(
        &self,
        condvar: &Condvar,
        guard: MutexGuard<'a, State<T>>,
    ) -> MutexGuard<'a, State<T>> {
        condvar.wait(guard).unwrap_or_else(PoisonError::into_inner)
    }
}
