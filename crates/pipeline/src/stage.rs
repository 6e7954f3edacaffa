//! Stage worker harness.
//!
//! A stage owns its input [`Queue`] and a set of worker threads. Workers
//! pull items until the input is closed and drained, run a per-worker
//! flush, and exit. Concrete stages (reader, mixer, distributor, sinks)
//! are [`Worker`] implementations composed with this harness rather than
//! a class hierarchy.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use bulkd_metrics::Recorder;

use crate::{PipelineError, Queue, Result};

/// Per-worker stage behaviour.
pub trait Worker<T>: Send {
    /// Handle one item pulled from the stage input.
    fn process(&mut self, item: T, worker_index: usize);

    /// Called once per worker after the input is closed and drained.
    fn finish(&mut self, _worker_index: usize) {}
}

/// Worker-thread harness around an input [`Queue`].
///
/// `run` may only be followed by `join`; the attach targets a worker
/// writes to are captured at `run` and stay fixed for its lifetime.
pub struct Stage<T> {
    name: &'static str,
    input: Arc<Queue<T>>,
    recorder: Arc<dyn Recorder>,
    workers: Vec<JoinHandle<()>>,
}

impl<T: Send + 'static> Stage<T> {
    /// Create a stopped stage with an input queue of `capacity`.
    pub fn new(name: &'static str, capacity: usize, recorder: Arc<dyn Recorder>) -> Self {
        Self {
            name,
            input: Arc::new(Queue::new(capacity)),
            recorder,
            workers: Vec::new(),
        }
    }

    /// The stage input; upstream producers hold this to `put` into it.
    pub fn input(&self) -> Arc<Queue<T>> {
        Arc::clone(&self.input)
    }

    /// Forward a value to the stage input.
    pub fn put(&self, value: T) -> Result<()> {
        self.input.put(value)
    }

    /// Number of worker threads spawned so far.
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Spawn `threads` workers (0 = host parallelism hint, then 1), each
    /// built by `make_worker` from its worker index.
    ///
    /// A panicking worker is contained: the panic is caught, counted
    /// under `<stage>.panic`, and only that worker exits.
    pub fn run<W, F>(&mut self, threads: usize, make_worker: F) -> Result<()>
    where
        W: Worker<T> + 'static,
        F: Fn(usize) -> W,
    {
        let threads = match threads {
            0 => thread::available_parallelism().map(|n| n.get()).unwrap_or(1),
            n => n,
        };
        for index in 0..threads {
            let input = Arc::clone(&self.input);
            let recorder = Arc::clone(&self.recorder);
            let name = self.name;
            let mut worker = make_worker(index);
            let handle = thread::Builder::new()
                .name(format!("{name}-{index}"))
                .spawn(move || {
                    tracing::debug!(stage = name, worker = index, "worker starting");
                    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                        while let Some(item) = input.get() {
                            worker.process(item, index);
                        }
                        worker.finish(index);
                    }));
                    if outcome.is_err() {
                        recorder.update(&format!("{name}.panic"), 1);
                        tracing::error!(stage = name, worker = index, "worker panicked");
                    } else {
                        tracing::debug!(stage = name, worker = index, "worker stopping");
                    }
                })
                .map_err(|source| PipelineError::Spawn {
                    stage: self.name,
                    source,
                })?;
            self.workers.push(handle);
        }
        Ok(())
    }

    /// Close the input and wait for every worker. Idempotent.
    pub fn join(&mut self) {
        self.input.close();
        for handle in self.workers.drain(..) {
            // A worker panic was already caught and logged inside the thread.
            let _ = handle.join();
        }
    }
}

impl<T> std::fmt::Debug for Stage<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stage")
            .field("name", &self.name)
            .field("workers", &self.workers.len())
            .finish()
    }
}

/// Forward a value to a downstream queue.
///
/// A closed downstream here is a lifecycle violation (the core never puts
/// after `join`), so the value is dropped rather than killing the worker.
pub(crate) fn forward<T>(queue: &Queue<T>, value: T, stage: &'static str) {
    if queue.put(value).is_err() {
        debug_assert!(false, "{stage}: put after close");
        tracing::warn!(stage, "downstream queue closed, record dropped");
    }
}
