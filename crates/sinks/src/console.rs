//! Console sink: one `bulk:` line per bulk on the configured writer.

use std::io::Write;
use std::sync::{Arc, Mutex, PoisonError};

use bulkd_metrics::Recorder;
use bulkd_pipeline::{Queue, Result, Stage, Worker};
use bulkd_protocol::Bulk;

/// Stream sink writing `bulk: c1, c2, ..., cK` per bulk.
///
/// All workers share one writer behind a mutex, so concurrent bulks never
/// interleave within a line. Everything, separators included, goes to the
/// configured writer.
pub struct ConsoleSink<W: Write + Send + 'static> {
    stage: Stage<Bulk>,
    out: Arc<Mutex<W>>,
}

impl ConsoleSink<std::io::Stdout> {
    /// Console sink on stdout.
    pub fn stdout(capacity: usize, recorder: Arc<dyn Recorder>) -> Self {
        Self::new(std::io::stdout(), capacity, recorder)
    }
}

impl<W: Write + Send + 'static> ConsoleSink<W> {
    /// Console sink on an arbitrary writer.
    pub fn new(out: W, capacity: usize, recorder: Arc<dyn Recorder>) -> Self {
        Self {
            stage: Stage::new("console", capacity, recorder),
            out: Arc::new(Mutex::new(out)),
        }
    }

    /// The bulk input queue; attach this to the distributor.
    pub fn input(&self) -> Arc<Queue<Bulk>> {
        self.stage.input()
    }

    /// Start `workers` writer threads (0 = host parallelism hint).
    pub fn run(&mut self, workers: usize) -> Result<()> {
        let out = Arc::clone(&self.out);
        self.stage.run(workers, move |_| ConsoleWorker {
            out: Arc::clone(&out),
        })
    }

    /// Close the input and wait for the remaining bulks. Idempotent.
    pub fn join(&mut self) {
        self.stage.join();
    }
}

struct ConsoleWorker<W> {
    out: Arc<Mutex<W>>,
}

impl<W: Write + Send> Worker<Bulk> for ConsoleWorker<W> {
    fn process(&mut self, bulk: Bulk, _worker_index: usize) {
        if bulk.is_empty() {
            return;
        }
        let mut out = self.out.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(error) = write_bulk(&mut *out, &bulk) {
            tracing::warn!(%error, "console sink write failed");
        }
    }
}

fn write_bulk<W: Write>(out: &mut W, bulk: &Bulk) -> std::io::Result<()> {
    out.write_all(b"bulk: ")?;
    for (index, command) in bulk.commands().iter().enumerate() {
        if index > 0 {
            out.write_all(b", ")?;
        }
        out.write_all(command.payload())?;
    }
    out.write_all(b"\n")?;
    out.flush()
}
