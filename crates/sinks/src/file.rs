//! File sink: each bulk becomes its own log file.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use bulkd_metrics::Recorder;
use bulkd_pipeline::{Queue, Result, Stage, Worker, DEFAULT_QUEUE_CAPACITY};
use bulkd_protocol::Bulk;

/// File sink configuration.
#[derive(Debug, Clone)]
pub struct FileSinkConfig {
    /// Directory the log files are written into.
    pub dir: PathBuf,

    /// Input queue capacity (0 = unbounded).
    pub capacity: usize,
}

impl Default for FileSinkConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
            capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

impl FileSinkConfig {
    /// Config writing into `dir`.
    #[must_use]
    pub fn with_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dir = dir.into();
        self
    }
}

/// Per-bulk file sink.
///
/// File names are `bulk<T>-<S>.log`: `T` is the first command's
/// timestamp, `S` a serial per distinct `T` starting at 0. The serial map
/// is shared across the sink's workers, so concurrent bulks with the same
/// timestamp still get distinct files. One payload line per command.
pub struct FileSink {
    stage: Stage<Bulk>,
    dir: PathBuf,
    serials: Arc<Mutex<HashMap<i64, u64>>>,
}

impl FileSink {
    /// Create a file sink; the directory must already exist.
    pub fn new(config: FileSinkConfig, recorder: Arc<dyn Recorder>) -> Self {
        Self {
            stage: Stage::new("file", config.capacity, recorder),
            dir: config.dir,
            serials: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// The bulk input queue; attach this to the distributor.
    pub fn input(&self) -> Arc<Queue<Bulk>> {
        self.stage.input()
    }

    /// Start `workers` writer threads (0 = host parallelism hint).
    pub fn run(&mut self, workers: usize) -> Result<()> {
        let dir = self.dir.clone();
        let serials = Arc::clone(&self.serials);
        self.stage.run(workers, move |_| FileWorker {
            dir: dir.clone(),
            serials: Arc::clone(&serials),
        })
    }

    /// Close the input and wait for the remaining bulks. Idempotent.
    pub fn join(&mut self) {
        self.stage.join();
    }
}

struct FileWorker {
    dir: PathBuf,
    serials: Arc<Mutex<HashMap<i64, u64>>>,
}

impl FileWorker {
    /// Serial for this timestamp: 0 on first use, then counting up.
    fn next_serial(&self, timestamp: i64) -> u64 {
        let mut serials = self.serials.lock().unwrap_or_else(PoisonError::into_inner);
        match serials.entry(timestamp) {
            Entry::Occupied(mut entry) => {
                let serial = entry.get_mut();
                *serial += 1;
                *serial
            }
            Entry::Vacant(entry) => {
                entry.insert(0);
                0
            }
        }
    }
}

impl Worker<Bulk> for FileWorker {
    fn process(&mut self, bulk: Bulk, _worker_index: usize) {
        let Some(timestamp) = bulk.first_timestamp() else {
            return;
        };
        let serial = self.next_serial(timestamp);
        let path = self.dir.join(format!("bulk{timestamp}-{serial}.log"));
        if let Err(error) = write_bulk(&path, &bulk) {
            tracing::warn!(path = %path.display(), %error, "file sink write failed");
        }
    }
}

fn write_bulk(path: &Path, bulk: &Bulk) -> std::io::Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    for command in bulk.commands() {
        out.write_all(command.payload())?;
        out.write_all(b"\n")?;
    }
    out.flush()
}
