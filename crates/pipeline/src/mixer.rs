//! Mixer stage: coalesces singleton commands into size-N bulks.
//!
//! One mixer serves every reader. Singleton commands from all producers
//! interleave into shared bulks of `bulk_size`; explicit blocks pass
//! through untouched. The per-producer flush on `Block` and `Eof` keeps
//! one client's ordering intact across the singleton/block boundary
//! without disturbing what other clients have pending.

use std::sync::Arc;

use bulkd_metrics::{keys, Recorder};
use bulkd_protocol::{Bulk, Command, ProducerId, Record, RecordKind};

use crate::stage::forward;
use crate::{Queue, Result, Stage, Worker};

/// Cross-producer coalescing stage.
pub struct Mixer {
    stage: Stage<Record>,
    bulk_size: usize,
    downstream: Arc<Queue<Bulk>>,
    recorder: Arc<dyn Recorder>,
}

impl Mixer {
    /// Create a mixer emitting to `downstream`.
    ///
    /// `bulk_size` 0 disables the size cap: bulks then form only on
    /// block boundaries, producer end-of-stream, and shutdown.
    pub fn new(
        bulk_size: usize,
        capacity: usize,
        downstream: Arc<Queue<Bulk>>,
        recorder: Arc<dyn Recorder>,
    ) -> Self {
        Self {
            stage: Stage::new("mixer", capacity, Arc::clone(&recorder)),
            bulk_size,
            downstream,
            recorder,
        }
    }

    /// The shared record input every reader emits into.
    pub fn input(&self) -> Arc<Queue<Record>> {
        self.stage.input()
    }

    /// Forward one record, blocking on backpressure.
    pub fn put(&self, record: Record) -> Result<()> {
        self.stage.put(record)
    }

    /// Start the mixer.
    ///
    /// Exactly one worker: the pending list is race-free only with a
    /// single consumer.
    pub fn run(&mut self) -> Result<()> {
        let bulk_size = self.bulk_size;
        let downstream = Arc::clone(&self.downstream);
        let recorder = Arc::clone(&self.recorder);
        self.stage.run(1, move |_| MixerWorker {
            bulk_size,
            pending: Vec::new(),
            downstream: Arc::clone(&downstream),
            recorder: Arc::clone(&recorder),
        })
    }

    /// Close the record input and wait for the final flush. Idempotent.
    pub fn join(&mut self) {
        self.stage.join();
    }
}

struct MixerWorker {
    bulk_size: usize,
    /// Commands awaiting coalescing, each tagged with its producer.
    pending: Vec<(Command, ProducerId)>,
    downstream: Arc<Queue<Bulk>>,
    recorder: Arc<dyn Recorder>,
}

impl MixerWorker {
    fn send(&self, bulk: Bulk) {
        if bulk.is_empty() {
            return;
        }
        self.recorder.update(keys::MIXER_SEND_BLOCKS, 1);
        self.recorder
            .update(keys::MIXER_SEND_COMMANDS, bulk.len() as i64);
        forward(&self.downstream, bulk, "mixer");
    }

    fn flush_pending(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        let commands: Vec<Command> = self.pending.drain(..).map(|(command, _)| command).collect();
        self.send(Bulk::from(commands));
    }

    fn has_pending_from(&self, producer: ProducerId) -> bool {
        self.pending.iter().any(|(_, tag)| *tag == producer)
    }
}

impl Worker<Record> for MixerWorker {
    fn process(&mut self, record: Record, _worker_index: usize) {
        let (producer, kind) = record.into_parts();
        match kind {
            RecordKind::Command(command) => {
                self.pending.push((command, producer));
                if self.bulk_size > 0 && self.pending.len() == self.bulk_size {
                    self.flush_pending();
                }
            }
            RecordKind::Block(bulk) => {
                // The producer's singletons must reach the sinks before
                // its block; everyone else's pending commands ride along.
                if self.has_pending_from(producer) {
                    self.flush_pending();
                }
                self.send(bulk);
            }
            RecordKind::Eof => {
                if self.has_pending_from(producer) {
                    self.flush_pending();
                }
            }
        }
    }

    fn finish(&mut self, _worker_index: usize) {
        self.flush_pending();
    }
}
