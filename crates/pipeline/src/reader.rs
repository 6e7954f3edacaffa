//! Reader stage: one per connection, turns byte chunks into tagged records.

use std::sync::Arc;

use bytes::Bytes;

use bulkd_metrics::{keys, Recorder};
use bulkd_protocol::{FramerEvent, LineFramer, ProducerId, Record};

use crate::stage::forward;
use crate::{Queue, Result, Stage, Worker};

/// Per-connection framing stage.
///
/// Owns the line framer and bracket state machine for one byte stream and
/// emits [`Record`]s to the shared mixer input. A reader never fails the
/// pipeline: malformed lines are data, and the socket layer signals
/// end-of-stream by calling [`Reader::join`], which makes the worker drop
/// any unterminated block and emit `Eof` for this reader's producer id.
pub struct Reader {
    stage: Stage<Bytes>,
    producer: ProducerId,
    mixer_input: Arc<Queue<Record>>,
    recorder: Arc<dyn Recorder>,
}

impl Reader {
    /// Create a reader feeding `mixer_input`, with a fresh producer id.
    pub fn new(
        capacity: usize,
        mixer_input: Arc<Queue<Record>>,
        recorder: Arc<dyn Recorder>,
    ) -> Self {
        Self {
            stage: Stage::new("reader", capacity, Arc::clone(&recorder)),
            producer: ProducerId::next(),
            mixer_input,
            recorder,
        }
    }

    /// This reader's producer tag.
    pub fn producer(&self) -> ProducerId {
        self.producer
    }

    /// The byte input queue; the socket layer puts chunks here.
    pub fn input(&self) -> Arc<Queue<Bytes>> {
        self.stage.input()
    }

    /// Forward one received chunk, blocking on backpressure.
    pub fn put(&self, chunk: Bytes) -> Result<()> {
        self.stage.put(chunk)
    }

    /// Start the framer worker.
    pub fn run(&mut self) -> Result<()> {
        let producer = self.producer;
        let mixer_input = Arc::clone(&self.mixer_input);
        let recorder = Arc::clone(&self.recorder);
        self.stage.run(1, move |_| ReaderWorker {
            framer: LineFramer::new(),
            producer,
            mixer_input: Arc::clone(&mixer_input),
            recorder: Arc::clone(&recorder),
        })
    }

    /// Close the byte input and wait for the end-of-stream flush. Idempotent.
    pub fn join(&mut self) {
        self.stage.join();
    }
}

struct ReaderWorker {
    framer: LineFramer,
    producer: ProducerId,
    mixer_input: Arc<Queue<Record>>,
    recorder: Arc<dyn Recorder>,
}

impl ReaderWorker {
    fn emit(&self, record: Record) {
        forward(&self.mixer_input, record, "reader");
    }
}

impl Worker<Bytes> for ReaderWorker {
    fn process(&mut self, chunk: Bytes, _worker_index: usize) {
        let outcome = self.framer.feed(&chunk);
        if outcome.lines > 0 {
            self.recorder
                .update(keys::READER_LINE_COUNT, outcome.lines as i64);
            self.recorder
                .update(keys::READER_LINE_SIZE, outcome.bytes as i64);
        }
        for event in outcome.events {
            match event {
                FramerEvent::Command(command) => {
                    self.recorder.update(keys::READER_MIX_COMMANDS, 1);
                    self.emit(Record::command(self.producer, command));
                }
                FramerEvent::Block(bulk) => {
                    self.recorder.update(keys::READER_MIX_BLOCK_COUNT, 1);
                    self.recorder
                        .update(keys::READER_MIX_BLOCK_SIZE, bulk.len() as i64);
                    self.emit(Record::block(self.producer, bulk));
                }
            }
        }
    }

    fn finish(&mut self, _worker_index: usize) {
        if self.framer.finish() {
            self.recorder.update(keys::READER_MIX_EOF, 1);
        }
        self.emit(Record::eof(self.producer));
    }
}
