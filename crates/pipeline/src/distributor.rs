//! Distributor stage: broadcasts each bulk to every subscriber.

use std::sync::Arc;

use bulkd_metrics::{keys, Recorder};
use bulkd_protocol::Bulk;

use crate::stage::forward;
use crate::{Queue, Result, Stage, Worker};

/// Fan-out broadcast stage.
///
/// Subscribers are attached before `run` and fixed for the whole run;
/// each bulk is put into every subscriber queue in attach order. A slow
/// subscriber blocks the broadcast, which is the backpressure path back
/// to the mixer and the readers.
pub struct Distributor {
    stage: Stage<Bulk>,
    subscribers: Vec<Arc<Queue<Bulk>>>,
    recorder: Arc<dyn Recorder>,
}

impl Distributor {
    /// Create a distributor with no subscribers.
    pub fn new(capacity: usize, recorder: Arc<dyn Recorder>) -> Self {
        Self {
            stage: Stage::new("distributor", capacity, Arc::clone(&recorder)),
            subscribers: Vec::new(),
            recorder,
        }
    }

    /// Subscribe a downstream queue. Only meaningful before `run`.
    pub fn attach(&mut self, subscriber: Arc<Queue<Bulk>>) {
        self.subscribers.push(subscriber);
    }

    /// Number of attached subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// The bulk input the mixer emits into.
    pub fn input(&self) -> Arc<Queue<Bulk>> {
        self.stage.input()
    }

    /// Forward one bulk, blocking on backpressure.
    pub fn put(&self, bulk: Bulk) -> Result<()> {
        self.stage.put(bulk)
    }

    /// Start the broadcast worker (single consumer).
    pub fn run(&mut self) -> Result<()> {
        let subscribers = self.subscribers.clone();
        let recorder = Arc::clone(&self.recorder);
        self.stage.run(1, move |_| DistributorWorker {
            subscribers: subscribers.clone(),
            recorder: Arc::clone(&recorder),
        })
    }

    /// Close the bulk input and wait for the broadcast to drain. Idempotent.
    pub fn join(&mut self) {
        self.stage.join();
    }
}

struct DistributorWorker {
    subscribers: Vec<Arc<Queue<Bulk>>>,
    recorder: Arc<dyn Recorder>,
}

impl Worker<Bulk> for DistributorWorker {
    fn process(&mut self, bulk: Bulk, _worker_index: usize) {
        // Sinks never observe an empty bulk.
        if bulk.is_empty() {
            return;
        }
        self.recorder.update(keys::DISTRIBUTOR_BLOCKS, 1);
        self.recorder
            .update(keys::DISTRIBUTOR_COMMANDS, bulk.len() as i64);
        for subscriber in &self.subscribers {
            forward(subscriber, bulk.clone(), "distributor");
        }
    }
}
