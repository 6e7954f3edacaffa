//! bulkd - Pipeline
//!
//! The bounded multi-stage pipeline: blocking queues, the stage worker
//! harness, and the reader / mixer / distributor stages.
//!
//! # Architecture
//!
//! ```text
//! [Readers]                     [Mixer]                  [Distributor]       [Sinks]
//!   conn 0 ──┐                                                            ┌──→ console
//!   conn 1 ──┼──→ Queue<Record> ──→ size-N coalesce ──→ Queue<Bulk> ──────┤
//!   conn 2 ──┘      (shared)         + block pass-through    (broadcast)  └──→ file
//! ```
//!
//! # Key Design
//!
//! - **Queues are the only blocking point**: every stage owns a bounded
//!   [`Queue`] and backpressure is just `put` waiting for space. Slowness
//!   propagates sink → distributor → mixer → readers → socket.
//! - **OS threads, no event loop**: each stage runs one or more preemptive
//!   worker threads via the [`Stage`] harness; termination is cooperative
//!   through `close()` observed at the next `get`.
//! - **Single-consumer stateful stages**: the mixer and distributor each
//!   run exactly one worker, so their state machines need no extra locks.
//! - **Tagged records**: readers tag everything they emit with a
//!   [`ProducerId`](bulkd_protocol::ProducerId), which is what lets the
//!   mixer flush one disconnecting client without disturbing the others.
//!
//! # Lifecycle
//!
//! Start leaves-first (sinks, distributor, mixer, readers); shut down in
//! reverse. `join()` closes a stage's input queue and is that queue's sole
//! closer; calling it twice is a no-op.

mod distributor;
mod error;
mod mixer;
mod queue;
mod reader;
mod stage;

pub use distributor::Distributor;
pub use error::{PipelineError, Result};
pub use mixer::Mixer;
pub use queue::Queue;
pub use reader::Reader;
pub use stage::{Stage, Worker};

/// Default capacity for stage input queues.
pub const DEFAULT_QUEUE_CAPACITY: usize = 10;

#[cfg(test)]
mod mixer_test;
#[cfg(test)]
mod queue_test;
#[cfg(test)]
mod reader_test;
