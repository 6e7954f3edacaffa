//! Mixer input records and producer identity.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::{Bulk, Command};

static NEXT_PRODUCER_ID: AtomicU64 = AtomicU64::new(0);

/// Stable opaque tag distinguishing one reader from another.
///
/// Allocated once per reader at construction; the mixer uses it for its
/// per-producer flush decisions. Deliberately not a thread id: the tag
/// stays correct even if a reader's work migrates between threads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProducerId(u64);

impl ProducerId {
    /// Allocate the next process-wide id.
    pub fn next() -> Self {
        Self(NEXT_PRODUCER_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ProducerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "producer:{}", self.0)
    }
}

/// What a reader observed, tagged with who observed it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    producer: ProducerId,
    kind: RecordKind,
}

/// The three things a reader can tell the mixer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordKind {
    /// A singleton command, eligible for size-N coalescing.
    Command(Command),
    /// A complete `{`..`}` block; passes through the mixer atomically.
    Block(Bulk),
    /// The reader's stream ended; flush its pending commands.
    Eof,
}

impl Record {
    /// A singleton command from `producer`.
    pub fn command(producer: ProducerId, command: Command) -> Self {
        Self {
            producer,
            kind: RecordKind::Command(command),
        }
    }

    /// A complete block from `producer`.
    pub fn block(producer: ProducerId, bulk: Bulk) -> Self {
        Self {
            producer,
            kind: RecordKind::Block(bulk),
        }
    }

    /// End-of-stream for `producer`.
    pub fn eof(producer: ProducerId) -> Self {
        Self {
            producer,
            kind: RecordKind::Eof,
        }
    }

    /// Who produced this record.
    #[inline]
    pub fn producer(&self) -> ProducerId {
        self.producer
    }

    /// The record payload.
    #[inline]
    pub fn kind(&self) -> &RecordKind {
        &self.kind
    }

    /// Split into producer tag and payload for dispatch.
    pub fn into_parts(self) -> (ProducerId, RecordKind) {
        (self.producer, self.kind)
    }
}
