//! Command and bulk containers.
//!
//! Payloads are `bytes::Bytes`, so cloning a [`Bulk`] for multi-sink
//! fan-out shares the underlying line data instead of copying it.

use bytes::Bytes;

/// One parsed input line with its wall-clock arrival second.
///
/// The payload is non-empty and never contains a newline; both are
/// guaranteed by the framer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    timestamp: i64,
    payload: Bytes,
}

impl Command {
    /// Command stamped with the current UTC second.
    pub fn new(payload: impl Into<Bytes>) -> Self {
        Self::at(chrono::Utc::now().timestamp(), payload)
    }

    /// Command with an explicit timestamp.
    pub fn at(timestamp: i64, payload: impl Into<Bytes>) -> Self {
        Self {
            timestamp,
            payload: payload.into(),
        }
    }

    /// Seconds since the UNIX epoch at the moment the line was parsed.
    #[inline]
    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    /// The line content, without its terminator.
    #[inline]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }
}

/// An ordered group of commands published to sinks as one unit.
///
/// Sinks only ever observe non-empty bulks; the mixer and distributor
/// suppress empty ones.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bulk {
    commands: Vec<Command>,
}

impl Bulk {
    /// Create an empty bulk.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a command, preserving source order.
    pub fn push(&mut self, command: Command) {
        self.commands.push(command);
    }

    /// Number of commands in the bulk.
    #[inline]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// True when the bulk holds no commands.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// The commands in source order.
    #[inline]
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Timestamp of the first command; names the file sink's output.
    pub fn first_timestamp(&self) -> Option<i64> {
        self.commands.first().map(Command::timestamp)
    }
}

impl From<Vec<Command>> for Bulk {
    fn from(commands: Vec<Command>) -> Self {
        Self { commands }
    }
}
