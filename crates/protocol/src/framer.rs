//! Line framer and bracket state machine.
//!
//! One framer per connection. Socket reads arrive with arbitrary
//! boundaries; the framer buffers the unterminated tail and classifies
//! each complete line. Outside a block every line becomes a command
//! event immediately; inside a block (`{` .. `}`) lines accumulate and
//! surface as one block event when the outermost bracket closes.

use bytes::BytesMut;

use crate::{Bulk, Command};

/// Per-connection framing state machine.
///
/// Malformed input is data, never an error: a `}` with no open block is
/// ignored, and a block left open at end-of-stream is dropped by
/// [`LineFramer::finish`].
#[derive(Debug, Default)]
pub struct LineFramer {
    /// Bytes accepted but not yet newline-terminated.
    residual: BytesMut,
    /// Bracket nesting depth, never negative.
    depth: usize,
    /// Commands accumulated while `depth > 0`.
    pending: Vec<Command>,
}

/// What one complete line turned into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FramerEvent {
    /// A singleton command parsed outside any block.
    Command(Command),
    /// A complete non-empty block.
    Block(Bulk),
}

/// Result of one [`LineFramer::feed`] call.
#[derive(Debug, Default)]
pub struct FeedOutcome {
    /// Events produced by the complete lines in this chunk.
    pub events: Vec<FramerEvent>,
    /// Complete lines consumed, block markers and empty lines included.
    pub lines: u64,
    /// Payload bytes of those lines, terminators excluded.
    pub bytes: u64,
}

impl LineFramer {
    /// Framer at depth 0 with no buffered bytes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume one chunk of the byte stream.
    ///
    /// Commands are timestamped with the wall-clock second at which their
    /// line is parsed, not when its bytes arrived.
    pub fn feed(&mut self, chunk: &[u8]) -> FeedOutcome {
        self.residual.extend_from_slice(chunk);
        let mut outcome = FeedOutcome::default();
        while let Some(end) = self.residual.iter().position(|&b| b == b'\n') {
            let line = self.residual.split_to(end + 1);
            let line = &line[..line.len() - 1];
            outcome.lines += 1;
            outcome.bytes += line.len() as u64;
            self.accept_line(line, &mut outcome.events);
        }
        outcome
    }

    /// End of stream: drop the unterminated tail and any open block.
    ///
    /// Returns `true` iff a block was still open, i.e. input was lost.
    /// The framer is reset and can be fed again.
    pub fn finish(&mut self) -> bool {
        let abandoned = self.depth > 0;
        self.residual.clear();
        self.pending.clear();
        self.depth = 0;
        abandoned
    }

    fn accept_line(&mut self, line: &[u8], events: &mut Vec<FramerEvent>) {
        if line == b"{" {
            self.depth += 1;
        } else if line == b"}" {
            // A close with no open block is ignored.
            if self.depth > 0 {
                self.depth -= 1;
                if self.depth == 0 && !self.pending.is_empty() {
                    let commands = std::mem::take(&mut self.pending);
                    events.push(FramerEvent::Block(Bulk::from(commands)));
                }
            }
        } else if line.is_empty() {
            // A command payload is never empty; blank lines carry nothing.
        } else {
            let command = Command::new(line.to_vec());
            if self.depth > 0 {
                self.pending.push(command);
            } else {
                events.push(FramerEvent::Command(command));
            }
        }
    }
}
