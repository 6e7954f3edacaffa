//! bulkd - Protocol
//!
//! The data model that flows through the pipeline and the framer that
//! produces it from raw socket bytes.
//!
//! # Wire format
//!
//! Clients stream newline-delimited ASCII. A line is either a singleton
//! command, or one of the byte-exact block markers `{` / `}` delimiting a
//! group of commands that must reach the sinks as one unit:
//!
//! ```text
//! cmd1\n
//! cmd2\n
//! {\n
//! cmd3\n
//! cmd4\n
//! }\n
//! ```
//!
//! # Types
//!
//! - [`Command`]: one parsed line plus its wall-clock second.
//! - [`Bulk`]: the ordered group of commands sinks consume as a unit.
//! - [`Record`]: what a reader tells the mixer (a command, a complete
//!   block, or end-of-stream), tagged with the reader's [`ProducerId`].
//! - [`LineFramer`]: the per-connection state machine turning byte chunks
//!   into framer events, tolerant of arbitrary chunk boundaries.

mod command;
mod framer;
mod record;

pub use command::{Bulk, Command};
pub use framer::{FeedOutcome, FramerEvent, LineFramer};
pub use record::{ProducerId, Record, RecordKind};
