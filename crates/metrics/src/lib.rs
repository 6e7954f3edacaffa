//! bulkd - Metrics
//!
//! String-keyed counter registry for pipeline observability.
//!
//! # Design
//!
//! - **Injected, not global**: every component that records events holds an
//!   `Arc<dyn Recorder>` handed to it at construction. Tests substitute an
//!   in-memory stub or [`NullRecorder`]; nothing reaches for a singleton.
//! - **One operation**: [`Recorder::update`] bumps a named counter by a
//!   signed delta. Counters never feed back into pipeline behaviour.
//! - **Snapshot at the end**: [`Registry::snapshot`] and
//!   [`Registry::render`] produce the shutdown dump.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use bulkd_metrics::{keys, Recorder, Registry};
//!
//! let registry = Arc::new(Registry::new());
//! let recorder: Arc<dyn Recorder> = registry.clone();
//! recorder.update(keys::READER_LINE_COUNT, 3);
//! assert_eq!(registry.value(keys::READER_LINE_COUNT), 3);
//! ```

mod registry;

pub use registry::{NullRecorder, Recorder, Registry};

/// Counter keys recorded by the core stages.
pub mod keys {
    /// Complete lines parsed by readers.
    pub const READER_LINE_COUNT: &str = "reader.line.count";
    /// Bytes of line payload parsed by readers (terminators excluded).
    pub const READER_LINE_SIZE: &str = "reader.line.size";
    /// Singleton commands forwarded to the mixer.
    pub const READER_MIX_COMMANDS: &str = "reader.mix.commands";
    /// Explicit blocks forwarded to the mixer.
    pub const READER_MIX_BLOCK_COUNT: &str = "reader.mix.block.count";
    /// Commands inside forwarded blocks.
    pub const READER_MIX_BLOCK_SIZE: &str = "reader.mix.block.size";
    /// Unterminated blocks abandoned at end-of-stream.
    pub const READER_MIX_EOF: &str = "reader.mix.eof";
    /// Bulks emitted by the mixer.
    pub const MIXER_SEND_BLOCKS: &str = "mixer.send.blocks";
    /// Commands inside bulks emitted by the mixer.
    pub const MIXER_SEND_COMMANDS: &str = "mixer.send.commands";
    /// Bulks broadcast by the distributor (counted once, not per subscriber).
    pub const DISTRIBUTOR_BLOCKS: &str = "distributor.blocks";
    /// Commands inside broadcast bulks.
    pub const DISTRIBUTOR_COMMANDS: &str = "distributor.commands";
    /// Socket reads fed into a reader.
    pub const CONNECTION_BUFFER_COUNT: &str = "connection.buffer.count";
    /// Bytes fed into a reader.
    pub const CONNECTION_BUFFER_SIZE: &str = "connection.buffer.size";
    /// Accepted connections.
    pub const SERVER_CONNECT_COUNT: &str = "server.connect.count";
}
