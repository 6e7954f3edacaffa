//! bulkd - Server
//!
//! The TCP front end and lifecycle owner for the aggregation pipeline.
//!
//! # Lifecycle
//!
//! ```text
//! start:  sinks.run → distributor.run → mixer.run → accept connections
//! stop:   stop accepting → join readers → mixer.join → distributor.join → sinks.join
//! ```
//!
//! Startup is leaves-first so every stage has a live consumer downstream
//! before its first `put`; shutdown is the exact reverse so every blocked
//! `put` can drain. Each `join` is the sole closer of its stage's input
//! queue.
//!
//! The accept loop and the per-connection feeders are plain blocking
//! threads: the listener is polled non-blocking against a shutdown flag,
//! and socket reads run under a short timeout so feeders observe shutdown
//! promptly.

mod config;
mod connection;
mod error;
mod server;

pub use config::ServerConfig;
pub use error::{Result, ServerError};
pub use server::Server;
