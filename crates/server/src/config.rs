//! Server configuration.

use std::path::PathBuf;

use bulkd_pipeline::DEFAULT_QUEUE_CAPACITY;

/// Aggregator server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address.
    pub address: String,

    /// Listen port (0 = ephemeral, useful in tests).
    pub port: u16,

    /// Mixer bulk size N (0 = no size cap).
    pub bulk_size: usize,

    /// Capacity of every stage input queue (0 = unbounded).
    pub queue_capacity: usize,

    /// Socket read chunk size in bytes.
    pub read_buffer_size: usize,

    /// Directory the file sink writes into.
    pub output_dir: PathBuf,

    /// Console sink worker threads.
    pub console_workers: usize,

    /// File sink worker threads.
    pub file_workers: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: "0.0.0.0".into(),
            port: 0,
            bulk_size: 3,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            read_buffer_size: 1024,
            output_dir: PathBuf::from("."),
            console_workers: 1,
            file_workers: 2,
        }
    }
}

impl ServerConfig {
    /// Config bound to `address`.
    #[must_use]
    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = address.into();
        self
    }

    /// Config listening on `port`.
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Config coalescing singletons `bulk_size` at a time.
    #[must_use]
    pub fn with_bulk_size(mut self, bulk_size: usize) -> Self {
        self.bulk_size = bulk_size;
        self
    }

    /// Config with a different stage queue capacity.
    #[must_use]
    pub fn with_queue_capacity(mut self, queue_capacity: usize) -> Self {
        self.queue_capacity = queue_capacity;
        self
    }

    /// Config writing bulk files into `output_dir`.
    #[must_use]
    pub fn with_output_dir(mut self, output_dir: impl Into<PathBuf>) -> Self {
        self.output_dir = output_dir.into();
        self
    }
}
