//! Accept loop and pipeline lifecycle.

use std::io;
use std::net::{SocketAddr, TcpListener};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use bulkd_metrics::{keys, Recorder};
use bulkd_pipeline::{Distributor, Mixer};
use bulkd_sinks::{ConsoleSink, FileSink, FileSinkConfig};

use crate::connection::serve_connection;
use crate::{Result, ServerConfig, ServerError};

/// How often the accept loop re-checks the shutdown flag.
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// The bulk aggregator server.
///
/// Owns the whole stage graph. Startup runs leaves-first (sinks,
/// distributor, mixer, then accept); shutdown is the exact reverse, each
/// `join` being the sole closer of its stage's input queue.
pub struct Server {
    listener: TcpListener,
    local_addr: SocketAddr,
    config: ServerConfig,
    recorder: Arc<dyn Recorder>,
}

impl Server {
    /// Bind the listen address.
    ///
    /// A bind failure is a startup failure; the caller should exit
    /// non-zero.
    pub fn bind(config: ServerConfig, recorder: Arc<dyn Recorder>) -> Result<Self> {
        let address = format!("{}:{}", config.address, config.port);
        let listener = TcpListener::bind(&address).map_err(|source| ServerError::Bind {
            address: address.clone(),
            source,
        })?;
        let local_addr = listener.local_addr()?;
        Ok(Self {
            listener,
            local_addr,
            config,
            recorder,
        })
    }

    /// The bound address, with the real port when configured with port 0.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Accept and aggregate until the shutdown flag is raised, then drain
    /// the pipeline and return.
    pub fn run(self, shutdown: Arc<AtomicBool>) -> Result<()> {
        let config = self.config;
        let recorder = self.recorder;

        let mut console = ConsoleSink::stdout(config.queue_capacity, Arc::clone(&recorder));
        let file_config = FileSinkConfig {
            dir: config.output_dir.clone(),
            capacity: config.queue_capacity,
        };
        let mut file = FileSink::new(file_config, Arc::clone(&recorder));

        let mut distributor = Distributor::new(config.queue_capacity, Arc::clone(&recorder));
        distributor.attach(console.input());
        distributor.attach(file.input());

        let mut mixer = Mixer::new(
            config.bulk_size,
            config.queue_capacity,
            distributor.input(),
            Arc::clone(&recorder),
        );

        // Leaves first: every stage has a live consumer before its first put.
        console.run(config.console_workers)?;
        file.run(config.file_workers)?;
        distributor.run()?;
        mixer.run()?;

        tracing::info!(
            address = %self.local_addr,
            bulk_size = config.bulk_size,
            queue_capacity = config.queue_capacity,
            "server accepting connections"
        );

        self.listener.set_nonblocking(true)?;
        let mixer_input = mixer.input();
        let mut connections: Vec<JoinHandle<()>> = Vec::new();

        loop {
            if shutdown.load(Ordering::Relaxed) {
                tracing::info!("shutdown signal received");
                break;
            }
            match self.listener.accept() {
                Ok((stream, peer)) => {
                    recorder.update(keys::SERVER_CONNECT_COUNT, 1);
                    tracing::debug!(peer = %peer, "connection accepted");

                    let mixer_input = Arc::clone(&mixer_input);
                    let recorder = Arc::clone(&recorder);
                    let shutdown = Arc::clone(&shutdown);
                    let read_buffer_size = config.read_buffer_size;
                    let queue_capacity = config.queue_capacity;
                    let spawned = thread::Builder::new()
                        .name(format!("conn-{peer}"))
                        .spawn(move || {
                            let _ = stream.set_nonblocking(false);
                            serve_connection(
                                stream,
                                mixer_input,
                                read_buffer_size,
                                queue_capacity,
                                recorder,
                                shutdown,
                            );
                        });
                    match spawned {
                        Ok(handle) => connections.push(handle),
                        Err(error) => {
                            tracing::error!(peer = %peer, %error, "connection thread not spawned")
                        }
                    }
                    connections.retain(|handle| !handle.is_finished());
                }
                Err(ref error) if error.kind() == io::ErrorKind::WouldBlock => {
                    thread::sleep(ACCEPT_POLL_INTERVAL);
                }
                Err(error) => {
                    tracing::error!(%error, "accept failed");
                }
            }
        }

        // Reverse of startup: readers drain into the mixer, the mixer into
        // the distributor, the distributor into the sinks.
        for handle in connections {
            let _ = handle.join();
        }
        mixer.join();
        distributor.join();
        console.join();
        file.join();

        tracing::info!("server stopped");
        Ok(())
    }
}
