//! Per-connection socket feeder.

use std::io::{ErrorKind, Read};
use std::net::TcpStream;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;

use bulkd_metrics::{keys, Recorder};
use bulkd_pipeline::{Queue, Reader};
use bulkd_protocol::Record;

/// How often a blocked read re-checks the shutdown flag.
const READ_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Feed one accepted connection into a fresh [`Reader`] until EOF, a
/// socket error, or server shutdown, then join the reader exactly once so
/// its end-of-stream flush reaches the mixer.
pub(crate) fn serve_connection(
    stream: TcpStream,
    mixer_input: Arc<Queue<Record>>,
    read_buffer_size: usize,
    queue_capacity: usize,
    recorder: Arc<dyn Recorder>,
    shutdown: Arc<AtomicBool>,
) {
    let peer = stream
        .peer_addr()
        .map(|addr| addr.to_string())
        .unwrap_or_else(|_| "unknown".into());

    let mut reader = Reader::new(queue_capacity, mixer_input, Arc::clone(&recorder));
    if let Err(error) = reader.run() {
        tracing::error!(peer = %peer, %error, "reader failed to start");
        return;
    }
    tracing::debug!(peer = %peer, producer = %reader.producer(), "connection open");

    if let Err(error) = stream.set_read_timeout(Some(READ_POLL_INTERVAL)) {
        tracing::warn!(peer = %peer, %error, "read timeout not set");
    }

    feed(stream, &reader, read_buffer_size, &recorder, &shutdown);

    reader.join();
    tracing::debug!(peer = %peer, "connection closed");
}

/// Pump socket chunks into the reader until the stream ends.
fn feed(
    mut stream: TcpStream,
    reader: &Reader,
    read_buffer_size: usize,
    recorder: &Arc<dyn Recorder>,
    shutdown: &AtomicBool,
) {
    let mut buffer = vec![0u8; read_buffer_size];
    loop {
        if shutdown.load(Ordering::Relaxed) {
            return;
        }
        match stream.read(&mut buffer) {
            Ok(0) => return, // client closed
            Ok(n) => {
                recorder.update(keys::CONNECTION_BUFFER_COUNT, 1);
                recorder.update(keys::CONNECTION_BUFFER_SIZE, n as i64);
                if reader.put(Bytes::copy_from_slice(&buffer[..n])).is_err() {
                    return;
                }
            }
            Err(error)
                if matches!(
                    error.kind(),
                    ErrorKind::WouldBlock | ErrorKind::TimedOut | ErrorKind::Interrupted
                ) => {}
            Err(error) => {
                tracing::debug!(%error, "socket read failed");
                return;
            }
        }
    }
}
