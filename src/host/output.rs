//! Host response output stream.
//!
//! # Responsibilities
//! - Give body writers a plain `std::io::Write` target
//! - Forward written bytes to the host response body as they are produced
//!
//! # Design Decisions
//! - Bounded channel: a slow client applies backpressure to the writer
//! - Writes block, so an `OutputStream` belongs on a blocking thread
//!   (`tokio::task::spawn_blocking`), never on an async worker
//! - Small writes are coalesced into chunks before crossing the channel

use axum::body::Body;
use bytes::{Bytes, BytesMut};
use futures_util::stream;
use std::io::{self, Write};
use tokio::sync::mpsc;

/// Coalescing threshold for buffered writes.
const CHUNK_SIZE: usize = 8 * 1024;

/// Number of chunks in flight before the writer blocks.
const CHANNEL_DEPTH: usize = 16;

/// Create an output stream and the response body fed by it.
pub fn output_channel() -> (OutputStream, Body) {
    let (tx, rx) = mpsc::channel::<io::Result<Bytes>>(CHANNEL_DEPTH);
    let body = Body::from_stream(stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|chunk| (chunk, rx))
    }));
    (
        OutputStream {
            tx,
            buf: BytesMut::with_capacity(CHUNK_SIZE),
        },
        body,
    )
}

/// Blocking writer feeding a streaming response body.
pub struct OutputStream {
    tx: mpsc::Sender<io::Result<Bytes>>,
    buf: BytesMut,
}

impl OutputStream {
    /// Terminate the body with an error; the host aborts the response.
    pub fn abort(mut self, error: io::Error) {
        self.buf.clear();
        let _ = self.tx.blocking_send(Err(error));
    }

    fn send_buffered(&mut self) -> io::Result<()> {
        if self.buf.is_empty() {
            return Ok(());
        }
        let chunk = self.buf.split().freeze();
        self.tx
            .blocking_send(Ok(chunk))
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "response body receiver dropped"))
    }
}

impl Write for OutputStream {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(data);
        if self.buf.len() >= CHUNK_SIZE {
            self.send_buffered()?;
        }
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.send_buffered()
    }
}

impl Drop for OutputStream {
    fn drop(&mut self) {
        if let Err(e) = self.send_buffered() {
            tracing::debug!(error = %e, "Discarding unsent response bytes");
        }
    }
}
