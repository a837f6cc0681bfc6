//! A bounded byte pipe connecting a backend read to the frontend.
//!
//! The producer writes into [`PipeWriter`] and finishes with
//! [`PipeWriter::close_with_error`]; the consumer reads from
//! [`PipeReader`]. Dropping the reader breaks the writer, which is how a
//! partial read cancels the producer. A terminal producer error surfaces to
//! the reader once the buffered bytes are drained.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use fusion_core::types::ObjectInfo;
use fusion_core::Error;
use parking_lot::Mutex;
use tokio::io::{duplex, AsyncRead, AsyncWrite, DuplexStream, ReadBuf};

/// Buffer between the backend read and the frontend write. No buffering
/// beyond this happens in the gateway.
pub const PIPE_CAPACITY: usize = 256 * 1024;

type ErrorSlot = Arc<Mutex<Option<Error>>>;

/// Creates a connected writer/reader pair with the given buffer capacity.
#[must_use]
pub fn pipe(capacity: usize) -> (PipeWriter, PipeReader) {
    let (write_half, read_half) = duplex(capacity);
    let slot: ErrorSlot = Arc::new(Mutex::new(None));
    (
        PipeWriter { inner: write_half, err: slot.clone() },
        PipeReader { inner: read_half, err: slot },
    )
}

/// Write end of the pipe, held by the producer task.
pub struct PipeWriter {
    inner: DuplexStream,
    err: ErrorSlot,
}

impl PipeWriter {
    /// Closes the pipe, recording the producer's terminal error (if any)
    /// for the reader to observe after the buffered bytes are drained.
    pub fn close_with_error(self, err: Option<Error>) {
        if let Some(err) = err {
            *self.err.lock() = Some(err);
        }
        // Dropping the write half delivers EOF to the reader.
    }
}

impl AsyncWrite for PipeWriter {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        Pin::new(&mut self.inner).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.inner).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.inner).poll_shutdown(cx)
    }
}

/// Read end of the pipe.
pub struct PipeReader {
    inner: DuplexStream,
    err: ErrorSlot,
}

impl AsyncRead for PipeReader {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        let before = buf.filled().len();
        match Pin::new(&mut self.inner).poll_read(cx, buf) {
            Poll::Ready(Ok(())) => {
                if buf.filled().len() == before {
                    // EOF: surface the producer's terminal error exactly once.
                    if let Some(err) = self.err.lock().take() {
                        return Poll::Ready(Err(std::io::Error::other(err)));
                    }
                }
                Poll::Ready(Ok(()))
            }
            other => other,
        }
    }
}

/// The streaming GET handle returned to the frontend.
///
/// Dropping it cancels the producer task through the broken pipe.
pub struct GetObjectReader {
    info: ObjectInfo,
    reader: PipeReader,
}

impl GetObjectReader {
    pub(crate) fn new(info: ObjectInfo, reader: PipeReader) -> Self {
        Self { info, reader }
    }

    /// Metadata of the object being streamed.
    #[must_use]
    pub fn object_info(&self) -> &ObjectInfo {
        &self.info
    }
}

impl AsyncRead for GetObjectReader {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.reader).poll_read(cx, buf)
    }
}
