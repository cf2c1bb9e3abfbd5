//! In-memory output sink for testing.

use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use tokio::io::AsyncWrite;

/// An `AsyncWrite` that collects everything written to it.
///
/// Clones share the same buffer, so a test can hand one clone to a job and
/// inspect the other afterwards.
#[derive(Debug, Clone, Default)]
pub struct MockSink {
    buffer: Arc<Mutex<Vec<u8>>>,
    shut_down: Arc<AtomicBool>,
    fail_writes: bool,
}

impl MockSink {
    /// Create a sink that accepts all writes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a sink whose writes fail with `BrokenPipe`.
    pub fn failing() -> Self {
        Self {
            fail_writes: true,
            ..Self::default()
        }
    }

    /// Bytes written so far.
    pub fn contents(&self) -> Vec<u8> {
        self.buffer
            .lock()
            .map(|buffer| buffer.clone())
            .unwrap_or_default()
    }

    /// Whether the writer was shut down after the last write.
    pub fn was_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }
}

impl AsyncWrite for MockSink {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        if self.fail_writes {
            return Poll::Ready(Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "sink closed",
            )));
        }
        match self.buffer.lock() {
            Ok(mut buffer) => {
                buffer.extend_from_slice(buf);
                Poll::Ready(Ok(buf.len()))
            }
            Err(_) => Poll::Ready(Err(io::Error::new(io::ErrorKind::Other, "sink poisoned"))),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        self.shut_down.store(true, Ordering::SeqCst);
        Poll::Ready(Ok(()))
    }
}
