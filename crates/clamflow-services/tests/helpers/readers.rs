//! Source readers with awkward timing or failures.

use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, ReadBuf};

/// Hands out at most `step` bytes per read and yields between reads.
pub struct TrickleReader {
    data: Vec<u8>,
    pos: usize,
    step: usize,
    pending: bool,
}

impl TrickleReader {
    pub fn new(data: Vec<u8>, step: usize) -> Self {
        Self {
            data,
            pos: 0,
            step,
            pending: false,
        }
    }
}

impl AsyncRead for TrickleReader {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        if !self.pending {
            self.pending = true;
            cx.waker().wake_by_ref();
            return Poll::Pending;
        }
        self.pending = false;

        let remaining = self.data.len() - self.pos;
        let n = remaining.min(self.step).min(buf.remaining());
        let start = self.pos;
        buf.put_slice(&self.data[start..start + n]);
        self.pos += n;
        Poll::Ready(Ok(()))
    }
}

/// Yields `good` bytes, then fails every read.
pub struct FailingReader {
    good: Vec<u8>,
    pos: usize,
}

impl FailingReader {
    pub fn new(good: Vec<u8>) -> Self {
        Self { good, pos: 0 }
    }
}

impl AsyncRead for FailingReader {
    fn poll_read(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        if self.pos < self.good.len() {
            let n = (self.good.len() - self.pos).min(buf.remaining());
            let start = self.pos;
            buf.put_slice(&self.good[start..start + n]);
            self.pos += n;
            return Poll::Ready(Ok(()));
        }
        Poll::Ready(Err(io::Error::new(
            io::ErrorKind::ConnectionReset,
            "source connection reset",
        )))
    }
}

/// Wraps a reader and counts how many times it has been dropped.
pub struct TrackedReader<R> {
    inner: R,
    released: Arc<AtomicUsize>,
}

impl<R> TrackedReader<R> {
    pub fn new(inner: R, released: Arc<AtomicUsize>) -> Self {
        Self { inner, released }
    }
}

impl<R> Drop for TrackedReader<R> {
    fn drop(&mut self) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}

impl<R: AsyncRead + Unpin> AsyncRead for TrackedReader<R> {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_read(cx, buf)
    }
}
