//! Buffered write-closer for trace files.
//!
//! The sink owns a buffered writer and the resource underneath it. Closing
//! always flushes first and then releases the resource, attempting both even
//! when the flush fails, and reports the first error seen.

use std::fs::File;
use std::io::{self, BufWriter, Write};

/// A resource with a fallible close step.
pub trait Close {
    fn close(self) -> io::Result<()>;
}

impl Close for File {
    /// Push data to disk, then release the descriptor.
    fn close(self) -> io::Result<()> {
        self.sync_all()
    }
}

/// Object-safe sink used by the connection tracer.
pub trait WriteCloser: Write + Send {
    /// Flush and release. Only the first call has an effect.
    fn close(&mut self) -> io::Result<()>;
}

/// Buffered writer plus closer. See module docs for close ordering.
#[derive(Debug)]
pub struct BufferedWriteCloser<W: Write + Close> {
    inner: Option<BufWriter<W>>,
}

impl<W: Write + Close> BufferedWriteCloser<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner: Some(BufWriter::new(inner)),
        }
    }

    pub fn with_capacity(capacity: usize, inner: W) -> Self {
        Self {
            inner: Some(BufWriter::with_capacity(capacity, inner)),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.inner.is_none()
    }

    fn writer(&mut self) -> io::Result<&mut BufWriter<W>> {
        self.inner
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::BrokenPipe, "trace sink already closed"))
    }

    fn close_inner(&mut self) -> io::Result<()> {
        let Some(mut writer) = self.inner.take() else {
            return Ok(());
        };

        let flushed = writer.flush();
        // into_parts hands back the resource without another flush attempt.
        let (resource, _unflushed) = writer.into_parts();
        let closed = resource.close();

        flushed.and(closed)
    }
}

impl<W: Write + Close> Write for BufferedWriteCloser<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.writer()?.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer()?.flush()
    }
}

impl<W: Write + Close + Send> WriteCloser for BufferedWriteCloser<W> {
    fn close(&mut self) -> io::Result<()> {
        self.close_inner()
    }
}

impl<W: Write + Close> Drop for BufferedWriteCloser<W> {
    fn drop(&mut self) {
        if self.inner.is_some() {
            if let Err(e) = self.close_inner() {
                tracing::warn!(error = %e, "Failed to close trace sink on drop");
            }
        }
    }
}
