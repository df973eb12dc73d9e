use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;

use tracing::{debug, info, warn};

use crate::{Error, Result};

pub mod memory;

pub use memory::MemorySink;

/// Single-writer byte link to the servo bus.
pub trait TransportSink: Send {
    fn is_open(&self) -> bool;

    fn write(&mut self, frame: &[u8]) -> Result<()>;
}

impl<T: TransportSink + ?Sized> TransportSink for Box<T> {
    fn is_open(&self) -> bool {
        (**self).is_open()
    }

    fn write(&mut self, frame: &[u8]) -> Result<()> {
        (**self).write(frame)
    }
}

/// Sink over any already-configured byte handle, e.g. a serial device file.
pub struct WriteSink<W> {
    name: String,
    inner: Option<W>,
}

impl<W> Default for WriteSink<W> {
    fn default() -> Self {
        WriteSink {
            name: String::new(),
            inner: None,
        }
    }
}

impl<W: Write + Send> WriteSink<W> {
    pub fn new(name: impl Into<String>, inner: W) -> Self {
        let name = name.into();
        info!(link = %name, "link opened");
        WriteSink {
            name,
            inner: Some(inner),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Replaces the current handle, closing the previous one first.
    pub fn attach(&mut self, name: impl Into<String>, inner: W) -> Option<W> {
        let prev = self.close();
        *self = Self::new(name, inner);
        prev
    }

    pub fn close(&mut self) -> Option<W> {
        let mut inner = self.inner.take()?;
        if let Err(e) = inner.flush() {
            warn!(link = %self.name, "flush on close failed: {}", e);
        }
        info!(link = %self.name, "link closed");
        Some(inner)
    }
}

impl WriteSink<File> {
    pub fn open_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new().write(true).open(path)?;
        Ok(Self::new(path.display().to_string(), file))
    }
}

impl<W: Write + Send> TransportSink for WriteSink<W> {
    fn is_open(&self) -> bool {
        self.inner.is_some()
    }

    fn write(&mut self, frame: &[u8]) -> Result<()> {
        let inner = self.inner.as_mut().ok_or(Error::NotOpen)?;
        inner.write_all(frame)?;
        inner.flush()?;
        debug!(link = %self.name, size = frame.len(), "frame written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;

    struct Broken;

    impl Write for Broken {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "unplugged"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn writes_through_to_handle() {
        let mut sink = WriteSink::new("buf", Vec::new());
        assert!(sink.is_open());
        sink.write(&[1, 2, 3]).expect("write");
        sink.write(&[4]).expect("write");
        assert_eq!(sink.close().expect("was open"), vec![1, 2, 3, 4]);
        assert!(!sink.is_open());
    }

    #[test]
    fn closed_sink_reports_not_open() {
        let mut sink = WriteSink::<Vec<u8>>::default();
        assert!(!sink.is_open());
        assert!(matches!(sink.write(&[0x55]), Err(Error::NotOpen)));
        assert!(sink.close().is_none());
    }

    #[test]
    fn attach_returns_previous_handle() {
        let mut sink = WriteSink::new("a", vec![9u8]);
        let prev = sink.attach("b", Vec::new());
        assert_eq!(prev, Some(vec![9u8]));
        assert_eq!(sink.name(), "b");
    }

    #[test]
    fn write_errors_surface_as_io() {
        let mut sink = WriteSink::new("broken", Broken);
        assert!(matches!(sink.write(&[1]), Err(Error::IO(_))));
    }
}
