use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;

use super::TransportSink;
use crate::{Error, Result};

#[derive(Debug, Clone)]
pub struct Sent {
    pub at: Instant,
    pub bytes: Vec<u8>,
}

/// Records every frame with the instant it was written. Clones share the
/// same record.
#[derive(Debug, Clone)]
pub struct MemorySink {
    open: Arc<Mutex<bool>>,
    sent: Arc<Mutex<Vec<Sent>>>,
}

impl Default for MemorySink {
    fn default() -> Self {
        MemorySink {
            open: Arc::new(Mutex::new(true)),
            sent: Default::default(),
        }
    }
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_open(&self, open: bool) {
        *self.open.lock() = open;
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().clone()
    }

    pub fn frames(&self) -> Vec<Vec<u8>> {
        self.sent.lock().iter().map(|s| s.bytes.clone()).collect()
    }

    pub fn take(&self) -> Vec<Sent> {
        std::mem::take(&mut *self.sent.lock())
    }
}

impl TransportSink for MemorySink {
    fn is_open(&self) -> bool {
        *self.open.lock()
    }

    fn write(&mut self, frame: &[u8]) -> Result<()> {
        if !self.is_open() {
            return Err(Error::NotOpen);
        }

        self.sent.lock().push(Sent {
            at: Instant::now(),
            bytes: frame.to_vec(),
        });
        Ok(())
    }
}
