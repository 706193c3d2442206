use crate::device::{Device, DeviceStats};
use crate::error::{Error, Result};

/// An in-memory [`Device`].
///
/// `recv` consumes the seeded bytes front to back; `send` appends to the
/// same buffer. Useful for tests and for driving the parser or writer over
/// data already in memory.
#[derive(Clone, Debug, Default)]
pub struct MemoryDevice {
    data: Vec<u8>,
    pos: usize,
    open: bool,
    stats: DeviceStats,
}

impl MemoryDevice {
    /// Create an empty device, typically as a write target.
    pub fn new() -> MemoryDevice {
        MemoryDevice::default()
    }

    /// Create a device seeded with readable bytes.
    pub fn from_bytes<B: Into<Vec<u8>>>(bytes: B) -> MemoryDevice {
        MemoryDevice { data: bytes.into(), ..MemoryDevice::default() }
    }

    /// The buffer contents, including anything written with `send`.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Consume the device and return its buffer.
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }
}

impl Device for MemoryDevice {
    fn open(&mut self) -> Result<()> {
        if !self.open {
            self.open = true;
            self.stats = DeviceStats::default();
        }
        Ok(())
    }

    fn recv(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.open()?;
        let avail = self.data.len() - self.pos;
        let take = avail.min(buf.len());
        buf[..take].copy_from_slice(&self.data[self.pos..self.pos + take]);
        self.pos += take;
        self.stats.rx += take as u64;
        Ok(take)
    }

    fn send(&mut self, data: &[u8]) -> Result<()> {
        self.open()?;
        self.data.extend_from_slice(data);
        self.stats.tx += data.len() as u64;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if !self.open {
            return Err(Error::Closed);
        }
        self.open = false;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    fn is_valid(&self) -> Result<()> {
        if self.open {
            Ok(())
        } else {
            Err(Error::Closed)
        }
    }

    fn name(&self) -> &str {
        "memory"
    }

    fn stats(&self) -> DeviceStats {
        self.stats
    }
}
