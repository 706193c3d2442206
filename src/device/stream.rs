use std::io::Write;

use crate::device::{Device, DeviceStats};
use crate::error::{Error, Result};

/// An output-only [`Device`] over any [`io::Write`](std::io::Write).
///
/// `recv` reports [`Error::NotImplemented`]; everything else behaves like a
/// plain byte sink. The writer is available again through
/// [`into_inner`](StreamDevice::into_inner).
pub struct StreamDevice<W: Write> {
    wtr: W,
    open: bool,
    closed: bool,
    stats: DeviceStats,
}

impl<W: Write> StreamDevice<W> {
    /// Create a stream device over the given writer.
    pub fn new(wtr: W) -> StreamDevice<W> {
        StreamDevice { wtr, open: false, closed: false, stats: DeviceStats::default() }
    }

    /// Consume the device and return the underlying writer.
    pub fn into_inner(self) -> W {
        self.wtr
    }
}

impl<W: Write> Device for StreamDevice<W> {
    fn open(&mut self) -> Result<()> {
        if self.closed {
            return Err(Error::Closed);
        }
        if !self.open {
            self.open = true;
            self.stats = DeviceStats::default();
        }
        Ok(())
    }

    fn recv(&mut self, _buf: &mut [u8]) -> Result<usize> {
        Err(Error::NotImplemented)
    }

    fn send(&mut self, data: &[u8]) -> Result<()> {
        self.open()?;
        match self.wtr.write_all(data) {
            Ok(()) => {
                self.stats.tx += data.len() as u64;
                Ok(())
            }
            Err(err) => {
                self.stats.errors += 1;
                Err(Error::Transmit(err))
            }
        }
    }

    fn close(&mut self) -> Result<()> {
        if !self.open || self.closed {
            return Err(Error::Closed);
        }
        let result = self.wtr.flush().map_err(Error::Transmit);
        self.open = false;
        self.closed = true;
        result
    }

    fn flush(&mut self) -> Result<()> {
        if !self.open {
            return Err(Error::Closed);
        }
        self.wtr.flush().map_err(Error::Transmit)
    }

    fn is_valid(&self) -> Result<()> {
        if self.open && !self.closed {
            Ok(())
        } else {
            Err(Error::Closed)
        }
    }

    fn name(&self) -> &str {
        "stream"
    }

    fn stats(&self) -> DeviceStats {
        self.stats
    }
}
