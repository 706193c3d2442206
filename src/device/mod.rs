/*!
Byte devices: the source/sink abstraction the parser and writer talk to.

A [`Device`] is the core's only way to obtain or emit bytes. Concrete
devices are selected at construction time and moved into their owning
parser or writer. This module provides the contract plus three
implementations: a file device with BOM handling, an in-memory device, and
an output-only device over any `io::Write`.
*/

use std::fmt;

use crate::error::{Error, Result};

/// The file-backed device.
pub mod file;
/// The in-memory device.
pub mod memory;
/// The output-only device over any writer.
pub mod stream;

/// An abstract byte source/sink.
///
/// End of stream is reported as `Ok(0)` from [`recv`](Device::recv),
/// structurally distinct from a hard error.
pub trait Device {
    /// Open the device. Opening an already-open device succeeds.
    ///
    /// Devices open lazily: the first `recv` or `send` opens the device if
    /// `open` was never called.
    fn open(&mut self) -> Result<()>;

    /// Fill `buf` with up to `buf.len()` bytes and return the number of
    /// bytes obtained. `Ok(0)` means the stream is exhausted.
    fn recv(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Send the whole of `buf` to the device.
    fn send(&mut self, buf: &[u8]) -> Result<()>;

    /// Close the device and release its resources. Closing an
    /// already-closed device reports [`Error::Closed`].
    fn close(&mut self) -> Result<()>;

    /// Push any buffered output to the underlying medium.
    ///
    /// Optional; the default reports [`Error::NotImplemented`].
    fn flush(&mut self) -> Result<()> {
        Err(Error::NotImplemented)
    }

    /// `Ok(())` when the device is open and usable.
    fn is_valid(&self) -> Result<()>;

    /// A short name identifying the device kind, used in device events.
    fn name(&self) -> &str {
        "device"
    }

    /// Transfer counters for this device.
    fn stats(&self) -> DeviceStats {
        DeviceStats::default()
    }
}

/// Per-device transfer counters, reset when the device is opened.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct DeviceStats {
    /// Bytes received.
    pub rx: u64,
    /// Bytes sent.
    pub tx: u64,
    /// I/O operations that failed.
    pub errors: u64,
}

/// Optional device-level lifecycle callbacks.
///
/// Like [`Events`](crate::Events) at the parsing layer, a `DeviceEvents`
/// implementation is moved into a device at construction; the device calls
/// out, never the reverse. All methods default to no-ops.
pub trait DeviceEvents {
    /// The device finished opening.
    fn on_opened(&mut self, _name: &str) {}

    /// The device was closed.
    fn on_closed(&mut self, _name: &str) {}

    /// An operation on the device failed, or a soft condition such as a
    /// BOM mismatch was observed.
    fn on_error(&mut self, _name: &str, _err: &Error) {}
}

/// A byte-order mark.
///
/// BOMs are detected, skipped and written by devices; no encoding
/// conversion ever happens. `Bom::None` means "no BOM".
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Bom {
    /// No byte-order mark.
    #[default]
    None,
    /// UTF-8, `EF BB BF`.
    Utf8,
    /// UTF-16 little endian, `FF FE`.
    Utf16Le,
    /// UTF-16 big endian, `FE FF`.
    Utf16Be,
    /// UTF-32 little endian, `FF FE 00 00`.
    Utf32Le,
    /// UTF-32 big endian, `00 00 FE FF`.
    Utf32Be,
}

impl Bom {
    /// The marker bytes this BOM puts at the head of a stream.
    pub fn marker(&self) -> &'static [u8] {
        match *self {
            Bom::None => &[],
            Bom::Utf8 => &[0xEF, 0xBB, 0xBF],
            Bom::Utf16Le => &[0xFF, 0xFE],
            Bom::Utf16Be => &[0xFE, 0xFF],
            Bom::Utf32Le => &[0xFF, 0xFE, 0x00, 0x00],
            Bom::Utf32Be => &[0x00, 0x00, 0xFE, 0xFF],
        }
    }

    /// Detect a BOM at the head of `prefix`.
    ///
    /// The four-byte marks are tried before their two-byte prefixes, so a
    /// UTF-32 LE mark is never misread as UTF-16 LE.
    pub fn detect(prefix: &[u8]) -> Bom {
        const CANDIDATES: &[Bom] = &[
            Bom::Utf32Le,
            Bom::Utf32Be,
            Bom::Utf8,
            Bom::Utf16Le,
            Bom::Utf16Be,
        ];
        for &bom in CANDIDATES {
            if prefix.starts_with(bom.marker()) {
                return bom;
            }
        }
        Bom::None
    }
}

impl fmt::Display for Bom {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match *self {
            Bom::None => "none",
            Bom::Utf8 => "UTF-8",
            Bom::Utf16Le => "UTF-16 LE",
            Bom::Utf16Be => "UTF-16 BE",
            Bom::Utf32Le => "UTF-32 LE",
            Bom::Utf32Be => "UTF-32 BE",
        };
        f.write_str(name)
    }
}
