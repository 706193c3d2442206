use std::fs;
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use crate::device::{Bom, Device, DeviceEvents, DeviceStats};
use crate::error::{Error, Result};

const FILE_DEVICE_NAME: &str = "file";

/// The default read-ahead/write buffer size: 1 MiB.
const DEFAULT_BUF_SIZE: usize = 1024 * 1024;

/// Whether a [`FileDevice`] reads or writes.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum OpenMode {
    /// Open an existing file for reading.
    Read,
    /// Create (or truncate) a file for writing.
    Write,
}

/// Configuration for a [`FileDevice`].
#[derive(Clone, Debug)]
pub struct FileDeviceOptions {
    path: PathBuf,
    mode: OpenMode,
    buf_size: usize,
    bom: Bom,
}

impl FileDeviceOptions {
    /// Options for the file at `path` in the given mode, with a 1 MiB
    /// buffer and no BOM expectation.
    pub fn new<P: AsRef<Path>>(path: P, mode: OpenMode) -> FileDeviceOptions {
        FileDeviceOptions {
            path: path.as_ref().to_path_buf(),
            mode,
            buf_size: DEFAULT_BUF_SIZE,
            bom: Bom::None,
        }
    }

    /// Set the internal buffer size in bytes.
    pub fn buf_size(mut self, buf_size: usize) -> FileDeviceOptions {
        self.buf_size = buf_size.max(1);
        self
    }

    /// Set the byte-order mark to write at the head of an output file, or
    /// to expect at the head of an input file.
    pub fn bom(mut self, bom: Bom) -> FileDeviceOptions {
        self.bom = bom;
        self
    }

    /// The configured file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The configured mode.
    pub fn mode(&self) -> OpenMode {
        self.mode
    }
}

enum Backing {
    Read { file: fs::File, buf: Vec<u8>, len: usize, pos: usize },
    Write { out: BufWriter<fs::File> },
}

/// A file-backed [`Device`].
///
/// The device opens lazily on first use. In read mode an internal buffer is
/// refilled in bulk and `recv` serves from it; a recognized byte-order mark
/// at the head of the file is skipped, and a mismatch against the expected
/// BOM is reported through [`DeviceEvents::on_error`] without interrupting
/// the stream. In write mode output goes through a buffered writer and a
/// configured BOM is emitted at open.
pub struct FileDevice {
    opts: FileDeviceOptions,
    events: Option<Box<dyn DeviceEvents>>,
    backing: Option<Backing>,
    stats: DeviceStats,
    detected: Bom,
}

impl FileDevice {
    /// Create a file device from the given options.
    pub fn new(opts: FileDeviceOptions) -> FileDevice {
        FileDevice { opts, events: None, backing: None, stats: DeviceStats::default(), detected: Bom::None }
    }

    /// Create a file device that reports lifecycle events to `events`.
    pub fn with_events(opts: FileDeviceOptions, events: Box<dyn DeviceEvents>) -> FileDevice {
        FileDevice { events: Some(events), ..FileDevice::new(opts) }
    }

    /// The byte-order mark found at the head of the file, if any.
    ///
    /// Meaningful after the device has opened in read mode.
    pub fn detected_bom(&self) -> Bom {
        self.detected
    }

    fn notify_error(&mut self, err: &Error) {
        if let Some(events) = self.events.as_mut() {
            events.on_error(FILE_DEVICE_NAME, err);
        }
    }

    fn release(&mut self) {
        self.backing = None;
    }

    /// Refill the read buffer from the file. `Ok(0)` means end of file.
    fn refresh(&mut self) -> Result<usize> {
        let result = match self.backing.as_mut() {
            Some(Backing::Read { file, buf, len, pos }) => match file.read(buf) {
                Ok(n) => {
                    *len = n;
                    *pos = 0;
                    Ok(n)
                }
                Err(err) => Err(Error::Receive(err)),
            },
            _ => Err(Error::WrongCall),
        };
        match result {
            Ok(n) => {
                self.stats.rx += n as u64;
                Ok(n)
            }
            Err(err) => {
                self.stats.errors += 1;
                self.notify_error(&err);
                self.release();
                Err(err)
            }
        }
    }

    /// Inspect the head of the stream for a byte-order mark and skip it.
    fn sniff_bom(&mut self) -> Result<()> {
        self.refresh()?;
        if let Some(Backing::Read { buf, len, pos, .. }) = self.backing.as_mut() {
            let found = Bom::detect(&buf[..*len]);
            *pos = found.marker().len().min(*len);
            self.detected = found;
        }
        let expected = self.opts.bom;
        if expected != Bom::None && self.detected != expected {
            let err = Error::BomMismatch { expected, found: self.detected };
            self.notify_error(&err);
        }
        Ok(())
    }
}

impl Device for FileDevice {
    fn open(&mut self) -> Result<()> {
        if self.backing.is_some() {
            return Ok(());
        }
        match self.opts.mode {
            OpenMode::Read => {
                let file = fs::File::open(&self.opts.path).map_err(map_open_error);
                let file = match file {
                    Ok(file) => file,
                    Err(err) => {
                        self.stats.errors += 1;
                        self.notify_error(&err);
                        return Err(err);
                    }
                };
                // At least the longest BOM marker, so the sniff sees it whole.
                let buf = vec![0; self.opts.buf_size.max(4)];
                self.stats = DeviceStats::default();
                self.backing = Some(Backing::Read { file, buf, len: 0, pos: 0 });
                if let Err(err) = self.sniff_bom() {
                    self.release();
                    return Err(err);
                }
            }
            OpenMode::Write => {
                let file = fs::File::create(&self.opts.path).map_err(map_open_error);
                let file = match file {
                    Ok(file) => file,
                    Err(err) => {
                        self.stats.errors += 1;
                        self.notify_error(&err);
                        return Err(err);
                    }
                };
                let mut out = BufWriter::with_capacity(self.opts.buf_size, file);
                self.stats = DeviceStats::default();
                let marker = self.opts.bom.marker();
                if !marker.is_empty() {
                    if let Err(err) = out.write_all(marker) {
                        let err = Error::Transmit(err);
                        self.stats.errors += 1;
                        self.notify_error(&err);
                        return Err(err);
                    }
                    self.stats.tx += marker.len() as u64;
                }
                self.backing = Some(Backing::Write { out });
            }
        }
        if let Some(events) = self.events.as_mut() {
            events.on_opened(FILE_DEVICE_NAME);
        }
        Ok(())
    }

    fn recv(&mut self, out: &mut [u8]) -> Result<usize> {
        self.open()?;
        let mut copied = 0;
        while copied < out.len() {
            let exhausted = match self.backing.as_mut() {
                Some(Backing::Read { buf, len, pos, .. }) => {
                    let avail = *len - *pos;
                    if avail > 0 {
                        let take = avail.min(out.len() - copied);
                        out[copied..copied + take]
                            .copy_from_slice(&buf[*pos..*pos + take]);
                        *pos += take;
                        copied += take;
                        false
                    } else {
                        true
                    }
                }
                _ => return Err(Error::WrongCall),
            };
            if exhausted && self.refresh()? == 0 {
                break;
            }
        }
        Ok(copied)
    }

    fn send(&mut self, data: &[u8]) -> Result<()> {
        self.open()?;
        let result = match self.backing.as_mut() {
            Some(Backing::Write { out }) => {
                out.write_all(data).map_err(Error::Transmit)
            }
            _ => Err(Error::WrongCall),
        };
        match result {
            Ok(()) => {
                self.stats.tx += data.len() as u64;
                Ok(())
            }
            Err(err) => {
                self.stats.errors += 1;
                self.notify_error(&err);
                self.release();
                Err(err)
            }
        }
    }

    fn close(&mut self) -> Result<()> {
        if self.backing.is_none() {
            return Err(Error::Closed);
        }
        if let Some(Backing::Write { out }) = self.backing.as_mut() {
            // Best effort; the file handle is released either way.
            let _ = out.flush();
        }
        self.release();
        if let Some(events) = self.events.as_mut() {
            events.on_closed(FILE_DEVICE_NAME);
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        match self.backing.as_mut() {
            None => Err(Error::Closed),
            Some(Backing::Read { .. }) => Ok(()),
            Some(Backing::Write { out }) => {
                out.flush().map_err(Error::Transmit)
            }
        }
    }

    fn is_valid(&self) -> Result<()> {
        if self.backing.is_some() {
            Ok(())
        } else {
            Err(Error::Closed)
        }
    }

    fn name(&self) -> &str {
        FILE_DEVICE_NAME
    }

    fn stats(&self) -> DeviceStats {
        self.stats
    }
}

fn map_open_error(err: io::Error) -> Error {
    match err.kind() {
        io::ErrorKind::NotFound => Error::NoDevice,
        io::ErrorKind::PermissionDenied => Error::AccessDenied,
        _ => Error::Io(err),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::{FileDevice, FileDeviceOptions, OpenMode};
    use crate::device::{Bom, Device};
    use crate::error::Error;

    fn write_temp(contents: &[u8]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn recv_reports_end_of_file_as_zero() {
        let file = write_temp(b"abc");
        let opts = FileDeviceOptions::new(file.path(), OpenMode::Read);
        let mut dev = FileDevice::new(opts);
        let mut buf = [0u8; 8];
        assert_eq!(dev.recv(&mut buf).unwrap(), 3);
        assert_eq!(&buf[..3], b"abc");
        assert_eq!(dev.recv(&mut buf).unwrap(), 0);
        assert_eq!(dev.recv(&mut buf).unwrap(), 0);
        assert_eq!(dev.stats().rx, 3);
    }

    #[test]
    fn small_buffer_refills() {
        let file = write_temp(b"0123456789");
        let opts =
            FileDeviceOptions::new(file.path(), OpenMode::Read).buf_size(4);
        let mut dev = FileDevice::new(opts);
        let mut buf = [0u8; 10];
        assert_eq!(dev.recv(&mut buf).unwrap(), 10);
        assert_eq!(&buf, b"0123456789");
    }

    #[test]
    fn missing_file_is_no_device() {
        let dir = tempfile::tempdir().unwrap();
        let opts = FileDeviceOptions::new(
            dir.path().join("absent.csv"),
            OpenMode::Read,
        );
        let mut dev = FileDevice::new(opts);
        match dev.open() {
            Err(Error::NoDevice) => {}
            other => panic!("expected NoDevice, got {:?}", other),
        }
    }

    #[test]
    fn utf8_bom_is_skipped() {
        let file = write_temp(b"\xEF\xBB\xBFa,b");
        let opts = FileDeviceOptions::new(file.path(), OpenMode::Read);
        let mut dev = FileDevice::new(opts);
        let mut buf = [0u8; 8];
        assert_eq!(dev.recv(&mut buf).unwrap(), 3);
        assert_eq!(&buf[..3], b"a,b");
        assert_eq!(dev.detected_bom(), Bom::Utf8);
    }

    #[test]
    fn close_twice_reports_closed() {
        let file = write_temp(b"x");
        let opts = FileDeviceOptions::new(file.path(), OpenMode::Read);
        let mut dev = FileDevice::new(opts);
        dev.open().unwrap();
        dev.close().unwrap();
        match dev.close() {
            Err(Error::Closed) => {}
            other => panic!("expected Closed, got {:?}", other),
        }
    }
}
