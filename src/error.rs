use std::error;
use std::fmt;
use std::io;
use std::result;

use crate::device::Bom;

/// A type alias for `Result<T, csvfeed::Error>`.
pub type Result<T> = result::Result<T, Error>;

/// An error that can occur when reading or writing CSV data.
///
/// End of stream is deliberately *not* represented here. A device reports it
/// as `Ok(0)` from [`recv`](crate::Device::recv) and the reader as
/// `Ok(false)` from [`read`](crate::Reader::read): it is a terminal
/// condition, not a failure.
#[derive(Debug)]
#[non_exhaustive]
pub enum Error {
    /// An I/O error raised while opening or probing a device.
    Io(io::Error),
    /// The operation is not supported by this device.
    NotImplemented,
    /// The operation is not valid in the current state, e.g. writing rows
    /// before the header or receiving from an output-only device.
    WrongCall,
    /// The device is closed.
    Closed,
    /// The named device does not exist.
    NoDevice,
    /// The device exists but cannot be accessed.
    AccessDenied,
    /// The device rejected its configuration.
    Config,
    /// A buffer could not be allocated. The owning component releases its
    /// half-initialized storage before reporting this.
    OutOfMemory,
    /// An I/O error occurred while sending bytes to a device.
    Transmit(io::Error),
    /// An I/O error occurred while receiving bytes from a device.
    Receive(io::Error),
    /// A send did not complete within the device's time budget.
    TransmitTimeout,
    /// A receive did not complete within the device's time budget.
    ReceiveTimeout,
    /// The device could not establish its connection in time.
    ConnectTimeout,
    /// The byte-order mark found at the head of the stream differs from the
    /// one the device was configured to expect.
    BomMismatch {
        /// The BOM the device options asked for.
        expected: Bom,
        /// The BOM actually found.
        found: Bom,
    },
    /// A row's field count differs from the header's. Reported through the
    /// error channel while the row is still delivered.
    UnequalLengths {
        /// The number of columns in the header.
        expected: usize,
        /// The number of fields in the offending row.
        got: usize,
        /// The data-row number (1-based, header excluded).
        row: u64,
    },
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        Error::Io(err)
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match *self {
            Error::Io(ref err)
            | Error::Transmit(ref err)
            | Error::Receive(ref err) => Some(err),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::Io(ref err) => err.fmt(f),
            Error::NotImplemented => write!(f, "not implemented"),
            Error::WrongCall => write!(f, "wrong call sequence"),
            Error::Closed => write!(f, "closed"),
            Error::NoDevice => write!(f, "no device"),
            Error::AccessDenied => write!(f, "access denied"),
            Error::Config => write!(f, "configuration error"),
            Error::OutOfMemory => write!(f, "not enough memory"),
            Error::Transmit(ref err) => write!(f, "write error: {}", err),
            Error::Receive(ref err) => write!(f, "read error: {}", err),
            Error::TransmitTimeout => write!(f, "write timeout"),
            Error::ReceiveTimeout => write!(f, "read timeout"),
            Error::ConnectTimeout => write!(f, "connection timeout"),
            Error::BomMismatch { expected, found } => {
                write!(f, "BOM mismatch: expected {}, found {}", expected, found)
            }
            Error::UnequalLengths { expected, got, row } => write!(
                f,
                "inconsistent items count: row {} has {} fields, \
                 but the header has {} fields",
                row, got, expected
            ),
        }
    }
}
