/*!
Streaming CSV parsing and serialization over pluggable byte devices.

This crate reads delimited text from an abstract byte [`Device`] and
incrementally produces [`Row`]s of [`Field`]s, and conversely serializes
rows back to a device. The core is a pull-based, byte-at-a-time tokenizer
in the RFC 4180 family: quoting, whitespace skipping, boundary trimming and
comment lines are all handled while the parser refills a read-ahead cache
from the device in bulk.

The first parsed line becomes the [`Header`] (unless one is supplied up
front), and every later line is delivered as one row per
[`read`](Reader::read) call. Optional [`Events`] callbacks observe the
parsing lifecycle, and per-column [`FilterChain`]s rewrite rows as they
come off the tokenizer.

# Reading

```
use csvfeed::{MemoryDevice, Reader, Row};

let data = "name,age\nAlice,30\nBob,25";
let mut rdr = Reader::from_device(MemoryDevice::from_bytes(data));
let mut row = Row::new();
while rdr.read(&mut row).unwrap() {
    println!("{} is {}", row[0], row[1]);
}
assert_eq!(rdr.rows_read(), 2);
```

# Writing

```
use csvfeed::{Header, MemoryDevice, Row, Writer};

let header = Header::from_row(["name", "age"].into_iter().collect());
let mut wtr = Writer::from_device(MemoryDevice::new());
wtr.open(header.clone()).unwrap();
let row: Row = ["Alice", "30"].into_iter().collect();
wtr.write(&header, &row).unwrap();
wtr.close().unwrap();
assert_eq!(wtr.into_device().as_bytes(), b"name,age\nAlice,30\n");
```

# Devices

Parsers and writers are generic over [`Device`], the crate's only I/O
seam. [`FileDevice`] covers OS files (with byte-order-mark detection and
writing), [`MemoryDevice`] covers in-memory buffers, and
[`StreamDevice`] adapts any `io::Write` as an output sink. A device is
moved into its reader or writer at construction and owned exclusively for
its lifetime.
*/

#![deny(missing_docs)]

pub use crate::device::file::{FileDevice, FileDeviceOptions, OpenMode};
pub use crate::device::memory::MemoryDevice;
pub use crate::device::stream::StreamDevice;
pub use crate::device::{Bom, Device, DeviceEvents, DeviceStats};
pub use crate::error::{Error, Result};
pub use crate::events::{Events, RowOutcome};
pub use crate::field::Field;
pub use crate::filter::{ChainFlow, Filter, FilterChain};
pub use crate::header::Header;
pub use crate::parser::Parser;
pub use crate::reader::Reader;
pub use crate::row::{Row, RowFlag};
pub use crate::writer::Writer;

mod device;
mod error;
mod events;
mod field;
mod filter;
mod header;
mod parser;
mod reader;
mod row;
mod writer;
