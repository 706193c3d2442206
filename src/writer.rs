use crate::device::Device;
use crate::error::{Error, Result};
use crate::events::Events;
use crate::field::Field;
use crate::header::Header;
use crate::row::Row;

/// A CSV writer that serializes rows against a target header.
///
/// [`open`](Writer::open) fixes the output column set and writes the header
/// line; every subsequent [`write`](Writer::write) re-projects the given
/// row into that column order by label. Fields are wrapped in quote bytes
/// exactly when their quoted marker is set.
///
/// # Example
///
/// ```
/// use csvfeed::{Header, MemoryDevice, Row, Writer};
///
/// let mut wtr = Writer::from_device(MemoryDevice::new());
/// let header = Header::from_row(["a", "b"].into_iter().collect());
/// wtr.open(header.clone()).unwrap();
/// let row: Row = ["1", "2"].into_iter().collect();
/// wtr.write(&header, &row).unwrap();
/// wtr.close().unwrap();
/// assert_eq!(wtr.into_device().as_bytes(), b"a,b\n1,2\n");
/// ```
pub struct Writer<D: Device> {
    device: D,
    events: Option<Box<dyn Events>>,
    delimiter: u8,
    quote: u8,
    eol: u8,
    feed_name: String,
    header: Header,
    rows: u64,
}

impl<D: Device> Writer<D> {
    /// Create a writer over the given device with the default
    /// configuration: comma delimiter, double quote, `\n` end of line.
    pub fn from_device(device: D) -> Writer<D> {
        Writer {
            device,
            events: None,
            delimiter: b',',
            quote: b'"',
            eol: b'\n',
            feed_name: String::new(),
            header: Header::new(),
            rows: 0,
        }
    }

    /// The field delimiter. The default is `b','`.
    pub fn delimiter(mut self, delimiter: u8) -> Writer<D> {
        self.delimiter = delimiter;
        self
    }

    /// The quote byte. The default is `b'"'`.
    pub fn quote(mut self, quote: u8) -> Writer<D> {
        self.quote = quote;
        self
    }

    /// The end-of-line byte. The default is `b'\n'`.
    pub fn eol(mut self, eol: u8) -> Writer<D> {
        self.eol = eol;
        self
    }

    /// A name identifying this feed.
    pub fn feed_name<S: Into<String>>(mut self, name: S) -> Writer<D> {
        self.feed_name = name.into();
        self
    }

    /// Move an [`Events`] implementation into the writer.
    pub fn events(mut self, events: Box<dyn Events>) -> Writer<D> {
        self.events = Some(events);
        self
    }

    /// Fix the output header and serialize it.
    ///
    /// One-shot: opening an already-open writer reports
    /// [`Error::WrongCall`]. The device is opened, `on_begin` fires, the
    /// header row is written (labels joined by the delimiter, terminated by
    /// the end-of-line byte, quote-wrapped per label marker), and
    /// `on_header` fires.
    pub fn open(&mut self, header: Header) -> Result<()> {
        if !self.header.is_empty() {
            return Err(Error::WrongCall);
        }
        match self.open_inner(header) {
            Ok(()) => Ok(()),
            Err(err) => {
                self.notify_error(&err);
                Err(err)
            }
        }
    }

    fn open_inner(&mut self, header: Header) -> Result<()> {
        self.device.open()?;
        if let Some(events) = self.events.as_mut() {
            events.on_begin();
        }
        self.header = header;
        let ncols = self.header.len();
        for ndx in 0..ncols {
            write_field(
                &mut self.device,
                self.quote,
                &self.header.row()[ndx],
            )?;
            let sep =
                if ndx + 1 < ncols { self.delimiter } else { self.eol };
            self.device.send(&[sep])?;
        }
        if let Some(events) = self.events.as_mut() {
            events.on_header(&self.header);
        }
        Ok(())
    }

    /// Serialize one row, re-projected into the writer's column order.
    ///
    /// For each output column, the same-labeled column is looked up in the
    /// supplied source `header` and the row field at that index is written.
    /// An output column absent from the source header — or indexing past
    /// the end of a short row — contributes no bytes: the separator
    /// structure is still emitted, but no placeholder value is invented.
    /// Readers that require a fixed column count will see such lines as
    /// short; this mirrors the reference behavior and is deliberate.
    pub fn write(&mut self, header: &Header, row: &Row) -> Result<()> {
        if self.header.is_empty() {
            return Err(Error::WrongCall);
        }
        match self.write_inner(header, row) {
            Ok(()) => {
                self.rows += 1;
                Ok(())
            }
            Err(err) => {
                self.notify_error(&err);
                Err(err)
            }
        }
    }

    fn write_inner(&mut self, header: &Header, row: &Row) -> Result<()> {
        let ncols = self.header.len();
        for ndx in 0..ncols {
            let label = self.header.row()[ndx].as_bytes();
            if let Some(src) = header.get_index(label) {
                if let Some(field) = row.get(src) {
                    write_field(&mut self.device, self.quote, field)?;
                }
            }
            let sep =
                if ndx + 1 < ncols { self.delimiter } else { self.eol };
            self.device.send(&[sep])?;
        }
        Ok(())
    }

    /// Flush and close the device, firing `on_end`.
    pub fn close(&mut self) -> Result<()> {
        // A device without flush support answers NotImplemented; that is
        // not a failure here.
        match self.device.flush() {
            Ok(()) | Err(Error::NotImplemented) => {}
            Err(err) => {
                self.notify_error(&err);
                return Err(err);
            }
        }
        self.device.close()?;
        if let Some(events) = self.events.as_mut() {
            events.on_end();
        }
        Ok(())
    }

    /// The output header, empty until [`open`](Writer::open).
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// The number of data rows written so far (the header line is not
    /// counted).
    pub fn rows_written(&self) -> u64 {
        self.rows
    }

    /// The feed name.
    pub fn feed(&self) -> &str {
        &self.feed_name
    }

    /// Consume the writer and return its device.
    pub fn into_device(self) -> D {
        self.device
    }

    fn notify_error(&mut self, err: &Error) {
        if let Some(events) = self.events.as_mut() {
            events.on_error(err);
        }
    }
}

/// Emit one field: quote byte, content, quote byte when the field is
/// marked quoted; bare content otherwise.
fn write_field<D: Device>(
    device: &mut D,
    quote: u8,
    field: &Field,
) -> Result<()> {
    if field.quoted() {
        device.send(&[quote])?;
    }
    if !field.is_empty() {
        device.send(field.as_bytes())?;
    }
    if field.quoted() {
        device.send(&[quote])?;
    }
    Ok(())
}
