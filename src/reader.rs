use crate::device::Device;
use crate::error::Result;
use crate::events::Events;
use crate::field::Field;
use crate::filter::FilterChain;
use crate::header::Header;
use crate::parser::Parser;
use crate::row::Row;

/// A CSV reader: a thin façade driving one [`Parser`] pass per call.
///
/// The reader owns its device and optional events exclusively; both move in
/// at construction and can be recovered with
/// [`into_device`](Reader::into_device) once reading is done.
///
/// # Example
///
/// ```
/// use csvfeed::{MemoryDevice, Reader, Row};
///
/// let dev = MemoryDevice::from_bytes("city,pop\nOslo,709k\n");
/// let mut rdr = Reader::from_device(dev);
/// let mut row = Row::new();
/// while rdr.read(&mut row).unwrap() {
///     println!("{} has population {}", row[0], row[1]);
/// }
/// ```
pub struct Reader<D: Device> {
    parser: Parser<D>,
}

impl<D: Device> Reader<D> {
    /// Create a reader over the given device with the default parser
    /// configuration.
    pub fn from_device(device: D) -> Reader<D> {
        Reader { parser: Parser::new(device) }
    }

    /// The field delimiter. The default is `b','`.
    pub fn delimiter(mut self, delimiter: u8) -> Reader<D> {
        self.parser = self.parser.delimiter(delimiter);
        self
    }

    /// The quote byte. The default is `b'"'`.
    pub fn quote(mut self, quote: u8) -> Reader<D> {
        self.parser = self.parser.quote(quote);
        self
    }

    /// The end-of-line byte. The default is `b'\n'`.
    pub fn eol(mut self, eol: u8) -> Reader<D> {
        self.parser = self.parser.eol(eol);
        self
    }

    /// The comment leader. The default is `b'#'`, inert until comments are
    /// enabled.
    pub fn comment(mut self, comment: u8) -> Reader<D> {
        self.parser = self.parser.comment(comment);
        self
    }

    /// The whitespace set used when whitespace skipping is enabled.
    pub fn whitespace<B: Into<Vec<u8>>>(mut self, set: B) -> Reader<D> {
        self.parser = self.parser.whitespace(set);
        self
    }

    /// Enable or disable whitespace skipping. Enabled by default.
    pub fn skip_whitespace(mut self, yes: bool) -> Reader<D> {
        self.parser = self.parser.skip_whitespace(yes);
        self
    }

    /// Strip boundary spaces from each completed field. Off by default.
    pub fn trim(mut self, yes: bool) -> Reader<D> {
        self.parser = self.parser.trim(yes);
        self
    }

    /// Skip lines starting with the comment leader. Off by default.
    pub fn comments(mut self, yes: bool) -> Reader<D> {
        self.parser = self.parser.comments(yes);
        self
    }

    /// A name identifying this feed, handed to filters.
    pub fn feed_name<S: Into<String>>(mut self, name: S) -> Reader<D> {
        self.parser = self.parser.feed_name(name);
        self
    }

    /// Move an [`Events`] implementation into the reader.
    pub fn events(mut self, events: Box<dyn Events>) -> Reader<D> {
        self.parser = self.parser.events(events);
        self
    }

    /// Open the reader.
    ///
    /// Always succeeds: the device itself opens lazily on the first read.
    pub fn open(&mut self) -> Result<()> {
        Ok(())
    }

    /// Read the next row into `row`.
    ///
    /// Returns `Ok(true)` when a row was delivered and `Ok(false)` at end
    /// of stream; calling again after the end keeps returning `Ok(false)`.
    /// The first successful call parses the header (unless one was supplied
    /// with [`set_header`](Reader::set_header)) before producing the first
    /// data row.
    pub fn read(&mut self, row: &mut Row) -> Result<bool> {
        self.parser.parse(row)
    }

    /// Close the reader.
    ///
    /// Always succeeds: the device is closed when the parser reaches the
    /// end of the stream, or released when the reader is dropped.
    pub fn close(&mut self) -> Result<()> {
        Ok(())
    }

    /// Supply the header externally; see [`Parser::set_header`].
    pub fn set_header(&mut self, labels: Row) -> bool {
        self.parser.set_header(labels)
    }

    /// Register an expected column with a default value; see
    /// [`Parser::append_column`].
    pub fn append_column<L: Into<Field>>(
        &mut self,
        label: L,
        default: Field,
    ) -> bool {
        self.parser.append_column(label, default)
    }

    /// Install a filter chain; see [`Parser::add_filters`].
    pub fn add_filters(&mut self, chain: FilterChain) {
        self.parser.add_filters(chain)
    }

    /// The column labels in use.
    pub fn header(&self) -> &Header {
        self.parser.header()
    }

    /// The number of data rows read so far.
    pub fn rows_read(&self) -> u64 {
        self.parser.rows_parsed()
    }

    /// Consume the reader and return its device.
    pub fn into_device(self) -> D {
        self.parser.into_device()
    }
}
