use std::collections::HashMap;

use bstr::BString;

use crate::device::Device;
use crate::error::{Error, Result};
use crate::events::{Events, RowOutcome};
use crate::field::Field;
use crate::filter::FilterChain;
use crate::header::Header;
use crate::row::{Row, RowFlag};

/// The read-ahead cache capacity: 32 KiB, refilled with one `recv` per
/// exhaustion to amortize per-byte device cost.
const CACHE_CAPACITY: usize = 32 * 1024;

/// Default whitespace set: the control characters BEL, BS, TAB, VT, FF, CR
/// and LF. Plain space is deliberately absent; stripping spaces is the trim
/// policy's job.
const DEFAULT_WHITESPACE: &[u8] = b"\x07\x08\t\x0b\x0c\r\n";

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum State {
    Start,
    ReadHeader,
    ReadRows,
    End,
}

/// A pull-based CSV parser over a [`Device`].
///
/// The parser owns its configuration, a read-ahead byte cache, the
/// [`Header`] once built, and the optional [`Events`] and filter chains
/// moved in at construction. Its state machine moves forward only:
/// `Start → ReadHeader → ReadRows → End`, with `ReadHeader` skipped when a
/// header was supplied through [`set_header`](Parser::set_header).
///
/// Each [`parse`](Parser::parse) call runs at most one state-machine pass
/// and yields at most one row. Reaching the end of the stream closes the
/// device and fires [`Events::on_end`], both exactly once; later calls keep
/// answering `Ok(false)` with no side effects.
///
/// # Quoting
///
/// Delimiter, end-of-line and comment bytes seen while a quote is open are
/// literal field content. A completed field is considered quoted only when
/// its first and last bytes (after optional trimming) are both the quote
/// byte at distinct positions; the wrapping pair is stripped and the
/// field's quoted marker set. A lone quote byte is ordinary content.
///
/// # Example
///
/// ```
/// use csvfeed::{MemoryDevice, Parser, Row};
///
/// let dev = MemoryDevice::from_bytes("name,age\nAlice,30\nBob,25");
/// let mut parser = Parser::new(dev);
/// let mut row = Row::new();
/// let mut total = 0;
/// while parser.parse(&mut row).unwrap() {
///     total += 1;
/// }
/// assert_eq!(total, 2);
/// assert_eq!(parser.header().len(), 2);
/// ```
pub struct Parser<D: Device> {
    device: D,
    events: Option<Box<dyn Events>>,
    filters: HashMap<BString, FilterChain>,
    header: Header,
    defaults: Vec<Field>,
    feed_name: String,

    delimiter: u8,
    quote: u8,
    eol: u8,
    comment: u8,
    whitespace: Vec<u8>,
    skip_whitespace: bool,
    trim: bool,
    comments: bool,

    state: State,
    begun: bool,
    ended: bool,
    buf: Vec<u8>,
    buf_len: usize,
    buf_pos: usize,
    scratch: Vec<u8>,
    in_quotes: bool,
    in_comment: bool,
    rows: u64,
}

impl<D: Device> Parser<D> {
    /// Create a parser bound to the given device, with the default
    /// configuration: comma delimiter, double quote, `\n` end of line, `#`
    /// comment leader (inert until comments are enabled), control-character
    /// whitespace set with skipping on, trimming off.
    pub fn new(device: D) -> Parser<D> {
        Parser {
            device,
            events: None,
            filters: HashMap::new(),
            header: Header::new(),
            defaults: Vec::new(),
            feed_name: String::new(),
            delimiter: b',',
            quote: b'"',
            eol: b'\n',
            comment: b'#',
            whitespace: DEFAULT_WHITESPACE.to_vec(),
            skip_whitespace: true,
            trim: false,
            comments: false,
            state: State::Start,
            begun: false,
            ended: false,
            buf: vec![0; CACHE_CAPACITY],
            buf_len: 0,
            buf_pos: 0,
            scratch: Vec::with_capacity(1024),
            in_quotes: false,
            in_comment: false,
            rows: 0,
        }
    }

    /// The field delimiter. The default is `b','`.
    pub fn delimiter(mut self, delimiter: u8) -> Parser<D> {
        self.delimiter = delimiter;
        self
    }

    /// The quote byte. The default is `b'"'`.
    pub fn quote(mut self, quote: u8) -> Parser<D> {
        self.quote = quote;
        self
    }

    /// The end-of-line byte. The default is `b'\n'`.
    pub fn eol(mut self, eol: u8) -> Parser<D> {
        self.eol = eol;
        self
    }

    /// The comment leader. The default is `b'#'`; it has no effect until
    /// comments are enabled with [`comments`](Parser::comments).
    pub fn comment(mut self, comment: u8) -> Parser<D> {
        self.comment = comment;
        self
    }

    /// The set of bytes discarded while accumulating unquoted field
    /// content, when whitespace skipping is enabled. The default covers the
    /// control characters, not plain space.
    pub fn whitespace<B: Into<Vec<u8>>>(mut self, set: B) -> Parser<D> {
        self.whitespace = set.into();
        self
    }

    /// Enable or disable whitespace skipping. Enabled by default.
    pub fn skip_whitespace(mut self, yes: bool) -> Parser<D> {
        self.skip_whitespace = yes;
        self
    }

    /// Strip leading and trailing plain spaces from each completed field.
    /// Disabled by default; independent of whitespace skipping, and the two
    /// compose.
    pub fn trim(mut self, yes: bool) -> Parser<D> {
        self.trim = yes;
        self
    }

    /// Treat lines starting with the comment leader as comments and skip
    /// them. Disabled by default.
    pub fn comments(mut self, yes: bool) -> Parser<D> {
        self.comments = yes;
        self
    }

    /// A name identifying this feed, handed to filters.
    pub fn feed_name<S: Into<String>>(mut self, name: S) -> Parser<D> {
        self.feed_name = name.into();
        self
    }

    /// Move an [`Events`] implementation into the parser.
    pub fn events(mut self, events: Box<dyn Events>) -> Parser<D> {
        self.events = Some(events);
        self
    }

    /// Supply the header externally instead of parsing it from the first
    /// line.
    ///
    /// One-shot, like [`Header::init`]: returns `false` and drops `labels`
    /// when a header is already in place. With a pre-set header the first
    /// line of the stream is data and [`Events::on_header`] is not fired.
    pub fn set_header(&mut self, labels: Row) -> bool {
        self.header.init(labels)
    }

    /// The header: the parsed or supplied column labels. Empty until the
    /// first parse call succeeds or [`set_header`](Parser::set_header) is
    /// used.
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// The number of data rows parsed so far (the header is not counted).
    pub fn rows_parsed(&self) -> u64 {
        self.rows
    }

    /// The feed name handed to filters.
    pub fn feed(&self) -> &str {
        &self.feed_name
    }

    /// Register an expected column after construction.
    ///
    /// The label is appended to the header and `default` is recorded: a
    /// parsed row that is short by exactly the columns registered this way
    /// is padded with their defaults before the field-count check, so
    /// feeds that predate the new column keep parsing cleanly.
    ///
    /// Returns `false` when the label already exists or when the events
    /// handler vetoes the append through
    /// [`Events::on_append_field`].
    pub fn append_column<L: Into<Field>>(
        &mut self,
        label: L,
        default: Field,
    ) -> bool {
        let label = label.into();
        if self.header.contains(label.as_bytes()) {
            return false;
        }
        if let Some(events) = self.events.as_mut() {
            if !events.on_append_field(&self.header, &label, &default) {
                return false;
            }
        }
        if !self.header.push(label) {
            return false;
        }
        self.defaults.push(default);
        true
    }

    /// Install a filter chain for the column matching its label, replacing
    /// any chain previously registered for that label.
    pub fn add_filters(&mut self, chain: FilterChain) {
        self.filters.insert(chain.label().to_owned(), chain);
    }

    /// Consume the parser and return its device.
    pub fn into_device(self) -> D {
        self.device
    }

    /// Run one state-machine pass, parsing at most one row into `row`.
    ///
    /// Returns `Ok(true)` when a row was delivered and `Ok(false)` at the
    /// end of the stream — repeatably, and without re-firing `on_end`. A
    /// device error propagates without a state change, so the call may be
    /// retried.
    ///
    /// A row whose field count differs from the header's is still
    /// delivered; the mismatch is reported through
    /// [`Events::on_error`]. A row discarded by an event handler is
    /// delivered cleared, with [`RowFlag::Deleted`] set.
    pub fn parse(&mut self, row: &mut Row) -> Result<bool> {
        loop {
            match self.state {
                State::Start => {
                    if !self.begun {
                        self.begun = true;
                        if let Some(events) = self.events.as_mut() {
                            events.on_begin();
                        }
                    }
                    self.state = if self.header.is_empty() {
                        State::ReadHeader
                    } else {
                        State::ReadRows
                    };
                }
                State::ReadHeader => {
                    let mut labels = Row::new();
                    if self.parse_row(&mut labels)? {
                        self.header.init(labels);
                        if let Some(events) = self.events.as_mut() {
                            events.on_header(&self.header);
                        }
                        self.state = State::ReadRows;
                    } else {
                        self.state = State::End;
                    }
                }
                State::ReadRows => {
                    if self.parse_row(row)? {
                        self.rows += 1;
                        self.finish_row(row);
                        return Ok(true);
                    }
                    self.state = State::End;
                }
                State::End => {
                    if !self.ended {
                        self.ended = true;
                        let _ = self.device.close();
                        if let Some(events) = self.events.as_mut() {
                            events.on_end();
                        }
                    }
                    return Ok(false);
                }
            }
        }
    }

    /// Tokenize one row from the device stream.
    ///
    /// Returns `Ok(true)` when a row was produced and `Ok(false)` when the
    /// stream ended with nothing accumulated. A final line missing its
    /// end-of-line byte is recovered: whatever the scratch accumulator
    /// holds when the stream ends is flushed as the last field.
    fn parse_row(&mut self, row: &mut Row) -> Result<bool> {
        self.scratch.clear();
        self.in_quotes = false;
        self.in_comment = false;
        // Flags from a previous (possibly discarded) row must not leak.
        row.clear();
        if !self.header.is_empty() {
            row.reserve(self.header.len());
        }
        loop {
            if self.buf_pos == self.buf_len {
                match self.fill_buf() {
                    Ok(0) => {
                        if !self.scratch.is_empty() {
                            let field = self.take_field();
                            row.push(field);
                        }
                        return Ok(!row.is_empty());
                    }
                    Ok(_) => {}
                    Err(err) => {
                        self.notify_error(&err);
                        return Err(err);
                    }
                }
            }
            let ch = self.buf[self.buf_pos];
            self.buf_pos += 1;

            if self.in_comment {
                // Discard up to and including the end of the comment line.
                if ch == self.eol {
                    self.in_comment = false;
                }
                continue;
            }
            if self.comments
                && ch == self.comment
                && self.scratch.is_empty()
                && !self.in_quotes
            {
                // A comment cannot start mid-field.
                self.in_comment = true;
                continue;
            }
            if ch == self.quote {
                if !self.in_quotes && self.scratch.is_empty() {
                    self.in_quotes = true;
                } else if self.in_quotes && !self.scratch.is_empty() {
                    self.in_quotes = false;
                }
                self.scratch.push(ch);
                continue;
            }
            if ch == self.delimiter && !self.in_quotes {
                let field = self.take_field();
                row.push(field);
                continue;
            }
            if ch == self.eol && !self.in_quotes {
                let field = self.take_field();
                row.push(field);
                return Ok(true);
            }
            if self.skip_whitespace
                && !self.in_quotes
                && memchr::memchr(ch, &self.whitespace).is_some()
            {
                continue;
            }
            self.scratch.push(ch);
        }
    }

    /// Complete the field currently in the scratch accumulator: apply the
    /// trim policy, recognize and strip a wrapping quote pair, and reset
    /// the accumulator.
    fn take_field(&mut self) -> Field {
        let mut start = 0;
        let mut end = self.scratch.len();
        if self.trim {
            while start < end && self.scratch[start] == b' ' {
                start += 1;
            }
            while end > start && self.scratch[end - 1] == b' ' {
                end -= 1;
            }
        }
        let mut quoted = false;
        if end - start >= 2
            && self.scratch[start] == self.quote
            && self.scratch[end - 1] == self.quote
        {
            quoted = true;
            start += 1;
            end -= 1;
        }
        let field = Field::new(&self.scratch[start..end], quoted);
        self.scratch.clear();
        self.in_quotes = false;
        field
    }

    /// Refill the read-ahead cache with one device `recv`.
    fn fill_buf(&mut self) -> Result<usize> {
        let n = self.device.recv(&mut self.buf)?;
        self.buf_len = n;
        self.buf_pos = 0;
        Ok(n)
    }

    /// Post-parse pipeline for one data row: default-column padding, the
    /// field-count check, events and filters.
    fn finish_row(&mut self, row: &mut Row) {
        if !self.defaults.is_empty() {
            let missing = self.header.len().saturating_sub(row.len());
            if missing > 0 && missing <= self.defaults.len() {
                let start = self.defaults.len() - missing;
                for default in &self.defaults[start..] {
                    row.push(default.clone());
                }
            }
        }
        if !self.header.is_empty() && row.len() != self.header.len() {
            let err = Error::UnequalLengths {
                expected: self.header.len(),
                got: row.len(),
                row: self.rows,
            };
            self.notify_error(&err);
        }
        if let Some(events) = self.events.as_mut() {
            if events.on_row(&self.header, row) == RowOutcome::Discard {
                row.clear();
                row.set_flag(RowFlag::Deleted);
                return;
            }
        }
        if !self.filters.is_empty() {
            self.apply_filters(row);
            if let Some(events) = self.events.as_mut() {
                if events.on_filtered_row(&self.header, row)
                    == RowOutcome::Discard
                {
                    row.clear();
                    row.set_flag(RowFlag::Deleted);
                }
            }
        }
    }

    /// Walk the header's columns and apply the chain registered for each
    /// label, if any.
    fn apply_filters(&mut self, row: &mut Row) {
        for ndx in 0..self.header.len() {
            let label = self.header.row()[ndx].data();
            if let Some(chain) = self.filters.get_mut(label) {
                chain.apply(&self.feed_name, self.rows, ndx, &self.header, row);
            }
        }
    }

    fn notify_error(&mut self, err: &Error) {
        if let Some(events) = self.events.as_mut() {
            events.on_error(err);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::Parser;
    use crate::device::memory::MemoryDevice;
    use crate::error::Error;
    use crate::events::{Events, RowOutcome};
    use crate::field::Field;
    use crate::filter::{ChainFlow, Filter, FilterChain};
    use crate::header::Header;
    use crate::row::{Row, RowFlag};

    type Csv = Vec<Vec<Field>>;

    /// Drive the raw row tokenizer to exhaustion.
    fn tokenize(parser: &mut Parser<MemoryDevice>) -> Csv {
        let mut csv = Csv::new();
        let mut row = Row::new();
        loop {
            match parser.parse_row(&mut row) {
                Ok(true) => csv.push(row.iter().cloned().collect()),
                Ok(false) => return csv,
                Err(err) => panic!("unexpected tokenizer error: {}", err),
            }
        }
    }

    macro_rules! csv {
        ($([$($field:expr),*]),* $(,)?) => {{
            #[allow(unused_mut)]
            let mut csv = Csv::new();
            $(
                csv.push(vec![$(Field::from($field)),*]);
            )*
            csv
        }};
    }

    macro_rules! tokenizes_to {
        ($name:ident, $data:expr, $expected:expr) => {
            tokenizes_to!($name, $data, $expected, |parser| parser);
        };
        ($name:ident, $data:expr, $expected:expr, $config:expr) => {
            #[test]
            fn $name() {
                let config: fn(
                    Parser<MemoryDevice>,
                ) -> Parser<MemoryDevice> = $config;
                let device = MemoryDevice::from_bytes($data);
                let mut parser = config(Parser::new(device));
                let got = tokenize(&mut parser);
                assert_eq!($expected, got);
            }
        };
    }

    tokenizes_to!(one_row_one_field, "a", csv![["a"]]);
    tokenizes_to!(one_row_many_fields, "a,b,c", csv![["a", "b", "c"]]);
    tokenizes_to!(one_row_trailing_comma_lf, "a,b,\n", csv![["a", "b", ""]]);
    tokenizes_to!(one_row_one_field_lf, "a\n", csv![["a"]]);
    tokenizes_to!(
        many_rows_many_fields,
        "a,b,c\nx,y,z",
        csv![["a", "b", "c"], ["x", "y", "z"]]
    );
    tokenizes_to!(
        many_rows_last_unterminated,
        "a,b\nx,y",
        csv![["a", "b"], ["x", "y"]]
    );
    tokenizes_to!(empty, "", csv![]);
    tokenizes_to!(
        crlf_input_with_default_whitespace,
        "a,b\r\nc,d\r\n",
        csv![["a", "b"], ["c", "d"]]
    );
    tokenizes_to!(
        tabs_are_whitespace_by_default,
        "a\tb,c\n",
        csv![["ab", "c"]]
    );
    tokenizes_to!(
        whitespace_kept_when_skipping_disabled,
        "a\tb,c\n",
        csv![["a\tb", "c"]],
        |parser| parser.skip_whitespace(false)
    );
    tokenizes_to!(
        whitespace_preserved_inside_quotes,
        "\"a\tb\",c\n",
        csv![["a\tb", "c"]]
    );
    tokenizes_to!(
        spaces_survive_without_trim,
        " a , b \n",
        csv![[" a ", " b "]]
    );
    tokenizes_to!(
        trim_strips_boundary_spaces,
        " a , b \n",
        csv![["a", "b"]],
        |parser| parser.trim(true)
    );
    tokenizes_to!(
        trim_composes_with_quote_detection,
        " \"ab\" , c \n",
        csv![["ab", "c"]],
        |parser| parser.trim(true)
    );
    tokenizes_to!(quoted_empty_field, "\"\",b\n", csv![["", "b"]]);
    tokenizes_to!(
        lone_quote_is_content,
        " \" ,b\n",
        csv![["\"", "b"]],
        |parser| parser.trim(true)
    );
    // An opening quote that never closes runs to the end of the stream;
    // the trailing content keeps the quote byte verbatim.
    tokenizes_to!(unterminated_quote_runs_out, "\",b", csv![["\",b"]]);
    tokenizes_to!(
        quoted_field_with_delimiter,
        "\"a,b\",c\n",
        csv![["a,b", "c"]]
    );
    // `\n` sits in the default whitespace set, but neither skipping nor
    // row termination applies inside quotes.
    tokenizes_to!(
        quoted_field_with_eol,
        "\"a\nb\",c\n",
        csv![["a\nb", "c"]]
    );
    tokenizes_to!(
        comment_line_produces_nothing,
        "#note\na,b\n",
        csv![["a", "b"]],
        |parser| parser.comments(true)
    );
    tokenizes_to!(
        comment_leader_inert_by_default,
        "#note\na,b\n",
        csv![["#note"], ["a", "b"]]
    );
    tokenizes_to!(
        comment_between_rows,
        "a,b\n# skip me\nc,d\n",
        csv![["a", "b"], ["c", "d"]],
        |parser| parser.comments(true)
    );
    tokenizes_to!(
        comment_leader_inside_quotes_is_content,
        "\"#tag\",b\n",
        csv![["#tag", "b"]],
        |parser| parser.comments(true)
    );
    tokenizes_to!(
        delimiter_semicolon,
        "a;b\n",
        csv![["a", "b"]],
        |parser| parser.delimiter(b';')
    );
    tokenizes_to!(
        eol_pipe,
        "a,b|c,d|",
        csv![["a", "b"], ["c", "d"]],
        |parser| parser.eol(b'|')
    );
    tokenizes_to!(
        quote_change,
        "za,bz,c\n",
        csv![["a,b", "c"]],
        |parser| parser.quote(b'z')
    );
    tokenizes_to!(empty_line_is_one_empty_field, "\n", csv![[""]]);

    #[test]
    fn quoted_marker_is_set_and_stripped() {
        let device = MemoryDevice::from_bytes("\"a,b\",c\n");
        let mut parser = Parser::new(device);
        let rows = tokenize(&mut parser);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0][0], "a,b");
        assert!(rows[0][0].quoted());
        assert_eq!(rows[0][1], "c");
        assert!(!rows[0][1].quoted());
    }

    #[test]
    fn cache_refills_across_device_chunks() {
        // Larger than the read-ahead cache, so the row spans refills.
        let big = "x".repeat(64 * 1024);
        let data = format!("{},tail\n", big);
        let device = MemoryDevice::from_bytes(data);
        let mut parser = Parser::new(device);
        let rows = tokenize(&mut parser);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0][0].len(), 64 * 1024);
        assert_eq!(rows[0][1], "tail");
    }

    #[test]
    fn first_row_becomes_header() {
        let device = MemoryDevice::from_bytes("name,age\nAlice,30\nBob,25");
        let mut parser = Parser::new(device);
        let mut row = Row::new();

        assert!(parser.parse(&mut row).unwrap());
        assert_eq!(parser.header().get_index("name"), Some(0));
        assert_eq!(parser.header().get_index("age"), Some(1));
        assert_eq!(row[0], "Alice");
        assert_eq!(row[1], "30");

        assert!(parser.parse(&mut row).unwrap());
        assert_eq!(row[0], "Bob");
        assert_eq!(row[1], "25");

        assert!(!parser.parse(&mut row).unwrap());
        assert_eq!(parser.rows_parsed(), 2);
    }

    #[test]
    fn preset_header_makes_first_line_data() {
        let device = MemoryDevice::from_bytes("1,2\n3,4\n");
        let mut parser = Parser::new(device);
        assert!(parser.set_header(["a", "b"].into_iter().collect()));
        assert!(!parser.set_header(["x"].into_iter().collect()));

        let mut row = Row::new();
        assert!(parser.parse(&mut row).unwrap());
        assert_eq!(row[0], "1");
        assert!(parser.parse(&mut row).unwrap());
        assert_eq!(row[0], "3");
        assert!(!parser.parse(&mut row).unwrap());
    }

    /// Records every event in order, through a shared log.
    struct Recorder {
        log: Rc<RefCell<Vec<String>>>,
        discard_rows: bool,
    }

    impl Recorder {
        fn new(log: Rc<RefCell<Vec<String>>>) -> Recorder {
            Recorder { log, discard_rows: false }
        }
    }

    impl Events for Recorder {
        fn on_begin(&mut self) {
            self.log.borrow_mut().push("begin".to_string());
        }

        fn on_header(&mut self, header: &Header) {
            self.log
                .borrow_mut()
                .push(format!("header:{}", header.len()));
        }

        fn on_row(&mut self, _header: &Header, row: &mut Row) -> RowOutcome {
            self.log.borrow_mut().push(format!("row:{}", row.len()));
            if self.discard_rows {
                RowOutcome::Discard
            } else {
                RowOutcome::Keep
            }
        }

        fn on_filtered_row(
            &mut self,
            _header: &Header,
            _row: &mut Row,
        ) -> RowOutcome {
            self.log.borrow_mut().push("filtered".to_string());
            RowOutcome::Keep
        }

        fn on_end(&mut self) {
            self.log.borrow_mut().push("end".to_string());
        }

        fn on_error(&mut self, err: &Error) {
            self.log.borrow_mut().push(format!("error:{}", err));
        }
    }

    #[test]
    fn event_order_and_idempotent_end() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let device = MemoryDevice::from_bytes("a,b\n1,2\n");
        let mut parser = Parser::new(device)
            .events(Box::new(Recorder::new(Rc::clone(&log))));

        let mut row = Row::new();
        assert!(parser.parse(&mut row).unwrap());
        assert!(!parser.parse(&mut row).unwrap());
        // End must stay terminal and silent.
        assert!(!parser.parse(&mut row).unwrap());
        assert!(!parser.parse(&mut row).unwrap());

        assert_eq!(
            *log.borrow(),
            vec!["begin", "header:2", "row:2", "end"]
        );
    }

    #[test]
    fn short_row_is_delivered_and_reported() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let device = MemoryDevice::from_bytes("a,b,c\n1,2\n");
        let mut parser = Parser::new(device)
            .events(Box::new(Recorder::new(Rc::clone(&log))));

        let mut row = Row::new();
        assert!(parser.parse(&mut row).unwrap());
        assert_eq!(row.len(), 2);
        let log = log.borrow();
        assert!(log.iter().any(|entry| entry.starts_with("error:")));
        assert!(log.contains(&"row:2".to_string()));
    }

    #[test]
    fn discarded_row_is_cleared_and_flagged() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut recorder = Recorder::new(Rc::clone(&log));
        recorder.discard_rows = true;
        let device = MemoryDevice::from_bytes("a,b\n1,2\n");
        let mut parser = Parser::new(device).events(Box::new(recorder));

        let mut row = Row::new();
        assert!(parser.parse(&mut row).unwrap());
        assert!(row.is_empty());
        assert!(row.test_flag(RowFlag::Deleted));
        assert!(!parser.parse(&mut row).unwrap());
    }

    struct Redact;

    impl Filter for Redact {
        fn filter(
            &mut self,
            _feed: &str,
            _row_num: u64,
            index: usize,
            _header: &Header,
            row: &mut Row,
        ) -> ChainFlow {
            if let Some(field) = row.get_mut(index) {
                field.set_data("***");
            }
            ChainFlow::Continue
        }
    }

    #[test]
    fn filters_run_per_labeled_column() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let device = MemoryDevice::from_bytes("user,secret\nalice,hunter2\n");
        let mut parser = Parser::new(device)
            .feed_name("accounts")
            .events(Box::new(Recorder::new(Rc::clone(&log))));
        let mut chain = FilterChain::new("secret");
        chain.append(Box::new(Redact));
        parser.add_filters(chain);

        let mut row = Row::new();
        assert!(parser.parse(&mut row).unwrap());
        assert_eq!(row[0], "alice");
        assert_eq!(row[1], "***");
        // With a chain installed the filtered-row event fires too.
        assert!(log.borrow().contains(&"filtered".to_string()));
    }

    #[test]
    fn append_column_pads_short_rows_with_default() {
        let device = MemoryDevice::from_bytes("a,b\n1,2\n");
        let mut parser = Parser::new(device);
        assert!(parser.set_header(["a", "b"].into_iter().collect()));
        assert!(parser.append_column("c", Field::from("n/a")));
        assert!(!parser.append_column("c", Field::from("dup")));

        let mut row = Row::new();
        assert!(parser.parse(&mut row).unwrap());
        assert_eq!(row.len(), 3);
        assert_eq!(row[0], "a");
        assert_eq!(row[2], "n/a");
    }

    struct Veto;

    impl Events for Veto {
        fn on_append_field(
            &mut self,
            _header: &Header,
            _label: &Field,
            _default: &Field,
        ) -> bool {
            false
        }
    }

    #[test]
    fn events_can_veto_append_column() {
        let device = MemoryDevice::from_bytes("");
        let mut parser = Parser::new(device).events(Box::new(Veto));
        parser.set_header(["a"].into_iter().collect());
        assert!(!parser.append_column("b", Field::default()));
        assert_eq!(parser.header().len(), 1);
    }
}
