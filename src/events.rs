use crate::error::Error;
use crate::field::Field;
use crate::header::Header;
use crate::row::Row;

/// What to do with a row after an event handler has seen it.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum RowOutcome {
    /// Deliver the row, with any in-place edits the handler made.
    #[default]
    Keep,
    /// Drop the row's content: it is cleared, marked
    /// [`RowFlag::Deleted`](crate::RowFlag::Deleted) and delivered flagged.
    Discard,
}

/// Lifecycle callbacks fired while parsing.
///
/// An implementation is moved into a reader at construction and owned by it
/// for its lifetime; the core calls out, never the reverse. All methods
/// default to no-ops, so implementers override only what they need.
///
/// A handler that wants to *replace* a row edits it through the `&mut Row`
/// it is given and answers [`RowOutcome::Keep`].
pub trait Events {
    /// Parsing is about to start. Fired once, on the first parse call.
    fn on_begin(&mut self) {}

    /// The header row was parsed and installed.
    ///
    /// Not fired when the header was supplied externally through
    /// [`set_header`](crate::Reader::set_header).
    fn on_header(&mut self, _header: &Header) {}

    /// A data row was parsed. The handler may edit it in place or discard
    /// it.
    fn on_row(&mut self, _header: &Header, _row: &mut Row) -> RowOutcome {
        RowOutcome::Keep
    }

    /// A data row passed through the filter chains. Only fired when at
    /// least one chain is installed.
    fn on_filtered_row(
        &mut self,
        _header: &Header,
        _row: &mut Row,
    ) -> RowOutcome {
        RowOutcome::Keep
    }

    /// The stream ended and the device was closed. Fired exactly once.
    fn on_end(&mut self) {}

    /// A device failure or a soft structural condition (such as a
    /// field-count mismatch) was observed.
    fn on_error(&mut self, _err: &Error) {}

    /// A new expected column is being appended to the header after
    /// construction. Return `false` to veto the append.
    fn on_append_field(
        &mut self,
        _header: &Header,
        _label: &Field,
        _default: &Field,
    ) -> bool {
        true
    }
}
