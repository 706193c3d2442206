use bstr::{BStr, BString};

use crate::header::Header;
use crate::row::Row;

/// Whether to keep applying the remaining filters of a chain.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ChainFlow {
    /// Continue with the next filter in the chain.
    Continue,
    /// Stop applying this chain to the current row.
    Break,
}

/// A single row-mutating check applied to one column.
///
/// Filters carry application logic the core knows nothing about: value
/// normalization, consistency checks, redaction. A filter edits
/// `row[index]` (or any other part of the row) in place.
pub trait Filter {
    /// Inspect or rewrite `row` at `index`.
    ///
    /// `feed` is the owning reader's feed name, `row_num` the 1-based data
    /// row number (the header is not counted), and `index` the column this
    /// chain is registered for — valid for both `header` and `row`.
    fn filter(
        &mut self,
        feed: &str,
        row_num: u64,
        index: usize,
        header: &Header,
        row: &mut Row,
    ) -> ChainFlow;
}

/// An ordered sequence of [`Filter`]s bound to one column label.
///
/// Filters run in the order they were appended, each seeing the previous
/// one's edits, until the end of the chain or the first
/// [`ChainFlow::Break`]. There is no identity control: appending the same
/// filter twice applies it twice.
pub struct FilterChain {
    label: BString,
    filters: Vec<Box<dyn Filter>>,
}

impl FilterChain {
    /// Create an empty chain for the column with the given label.
    pub fn new<B: Into<BString>>(label: B) -> FilterChain {
        FilterChain { label: label.into(), filters: Vec::new() }
    }

    /// The column label this chain is registered for.
    pub fn label(&self) -> &BStr {
        self.label.as_ref()
    }

    /// Append a filter. Ownership moves into the chain.
    pub fn append(&mut self, filter: Box<dyn Filter>) {
        self.filters.push(filter);
    }

    /// Returns true when no filters are registered.
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Drop all filters.
    pub fn clear(&mut self) {
        self.filters.clear();
    }

    /// Apply the registered filters in sequence, short-circuiting on
    /// [`ChainFlow::Break`].
    pub fn apply(
        &mut self,
        feed: &str,
        row_num: u64,
        index: usize,
        header: &Header,
        row: &mut Row,
    ) {
        for filter in self.filters.iter_mut() {
            if filter.filter(feed, row_num, index, header, row)
                == ChainFlow::Break
            {
                break;
            }
        }
    }
}
