use std::collections::HashMap;

use bstr::{BStr, BString, ByteSlice};

use crate::field::Field;
use crate::row::Row;

/// The row of column labels plus a label-to-index lookup.
///
/// A header *has* a label row and a map derived from it, rather than being a
/// row itself: every mutation goes through methods that keep the map in
/// sync. Label matching is case-sensitive and exact, on raw bytes.
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Header {
    labels: Row,
    map: HashMap<BString, usize>,
}

impl Header {
    /// Create a new empty header.
    pub fn new() -> Header {
        Header::default()
    }

    /// Create a header initialized from the given label row.
    pub fn from_row(labels: Row) -> Header {
        let mut header = Header::new();
        header.init(labels);
        header
    }

    /// Initialize the header with a row of column labels.
    ///
    /// This is a one-shot operation: it returns `true` when the header was
    /// previously empty and the call actually took effect, and `false` when
    /// a header already existed, in which case `labels` is dropped — not
    /// merged, not appended.
    ///
    /// On success the label-to-index map is rebuilt in full by walking the
    /// row in order. Duplicate labels are accepted; the map resolves them
    /// last-write-wins, so `get_index` returns one definitive index and
    /// stays consistent with `contains`.
    pub fn init(&mut self, labels: Row) -> bool {
        if !self.labels.is_empty() {
            return false;
        }
        self.labels = labels;
        self.map.clear();
        for (ndx, label) in self.labels.iter().enumerate() {
            self.map.insert(label.data().to_owned(), ndx);
        }
        true
    }

    /// Append a single column label.
    ///
    /// Unlike `init`, this rejects duplicates: when a column with the same
    /// content already exists the header is left untouched and `false` is
    /// returned.
    pub fn push(&mut self, label: Field) -> bool {
        if self.map.contains_key(label.data()) {
            return false;
        }
        let ndx = self.labels.len();
        self.map.insert(label.data().to_owned(), ndx);
        self.labels.push(label);
        true
    }

    /// Whether a column with the given label exists.
    pub fn contains<B: AsRef<[u8]>>(&self, label: B) -> bool {
        self.map.contains_key(label.as_ref().as_bstr())
    }

    /// The zero-based column index for the given label, or `None` when the
    /// label is not part of the header.
    pub fn get_index<B: AsRef<[u8]>>(&self, label: B) -> Option<usize> {
        self.map.get(label.as_ref().as_bstr()).copied()
    }

    /// The column index for a label the caller knows to exist.
    ///
    /// This skips the existence check `get_index` performs, and looking up a
    /// label that is *not* part of the header inserts a zero-valued entry
    /// into the map as a side effect — a subsequent `contains` for it will
    /// answer `true`. Only use this when the label is known to be present.
    pub fn index_entry<B: AsRef<[u8]>>(&mut self, label: B) -> usize {
        *self.map.entry(label.as_ref().as_bstr().to_owned()).or_insert(0)
    }

    /// A read-only view of the underlying label row.
    pub fn row(&self) -> &Row {
        &self.labels
    }

    /// The number of columns.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Returns true if no header has been set.
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// The label at column `ndx`, when in bounds.
    pub fn label(&self, ndx: usize) -> Option<&BStr> {
        self.labels.get(ndx).map(|field| field.data())
    }
}

#[cfg(test)]
mod tests {
    use super::Header;
    use crate::row::Row;

    fn labels(names: &[&str]) -> Row {
        names.iter().copied().collect()
    }

    #[test]
    fn init_is_one_shot() {
        let mut header = Header::new();
        assert!(header.init(labels(&["a", "b"])));
        assert!(!header.init(labels(&["x", "y", "z"])));
        assert_eq!(header.len(), 2);
        assert_eq!(header.get_index("a"), Some(0));
        assert_eq!(header.get_index("x"), None);
    }

    #[test]
    fn duplicate_labels_resolve_last_write_wins() {
        let mut header = Header::new();
        assert!(header.init(labels(&["id", "name", "id"])));
        assert_eq!(header.len(), 3);
        assert_eq!(header.get_index("id"), Some(2));
        assert!(header.contains("id"));
        assert_eq!(header.get_index("name"), Some(1));
    }

    #[test]
    fn push_rejects_duplicates() {
        let mut header = Header::from_row(labels(&["a", "b"]));
        assert!(header.push("c".into()));
        assert!(!header.push("a".into()));
        assert_eq!(header.len(), 3);
        assert_eq!(header.get_index("c"), Some(2));
    }

    #[test]
    fn index_entry_inserts_on_miss() {
        let mut header = Header::from_row(labels(&["a"]));
        assert_eq!(header.index_entry("a"), 0);
        assert!(!header.contains("ghost"));
        assert_eq!(header.index_entry("ghost"), 0);
        // The documented sharp edge: the miss is now a map entry.
        assert!(header.contains("ghost"));
        assert_eq!(header.row().len(), 1);
    }
}
