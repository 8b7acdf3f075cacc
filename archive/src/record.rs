//! The RECORD manifest: one row per archive entry.
//!
//! Rows are kept in insertion order and keyed by unique path. Writing a row
//! for a path that is already present replaces it in place, so the textual
//! order stays stable across rewrites.

use super::hashing::FileHash;
use std::collections::HashMap;

/// Basename of the manifest file inside the metadata directory.
pub const RECORD_FILENAME: &str = "RECORD";

/// Control files exempt from hashing: the manifest and its historical
/// signature companions.
pub const CONTROL_FILENAMES: [&str; 3] = [RECORD_FILENAME, "RECORD.jws", "RECORD.p7s"];

/// One RECORD row.
///
/// A row without a hash is unverifiable; reading its entry to the end
/// fails. The manifest's own row is the only one expected to look like that.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordEntry {
    path: String,
    hash: Option<FileHash>,
    size: Option<u64>,
}

impl RecordEntry {
    /// A fully verifiable row.
    #[must_use]
    pub fn new(path: impl Into<String>, hash: FileHash, size: u64) -> Self {
        Self {
            path: path.into(),
            hash: Some(hash),
            size: Some(size),
        }
    }

    /// A row with neither digest nor size, such as the manifest's own row.
    #[must_use]
    pub fn placeholder(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            hash: None,
            size: None,
        }
    }

    /// A row as read from a RECORD file, where either field may be blank.
    #[must_use]
    pub fn from_parts(path: String, hash: Option<FileHash>, size: Option<u64>) -> Self {
        Self { path, hash, size }
    }

    /// Return the archive path.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Return the hash, if recorded.
    #[must_use]
    pub fn hash(&self) -> Option<&FileHash> {
        self.hash.as_ref()
    }

    /// Return the size, if recorded.
    #[must_use]
    pub fn size(&self) -> Option<u64> {
        self.size
    }
}

/// The ordered RECORD table.
///
/// # Examples
///
/// ```
/// use wheelwright_archive::hashing::HashAlgorithm;
/// use wheelwright_archive::hashing::FileHash;
/// use wheelwright_archive::record::{Record, RecordEntry};
///
/// let mut record = Record::default();
/// let hash = FileHash::new(HashAlgorithm::Sha256, HashAlgorithm::Sha256.digest(b"x"));
/// record.insert(RecordEntry::new("pkg/x.py", hash, 1));
/// assert_eq!(record.get("pkg/x.py").and_then(RecordEntry::size), Some(1));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    entries: Vec<RecordEntry>,
    index: HashMap<String, usize>,
}

impl Record {
    /// Insert a row, replacing any existing row for the same path in place.
    pub fn insert(&mut self, entry: RecordEntry) {
        if let Some(&position) = self.index.get(entry.path()) {
            self.entries[position] = entry;
        } else {
            self.index.insert(entry.path.clone(), self.entries.len());
            self.entries.push(entry);
        }
    }

    /// Look up the row for `path`.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<&RecordEntry> {
        self.index.get(path).map(|&position| &self.entries[position])
    }

    /// Return whether a row exists for `path`.
    #[must_use]
    pub fn contains(&self, path: &str) -> bool {
        self.index.contains_key(path)
    }

    /// Iterate rows in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &RecordEntry> {
        self.entries.iter()
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Return whether the table has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'a> IntoIterator for &'a Record {
    type Item = &'a RecordEntry;
    type IntoIter = std::slice::Iter<'a, RecordEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Return whether `path` names a control file directly inside `dist_info_dir`.
///
/// # Examples
///
/// ```
/// use wheelwright_archive::record::is_control_file;
///
/// assert!(is_control_file("pkg-1.0.dist-info/RECORD", "pkg-1.0.dist-info"));
/// assert!(!is_control_file("pkg/RECORD", "pkg-1.0.dist-info"));
/// ```
#[must_use]
pub fn is_control_file(path: &str, dist_info_dir: &str) -> bool {
    path.strip_prefix(dist_info_dir)
        .and_then(|rest| rest.strip_prefix('/'))
        .is_some_and(|name| CONTROL_FILENAMES.contains(&name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hashing::HashAlgorithm;
    use rstest::{fixture, rstest};

    fn hash_of(data: &[u8]) -> FileHash {
        FileHash::new(HashAlgorithm::Sha256, HashAlgorithm::Sha256.digest(data))
    }

    #[fixture]
    fn record() -> Record {
        let mut record = Record::default();
        record.insert(RecordEntry::new("b.py", hash_of(b"b"), 1));
        record.insert(RecordEntry::new("a.py", hash_of(b"a"), 1));
        record
    }

    #[rstest]
    fn preserves_insertion_order(record: Record) {
        let paths: Vec<&str> = record.iter().map(RecordEntry::path).collect();
        assert_eq!(paths, ["b.py", "a.py"]);
    }

    #[rstest]
    fn replacing_a_row_keeps_its_position(mut record: Record) {
        record.insert(RecordEntry::new("b.py", hash_of(b"bb"), 2));
        let paths: Vec<&str> = record.iter().map(RecordEntry::path).collect();
        assert_eq!(paths, ["b.py", "a.py"]);
        assert_eq!(record.get("b.py").and_then(RecordEntry::size), Some(2));
        assert_eq!(record.len(), 2);
    }

    #[rstest]
    fn placeholder_has_no_hash_or_size() {
        let entry = RecordEntry::placeholder("x-1.dist-info/RECORD");
        assert!(entry.hash().is_none());
        assert!(entry.size().is_none());
    }

    #[rstest]
    #[case("x-1.dist-info/RECORD", true)]
    #[case("x-1.dist-info/RECORD.jws", true)]
    #[case("x-1.dist-info/RECORD.p7s", true)]
    #[case("x-1.dist-info/METADATA", false)]
    #[case("x-1.dist-info/sub/RECORD", false)]
    #[case("x-1.dist-infoRECORD", false)]
    #[case("RECORD", false)]
    fn recognises_control_files(#[case] path: &str, #[case] expected: bool) {
        assert_eq!(is_control_file(path, "x-1.dist-info"), expected);
    }
}
