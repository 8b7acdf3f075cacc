//! Read-side integrity checking for archive entries.
//!
//! [`VerifyingReader`] decorates an opaque byte stream. It digests and counts
//! every byte handed to the caller and, when the stream reports end of file,
//! compares both against the entry's RECORD row. Verification is driven by
//! the caller: a stream that is dropped early is never judged.

use super::error::ArchiveError;
use super::hashing::{FileHash, Hasher};
use super::record::{Record, is_control_file};
use log::trace;
use std::io::{self, Read};

/// What the RECORD says about one archive entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expectation {
    /// A digest and length to check at end of stream.
    Digest {
        /// The recorded hash.
        hash: FileHash,
        /// The recorded length in bytes.
        size: u64,
    },
    /// A control file such as RECORD itself; never checked.
    Exempt,
    /// No usable row; reading to the end fails with
    /// [`ArchiveError::MissingHash`].
    Unrecorded,
}

impl Expectation {
    /// Look up the expectation for `path` in `record`.
    ///
    /// # Examples
    ///
    /// ```
    /// use wheelwright_archive::record::Record;
    /// use wheelwright_archive::verification::Expectation;
    ///
    /// let record = Record::default();
    /// let dir = "pkg-1.0.dist-info";
    /// assert_eq!(Expectation::lookup(&record, dir, "pkg-1.0.dist-info/RECORD"), Expectation::Exempt);
    /// assert_eq!(Expectation::lookup(&record, dir, "pkg/a.py"), Expectation::Unrecorded);
    /// ```
    #[must_use]
    pub fn lookup(record: &Record, dist_info_dir: &str, path: &str) -> Self {
        if is_control_file(path, dist_info_dir) {
            return Self::Exempt;
        }
        match record.get(path).map(|row| (row.hash(), row.size())) {
            Some((Some(hash), Some(size))) => Self::Digest {
                hash: hash.clone(),
                size,
            },
            _ => Self::Unrecorded,
        }
    }

    /// Return whether reading to the end can succeed.
    #[must_use]
    pub fn is_verifiable(&self) -> bool {
        !matches!(self, Self::Unrecorded)
    }
}

/// A [`Read`] adapter that checks the stream against its RECORD row at EOF.
///
/// The size is compared before the digest, so a truncated or padded entry
/// reports [`ArchiveError::SizeMismatch`] rather than a digest failure.
/// Errors cross the `Read` boundary via [`ArchiveError::into_io`]; convert
/// them back with `ArchiveError::from`.
pub struct VerifyingReader<R> {
    inner: R,
    path: String,
    expectation: Expectation,
    hasher: Option<Hasher>,
    bytes_read: u64,
    checked: bool,
}

impl<R: Read> VerifyingReader<R> {
    /// Wrap `inner`, the content of the entry stored at `path`.
    pub fn new(inner: R, path: impl Into<String>, expectation: Expectation) -> Self {
        let hasher = match &expectation {
            Expectation::Digest { hash, .. } => Some(hash.algorithm().hasher()),
            Expectation::Exempt | Expectation::Unrecorded => None,
        };
        Self {
            inner,
            path: path.into(),
            expectation,
            hasher,
            bytes_read: 0,
            checked: false,
        }
    }

    /// Archive path of the entry being read.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The RECORD expectation this stream is checked against.
    #[must_use]
    pub fn expectation(&self) -> &Expectation {
        &self.expectation
    }

    /// Number of bytes handed out so far.
    #[must_use]
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    /// Whether `err` is the container rejecting altered bytes (bad CRC or
    /// compressed framing) for an entry with a recorded digest.
    fn is_corruption(&self, err: &io::Error) -> bool {
        matches!(self.expectation, Expectation::Digest { .. })
            && matches!(
                err.kind(),
                io::ErrorKind::InvalidData | io::ErrorKind::InvalidInput | io::ErrorKind::UnexpectedEof
            )
            && !err.get_ref().is_some_and(|inner| inner.is::<ArchiveError>())
    }

    fn check(&mut self) -> Result<(), ArchiveError> {
        self.checked = true;
        match &self.expectation {
            Expectation::Exempt => Ok(()),
            Expectation::Unrecorded => Err(ArchiveError::MissingHash {
                path: self.path.clone(),
            }),
            Expectation::Digest { hash, size } => {
                if *size != self.bytes_read {
                    return Err(ArchiveError::SizeMismatch {
                        path: self.path.clone(),
                        expected: *size,
                        actual: self.bytes_read,
                    });
                }
                let digest = self.hasher.take().map(Hasher::finalize);
                if digest.as_deref() != Some(hash.digest()) {
                    return Err(ArchiveError::HashMismatch {
                        path: self.path.clone(),
                    });
                }
                trace!(target: "wheelwright::verify", "verified {}", self.path);
                Ok(())
            }
        }
    }
}

impl<R: Read> Read for VerifyingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let read = match self.inner.read(buf) {
            Ok(read) => read,
            Err(err) if self.is_corruption(&err) => {
                self.checked = true;
                trace!(target: "wheelwright::verify", "{} is corrupt: {err}", self.path);
                return Err(ArchiveError::HashMismatch {
                    path: self.path.clone(),
                }
                .into_io());
            }
            Err(err) => return Err(err),
        };
        if read == 0 && !buf.is_empty() && !self.checked {
            self.check().map_err(ArchiveError::into_io)?;
        }
        if let Some(hasher) = self.hasher.as_mut() {
            hasher.update(&buf[..read]);
        }
        self.bytes_read += read as u64;
        Ok(read)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hashing::HashAlgorithm;
    use crate::record::RecordEntry;
    use rstest::{fixture, rstest};
    use std::io::Cursor;

    const DIST_INFO: &str = "pkg-1.0.dist-info";
    const CONTENT: &[u8] = b"print('hello, world!')\n\n\n";

    fn digest_of(data: &[u8]) -> Expectation {
        Expectation::Digest {
            hash: FileHash::new(HashAlgorithm::Sha256, HashAlgorithm::Sha256.digest(data)),
            size: data.len() as u64,
        }
    }

    fn read_all(data: &[u8], expectation: Expectation) -> Result<Vec<u8>, ArchiveError> {
        let mut reader = VerifyingReader::new(Cursor::new(data.to_vec()), "hello/hello.py", expectation);
        let mut out = Vec::new();
        reader.read_to_end(&mut out)?;
        Ok(out)
    }

    #[fixture]
    fn record() -> Record {
        let mut record = Record::default();
        record.insert(RecordEntry::new(
            "hello/hello.py",
            FileHash::new(HashAlgorithm::Sha256, HashAlgorithm::Sha256.digest(CONTENT)),
            CONTENT.len() as u64,
        ));
        record.insert(RecordEntry::placeholder("pkg/blank.py"));
        record.insert(RecordEntry::placeholder(format!("{DIST_INFO}/RECORD")));
        record
    }

    #[test]
    fn passes_matching_content_through() {
        assert_eq!(CONTENT.len(), 25);
        let out = read_all(CONTENT, digest_of(CONTENT)).expect("verifies");
        assert_eq!(out, CONTENT);
    }

    #[test]
    fn flipped_byte_is_hash_mismatch() {
        let mut tampered = CONTENT.to_vec();
        tampered[0] ^= 0x01;
        let err = read_all(&tampered, digest_of(CONTENT)).expect_err("tampered");
        assert!(matches!(err, ArchiveError::HashMismatch { .. }));
    }

    /// Fails the way the container does when its CRC check trips.
    struct CorruptSource;

    impl Read for CorruptSource {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::InvalidData, "Invalid checksum"))
        }
    }

    #[test]
    fn container_checksum_failure_is_hash_mismatch() {
        let mut reader = VerifyingReader::new(CorruptSource, "hello/hello.py", digest_of(CONTENT));
        let err = ArchiveError::from(reader.read_to_end(&mut Vec::new()).expect_err("corrupt"));
        assert!(matches!(err, ArchiveError::HashMismatch { path } if path == "hello/hello.py"));
    }

    #[rstest]
    #[case::exempt(Expectation::Exempt)]
    #[case::unrecorded(Expectation::Unrecorded)]
    fn container_failure_without_digest_stays_io(#[case] expectation: Expectation) {
        let mut reader = VerifyingReader::new(CorruptSource, "a", expectation);
        let err = ArchiveError::from(reader.read_to_end(&mut Vec::new()).expect_err("corrupt"));
        assert!(matches!(err, ArchiveError::Io(_)));
    }

    #[rstest]
    #[case::truncated(&CONTENT[..20])]
    #[case::padded(b"print('hello, world!')\n\n\n\n")]
    fn length_change_is_size_mismatch(#[case] stored: &[u8]) {
        let err = read_all(stored, digest_of(CONTENT)).expect_err("wrong size");
        assert!(matches!(
            err,
            ArchiveError::SizeMismatch { expected: 25, .. }
        ));
    }

    #[test]
    fn unrecorded_entry_fails_at_end() {
        let err = read_all(b"x", Expectation::Unrecorded).expect_err("unrecorded");
        assert!(matches!(err, ArchiveError::MissingHash { .. }));
    }

    #[test]
    fn partial_read_is_not_judged() {
        let mut reader = VerifyingReader::new(Cursor::new(b"abc".to_vec()), "a", Expectation::Unrecorded);
        let mut buf = [0_u8; 2];
        reader.read_exact(&mut buf).expect("partial read");
        assert_eq!(reader.bytes_read(), 2);
    }

    #[test]
    fn exempt_entry_reads_cleanly() {
        assert_eq!(read_all(b"anything", Expectation::Exempt).expect("exempt"), b"anything");
    }

    #[rstest]
    fn lookup_classifies_rows(record: Record) {
        assert!(matches!(
            Expectation::lookup(&record, DIST_INFO, "hello/hello.py"),
            Expectation::Digest { size: 25, .. }
        ));
        assert_eq!(
            Expectation::lookup(&record, DIST_INFO, "pkg/blank.py"),
            Expectation::Unrecorded
        );
        assert_eq!(
            Expectation::lookup(&record, DIST_INFO, "pkg/missing.py"),
            Expectation::Unrecorded
        );
        assert_eq!(
            Expectation::lookup(&record, DIST_INFO, &format!("{DIST_INFO}/RECORD.jws")),
            Expectation::Exempt
        );
    }
}
