//! Error types for wheel naming, RECORD handling, and archive I/O.
//!
//! Each variant names one failure kind so that callers can tell a missing
//! RECORD row apart from a digest mismatch without inspecting messages.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors arising from reading, writing, or naming wheel archives.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// The archive filename does not follow the wheel filename grammar.
    #[error("bad wheel filename \"{filename}\": {reason}")]
    BadFilename {
        /// The rejected filename.
        filename: String,
        /// Description of the grammar violation.
        reason: String,
    },

    /// No `<name>-<version>.dist-info` directory exists in the archive.
    #[error("cannot find a .dist-info directory; is this really a wheel file?")]
    MissingMetadataDirectory,

    /// The archive has no RECORD file in its metadata directory.
    #[error("missing {path} file")]
    MissingRecord {
        /// Archive path where the RECORD was expected.
        path: String,
    },

    /// A hash algorithm name is not known to the digest backend.
    #[error("unsupported hash algorithm: {algorithm}")]
    UnsupportedHashAlgorithm {
        /// The rejected algorithm name.
        algorithm: String,
    },

    /// A hash algorithm is known but too weak to be accepted.
    #[error("weak hash algorithm ({algorithm}) is not permitted")]
    WeakHashAlgorithm {
        /// The rejected algorithm name.
        algorithm: String,
    },

    /// A RECORD row could not be parsed.
    #[error("invalid RECORD row {row}: {reason}")]
    InvalidRecord {
        /// One-based row number inside the RECORD file.
        row: u64,
        /// Description of the malformed field.
        reason: String,
    },

    /// An entry's digest differs from its RECORD row.
    #[error("hash mismatch for file \"{path}\"")]
    HashMismatch {
        /// Archive path of the tampered entry.
        path: String,
    },

    /// An entry's length differs from its RECORD row.
    #[error("{path}: file size mismatch: {expected} bytes in RECORD, {actual} bytes in archive")]
    SizeMismatch {
        /// Archive path of the entry.
        path: String,
        /// Size recorded in RECORD.
        expected: u64,
        /// Number of bytes actually read.
        actual: u64,
    },

    /// An archive entry has no usable RECORD row.
    #[error("no hash found for file \"{path}\"")]
    MissingHash {
        /// Archive path of the unrecorded entry.
        path: String,
    },

    /// A requested file does not exist in the archive.
    #[error("file \"{path}\" not found")]
    FileNotFound {
        /// Archive path that was looked up.
        path: String,
    },

    /// The writer has already been finished or aborted.
    #[error("wheel writer is closed")]
    WriteAfterClose,

    /// An archive path is empty or escapes the archive root.
    #[error("invalid entry path \"{path}\": {reason}")]
    InvalidEntryPath {
        /// The rejected archive path.
        path: String,
        /// Description of the problem.
        reason: String,
    },

    /// An entry path would be extracted outside the destination.
    #[error("path traversal detected: {path}")]
    PathTraversal {
        /// The offending path from the archive entry.
        path: String,
    },

    /// A path expected to be a directory is missing or is a file.
    #[error("{} is not a directory", path.display())]
    NotADirectory {
        /// The offending filesystem path.
        path: PathBuf,
    },

    /// A timestamp cannot be represented in a ZIP entry header.
    #[error("timestamp {seconds} cannot be stored in a ZIP archive")]
    InvalidTimestamp {
        /// Seconds since the Unix epoch.
        seconds: i64,
    },

    /// A header-style metadata file (WHEEL or METADATA) is malformed.
    #[error("invalid {name} file: {reason}")]
    InvalidDescriptor {
        /// Basename of the metadata file.
        name: String,
        /// Description of the problem.
        reason: String,
    },

    /// An unpacked wheel tree cannot be repacked.
    #[error("cannot repack {}: {reason}", path.display())]
    InvalidLayout {
        /// The directory being repacked.
        path: PathBuf,
        /// Description of the layout problem.
        reason: String,
    },

    /// The ZIP container reported an error.
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[source] io::Error),
}

impl ArchiveError {
    /// Wrap this error in an [`io::Error`] so it can cross a `Read` or
    /// `Write` boundary and be recovered intact by `From<io::Error>`.
    #[must_use]
    pub fn into_io(self) -> io::Error {
        io::Error::new(io::ErrorKind::InvalidData, self)
    }
}

impl From<io::Error> for ArchiveError {
    fn from(err: io::Error) -> Self {
        let carries_archive_error = err
            .get_ref()
            .is_some_and(|inner| inner.is::<ArchiveError>());
        if !carries_archive_error {
            return Self::Io(err);
        }
        match err.into_inner().map(|inner| inner.downcast::<ArchiveError>()) {
            Some(Ok(inner)) => *inner,
            Some(Err(other)) => Self::Io(io::Error::new(io::ErrorKind::InvalidData, other)),
            None => Self::Io(io::Error::from(io::ErrorKind::InvalidData)),
        }
    }
}

/// Result type alias using [`ArchiveError`].
pub type Result<T> = std::result::Result<T, ArchiveError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_round_trip_preserves_variant() {
        let original = ArchiveError::SizeMismatch {
            path: "pkg/mod.py".to_owned(),
            expected: 10,
            actual: 9,
        };
        let recovered = ArchiveError::from(original.into_io());
        assert!(matches!(
            recovered,
            ArchiveError::SizeMismatch {
                expected: 10,
                actual: 9,
                ..
            }
        ));
    }

    #[test]
    fn plain_io_errors_stay_io() {
        let err = io::Error::new(io::ErrorKind::NotFound, "gone");
        let converted = ArchiveError::from(err);
        assert!(matches!(converted, ArchiveError::Io(_)));
    }

    #[test]
    fn size_mismatch_message_reports_both_sizes() {
        let err = ArchiveError::SizeMismatch {
            path: "a.py".to_owned(),
            expected: 3,
            actual: 4,
        };
        assert_eq!(
            err.to_string(),
            "a.py: file size mismatch: 3 bytes in RECORD, 4 bytes in archive"
        );
    }
}
