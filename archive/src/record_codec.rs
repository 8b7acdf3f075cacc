//! Text encoding of the RECORD manifest.
//!
//! RECORD is a headerless comma-separated table of
//! `path,algorithm=digest,size` rows terminated by `\n`. Paths containing a
//! comma, quote, or newline are quote-enclosed with embedded quotes doubled.
//! The manifest's own row comes last with blank digest and size.

use super::error::{ArchiveError, Result};
use super::hashing::FileHash;
use super::record::{Record, RecordEntry};
use csv::{ReaderBuilder, Terminator, WriterBuilder};
use std::io;

/// Serialise `record` followed by the self-referencing row for `record_path`.
///
/// Any row already present for `record_path` is skipped so that the
/// manifest lists itself exactly once.
///
/// # Errors
///
/// Returns [`ArchiveError::Io`] if the CSV writer fails.
///
/// # Examples
///
/// ```
/// use wheelwright_archive::record::Record;
/// use wheelwright_archive::record_codec::serialize_record;
///
/// let text = serialize_record(&Record::default(), "pkg-1.0.dist-info/RECORD")
///     .expect("serialises");
/// assert_eq!(text, "pkg-1.0.dist-info/RECORD,,\n");
/// ```
pub fn serialize_record(record: &Record, record_path: &str) -> Result<String> {
    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    for entry in record.iter().filter(|entry| entry.path() != record_path) {
        let hash = entry.hash().map(FileHash::to_string).unwrap_or_default();
        let size = entry.size().map(|size| size.to_string()).unwrap_or_default();
        writer
            .write_record([entry.path(), hash.as_str(), size.as_str()])
            .map_err(csv_to_archive_error)?;
    }
    writer
        .write_record([record_path, "", ""])
        .map_err(csv_to_archive_error)?;

    let bytes = writer
        .into_inner()
        .map_err(|err| ArchiveError::from(io::Error::new(err.error().kind(), err.to_string())))?;
    String::from_utf8(bytes)
        .map_err(|err| ArchiveError::from(io::Error::new(io::ErrorKind::InvalidData, err)))
}

/// Parse RECORD text into a [`Record`].
///
/// Rows with a blank digest are kept as unverifiable; reading such an
/// entry fails later, not here.
///
/// # Errors
///
/// Returns [`ArchiveError::WeakHashAlgorithm`] or
/// [`ArchiveError::UnsupportedHashAlgorithm`] for rejected algorithms and
/// [`ArchiveError::InvalidRecord`] for rows without exactly three fields,
/// malformed digests or sizes, or a digest without a size.
///
/// # Examples
///
/// ```
/// use wheelwright_archive::record_codec::parse_record;
///
/// let text = concat!(
///     "pkg/__init__.py,sha256=47DEQpj8HBSa-_TImW-5JCeuQeRkm5NMpJWZG3hSuFU,0\n",
///     "pkg-1.0.dist-info/RECORD,,\n",
/// );
/// let record = parse_record(text).expect("valid RECORD");
/// assert_eq!(record.len(), 2);
/// ```
pub fn parse_record(text: &str) -> Result<Record> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut record = Record::default();
    for (index, row) in reader.records().enumerate() {
        let row_number = index as u64 + 1;
        let invalid = |reason: String| ArchiveError::InvalidRecord {
            row: row_number,
            reason,
        };
        let row = row.map_err(|err| invalid(err.to_string()))?;
        if row.len() != 3 {
            return Err(invalid(format!("expected 3 fields, found {}", row.len())));
        }
        let (path, hash, size) = (&row[0], &row[1], &row[2]);

        let hash = if hash.is_empty() {
            None
        } else {
            Some(FileHash::parse_field(hash).map_err(|err| match err {
                ArchiveError::InvalidRecord { reason, .. } => invalid(reason),
                other => other,
            })?)
        };
        let size = if size.is_empty() {
            None
        } else {
            Some(
                size.parse::<u64>()
                    .map_err(|_| invalid(format!("invalid size \"{size}\"")))?,
            )
        };
        if hash.is_some() && size.is_none() {
            return Err(invalid(format!("\"{path}\" has a digest but no size")));
        }
        record.insert(RecordEntry::from_parts(path.to_owned(), hash, size));
    }
    Ok(record)
}

/// Unwrap I/O failures from the CSV layer; anything else is data corruption.
fn csv_to_archive_error(err: csv::Error) -> ArchiveError {
    if !err.is_io_error() {
        return ArchiveError::from(io::Error::new(io::ErrorKind::InvalidData, err));
    }
    match err.into_kind() {
        csv::ErrorKind::Io(io_err) => ArchiveError::from(io_err),
        _ => ArchiveError::from(io::Error::from(io::ErrorKind::InvalidData)),
    }
}
