//! Wheel archive reading with RECORD verification.
//!
//! Opening a [`WheelReader`] locates the `.dist-info` directory and loads
//! RECORD eagerly. Every later read goes through a [`VerifyingReader`], so a
//! caller that consumes an entry to the end either gets its bytes or a
//! [`ArchiveError::HashMismatch`], [`ArchiveError::SizeMismatch`], or
//! [`ArchiveError::MissingHash`].

use super::descriptor::{HeaderMessage, METADATA_FILENAME, WHEEL_FILENAME, WheelDescriptor};
use super::error::{ArchiveError, Result};
use super::extraction::{ensure_directory, restore_executable_bits, target_path, write_file};
use super::hashing::FileHash;
use super::naming::{DistributionIdentity, split_dist_info_dir};
use super::record::{RECORD_FILENAME, Record};
use super::record_codec::parse_record;
use super::verification::{Expectation, VerifyingReader};
use log::{debug, trace};
use std::fs::{self, File};
use std::io::{self, BufReader, Read, Seek};
use std::path::Path;
use zip::ZipArchive;
use zip::result::ZipError;

const LOG_TARGET: &str = "wheelwright::reader";

/// Size information for one container entry, without reading its data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryInfo {
    /// Archive path.
    pub path: String,
    /// Uncompressed size in bytes.
    pub size: u64,
    /// Stored size in bytes.
    pub compressed_size: u64,
    /// Stored Unix mode, when present.
    pub unix_mode: Option<u32>,
}

/// Reads and verifies a wheel archive from any seekable source.
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
/// use wheelwright_archive::reader::WheelReader;
///
/// let mut reader = WheelReader::open(Path::new("dist/pkg-1.0-py3-none-any.whl"))
///     .expect("wheel opens");
/// reader.verify_all().expect("wheel is intact");
/// let metadata = reader.read_metadata_file("METADATA").expect("METADATA present");
/// assert!(!metadata.is_empty());
/// ```
pub struct WheelReader<R: Read + Seek> {
    archive: ZipArchive<R>,
    identity: Option<DistributionIdentity>,
    dist_info_dir: String,
    data_dir: String,
    record: Record,
}

impl WheelReader<BufReader<File>> {
    /// Open the wheel at `path`, taking its identity from the file name.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::BadFilename`] for a malformed file name,
    /// [`ArchiveError::MissingRecord`] if RECORD is absent, RECORD parse
    /// errors, and container or I/O errors.
    pub fn open(path: &Path) -> Result<Self> {
        let identity = DistributionIdentity::parse(&path.to_string_lossy())?;
        let file = File::open(path)?;
        debug!(target: LOG_TARGET, "opening {}", path.display());
        Self::from_reader(BufReader::new(file), Some(identity))
    }
}

impl<R: Read + Seek> WheelReader<R> {
    /// Read a wheel from `source`.
    ///
    /// With no `identity`, the `.dist-info` directory is discovered by
    /// scanning entry names from the end of the container.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::MissingMetadataDirectory`] if discovery
    /// finds nothing, [`ArchiveError::MissingRecord`] if RECORD is absent,
    /// RECORD parse errors, and container or I/O errors.
    pub fn from_reader(source: R, identity: Option<DistributionIdentity>) -> Result<Self> {
        let archive = ZipArchive::new(source)?;
        let (dist_info_dir, data_dir) = match &identity {
            Some(identity) => (identity.dist_info_dir(), identity.data_dir()),
            None => discover_directories(&archive)?,
        };
        debug!(target: LOG_TARGET, "metadata directory is {dist_info_dir}");

        let mut reader = Self {
            archive,
            identity,
            dist_info_dir,
            data_dir,
            record: Record::default(),
        };
        let record_path = reader.record_path();
        let text = match reader.read_file(&record_path) {
            Ok(bytes) => String::from_utf8(bytes)
                .map_err(|err| ArchiveError::from(io::Error::new(io::ErrorKind::InvalidData, err)))?,
            Err(ArchiveError::FileNotFound { .. }) => {
                return Err(ArchiveError::MissingRecord { path: record_path });
            }
            Err(err) => return Err(err),
        };
        reader.record = parse_record(&text)?;
        debug!(
            target: LOG_TARGET,
            "loaded {} RECORD rows from {record_path}",
            reader.record.len()
        );
        Ok(reader)
    }

    /// Read a file from the `.dist-info` directory, verifying it.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::FileNotFound`] if absent and verification
    /// errors if the content does not match RECORD.
    pub fn read_metadata_file(&mut self, name: &str) -> Result<Vec<u8>> {
        let path = format!("{}/{}", self.dist_info_dir, name.trim_matches('/'));
        self.read_file(&path)
    }

    /// Read a file from the `.data` directory, verifying it.
    ///
    /// # Errors
    ///
    /// As for [`Self::read_metadata_file`].
    pub fn read_data_file(&mut self, name: &str) -> Result<Vec<u8>> {
        let path = format!("{}/{}", self.data_dir, name.trim_matches('/'));
        self.read_file(&path)
    }

    /// Read any entry by archive path, verifying it.
    ///
    /// # Errors
    ///
    /// As for [`Self::read_metadata_file`].
    pub fn read_file(&mut self, path: &str) -> Result<Vec<u8>> {
        let mut stream = self.open_file(path)?;
        let mut data = Vec::new();
        stream.read_to_end(&mut data)?;
        Ok(data)
    }

    /// Open an entry as a verifying stream.
    ///
    /// Verification happens when the stream reports end of file.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::FileNotFound`] if the entry is absent.
    pub fn open_file(&mut self, path: &str) -> Result<VerifyingReader<Box<dyn Read + '_>>> {
        let expectation = Expectation::lookup(&self.record, &self.dist_info_dir, path);
        let file = self.archive.by_name(path).map_err(|err| match err {
            ZipError::FileNotFound => ArchiveError::FileNotFound {
                path: path.to_owned(),
            },
            other => ArchiveError::Zip(other),
        })?;
        let stream: Box<dyn Read + '_> = Box::new(file);
        Ok(VerifyingReader::new(stream, path, expectation))
    }

    /// Iterate RECORD rows with a verifying stream for each.
    ///
    /// Each call starts a fresh pass with fresh streams.
    pub fn contents(&mut self) -> Contents<'_, R> {
        Contents {
            reader: self,
            position: 0,
        }
    }

    /// Read every entry to the end, returning the first verification error.
    ///
    /// Directories and control files are skipped. An entry without a
    /// usable RECORD row fails with [`ArchiveError::MissingHash`] before any
    /// of its bytes are read.
    ///
    /// # Errors
    ///
    /// Returns the first verification, container, or I/O error.
    pub fn verify_all(&mut self) -> Result<()> {
        for index in 0..self.archive.len() {
            let file = self.archive.by_index(index)?;
            if file.is_dir() {
                continue;
            }
            let name = file.name().to_owned();
            let expectation = Expectation::lookup(&self.record, &self.dist_info_dir, &name);
            match expectation {
                Expectation::Exempt => continue,
                Expectation::Unrecorded => return Err(ArchiveError::MissingHash { path: name }),
                Expectation::Digest { .. } => {}
            }
            let mut stream = VerifyingReader::new(file, name, expectation);
            io::copy(&mut stream, &mut io::sink())?;
        }
        debug!(target: LOG_TARGET, "verified {} entries", self.archive.len());
        Ok(())
    }

    /// Extract every container entry under `dest_dir`.
    ///
    /// Entries with a RECORD digest are verified as they are written; other
    /// entries are copied as-is. Executable bits are restored where the
    /// platform models them. The first error stops extraction and files
    /// already written are left in place.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::NotADirectory`] if `dest_dir` is missing,
    /// [`ArchiveError::PathTraversal`] for unsafe entry names, and
    /// verification, container, or I/O errors.
    pub fn extract_to(&mut self, dest_dir: &Path) -> Result<()> {
        ensure_directory(dest_dir)?;
        for index in 0..self.archive.len() {
            let mut file = self.archive.by_index(index)?;
            let name = file.name().to_owned();
            let target = target_path(dest_dir, &name)?;
            if file.is_dir() {
                fs::create_dir_all(&target)?;
                continue;
            }
            let mode = file.unix_mode();
            let expectation = Expectation::lookup(&self.record, &self.dist_info_dir, &name);
            if matches!(expectation, Expectation::Digest { .. }) {
                write_file(&target, &mut VerifyingReader::new(file, name.as_str(), expectation))?;
            } else {
                write_file(&target, &mut file)?;
            }
            restore_executable_bits(&target, mode)?;
            trace!(target: LOG_TARGET, "extracted {name}");
        }
        Ok(())
    }

    /// Parse the WHEEL descriptor.
    ///
    /// # Errors
    ///
    /// Returns read errors and [`ArchiveError::InvalidDescriptor`].
    pub fn descriptor(&mut self) -> Result<WheelDescriptor> {
        let text = self.read_metadata_text(WHEEL_FILENAME)?;
        WheelDescriptor::parse(&text)
    }

    /// Parse the METADATA headers and body.
    ///
    /// # Errors
    ///
    /// Returns read errors and [`ArchiveError::InvalidDescriptor`] for
    /// non-UTF-8 content.
    pub fn metadata(&mut self) -> Result<HeaderMessage> {
        let text = self.read_metadata_text(METADATA_FILENAME)?;
        Ok(HeaderMessage::parse(&text))
    }

    /// Size information for every container entry, in container order.
    ///
    /// # Errors
    ///
    /// Returns container errors.
    pub fn entries(&mut self) -> Result<Vec<EntryInfo>> {
        let mut entries = Vec::with_capacity(self.archive.len());
        for index in 0..self.archive.len() {
            let file = self.archive.by_index_raw(index)?;
            entries.push(EntryInfo {
                path: file.name().to_owned(),
                size: file.size(),
                compressed_size: file.compressed_size(),
                unix_mode: file.unix_mode(),
            });
        }
        Ok(entries)
    }

    /// Return the identity, when the reader was given one.
    #[must_use]
    pub fn identity(&self) -> Option<&DistributionIdentity> {
        self.identity.as_ref()
    }

    /// Return the `.dist-info` directory name.
    #[must_use]
    pub fn dist_info_dir(&self) -> &str {
        &self.dist_info_dir
    }

    /// Return the `.data` directory name.
    #[must_use]
    pub fn data_dir(&self) -> &str {
        &self.data_dir
    }

    /// Return the archive path of RECORD.
    #[must_use]
    pub fn record_path(&self) -> String {
        format!("{}/{RECORD_FILENAME}", self.dist_info_dir)
    }

    /// Return the parsed RECORD.
    #[must_use]
    pub fn record(&self) -> &Record {
        &self.record
    }

    /// Every entry name in container order.
    #[must_use]
    pub fn filenames(&self) -> Vec<&str> {
        self.archive.file_names().collect()
    }

    /// Entry names inside the `.dist-info` directory.
    #[must_use]
    pub fn dist_info_filenames(&self) -> Vec<&str> {
        let prefix = format!("{}/", self.dist_info_dir);
        self.archive
            .file_names()
            .filter(|name| name.starts_with(&prefix))
            .collect()
    }

    fn read_metadata_text(&mut self, name: &str) -> Result<String> {
        let bytes = self.read_metadata_file(name)?;
        String::from_utf8(bytes).map_err(|err| ArchiveError::InvalidDescriptor {
            name: name.to_owned(),
            reason: err.to_string(),
        })
    }
}

/// A lending pass over RECORD rows; see [`WheelReader::contents`].
pub struct Contents<'r, R: Read + Seek> {
    reader: &'r mut WheelReader<R>,
    position: usize,
}

impl<R: Read + Seek> Contents<'_, R> {
    /// Open the next row's entry.
    ///
    /// Returns `None` after the last row. A row whose entry is missing from
    /// the container yields [`ArchiveError::FileNotFound`].
    pub fn next_entry(&mut self) -> Option<Result<ContentEntry<'_>>> {
        let row = self.reader.record.iter().nth(self.position)?;
        self.position += 1;
        let path = row.path().to_owned();
        let hash = row.hash().cloned();
        let size = row.size();
        Some(
            self.reader
                .open_file(&path)
                .map(|stream| ContentEntry { hash, size, stream }),
        )
    }

    /// Number of rows not yet visited.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.reader.record.len().saturating_sub(self.position)
    }
}

/// One RECORD row paired with a verifying stream over its entry.
pub struct ContentEntry<'a> {
    hash: Option<FileHash>,
    size: Option<u64>,
    stream: VerifyingReader<Box<dyn Read + 'a>>,
}

impl ContentEntry<'_> {
    /// Archive path.
    #[must_use]
    pub fn path(&self) -> &str {
        self.stream.path()
    }

    /// Recorded hash; `None` for RECORD itself.
    #[must_use]
    pub fn hash(&self) -> Option<&FileHash> {
        self.hash.as_ref()
    }

    /// Recorded size; `None` for RECORD itself.
    #[must_use]
    pub fn size(&self) -> Option<u64> {
        self.size
    }
}

impl Read for ContentEntry<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.stream.read(buf)
    }
}

/// Find the last top-level `<name>-<version>.dist-info` directory.
fn discover_directories<R: Read + Seek>(archive: &ZipArchive<R>) -> Result<(String, String)> {
    let names: Vec<&str> = archive.file_names().collect();
    for name in names.into_iter().rev() {
        let Some((top, _)) = name.split_once('/') else {
            continue;
        };
        if let Some((dist_name, version)) = split_dist_info_dir(top) {
            trace!(target: LOG_TARGET, "discovered {top} via {name}");
            return Ok((top.to_owned(), format!("{dist_name}-{version}.data")));
        }
    }
    Err(ArchiveError::MissingMetadataDirectory)
}

#[cfg(test)]
#[path = "reader_tests.rs"]
mod tests;
