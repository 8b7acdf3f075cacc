//! Wheel archive creation with RECORD emission.
//!
//! [`WheelWriter`] streams each entry into the ZIP container through a
//! [`HashingWriter`], collecting one RECORD row per entry. [`WheelWriter::finish`]
//! synthesises default WHEEL and METADATA files when neither was written,
//! then writes RECORD last.
//! A writer that is dropped without finishing is aborted: the container is
//! abandoned and, when the writer created the file itself, the partial file
//! is deleted.

use super::descriptor::{METADATA_FILENAME, WHEEL_FILENAME, WheelDescriptor, render_metadata};
use super::error::{ArchiveError, Result};
use super::hashing::{FileHash, HashAlgorithm, HashingWriter};
use super::naming::DistributionIdentity;
use super::options::WriterOptions;
use super::record::{RECORD_FILENAME, Record, RecordEntry, is_control_file};
use super::record_codec::serialize_record;
use super::timestamp::EntryTimestamp;
use log::{debug, trace, warn};
use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Seek, Write};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

const LOG_TARGET: &str = "wheelwright::writer";

/// Permission bits for entries that do not come from a file on disk.
pub const DEFAULT_ENTRY_MODE: u32 = 0o664;

/// The content of one archive entry.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use wheelwright_archive::writer::Content;
///
/// let bytes = Content::from(b"print('hi')\n");
/// let file = Content::from(Path::new("setup.cfg"));
/// assert!(matches!(bytes, Content::Bytes(_)));
/// assert!(matches!(file, Content::Path(_)));
/// ```
pub enum Content<'a> {
    /// Bytes held in memory.
    Bytes(&'a [u8]),
    /// A file on disk; its permission bits are carried into the archive.
    Path(&'a Path),
    /// Any readable source, consumed to the end.
    Stream(&'a mut dyn Read),
}

impl<'a> From<&'a [u8]> for Content<'a> {
    fn from(bytes: &'a [u8]) -> Self {
        Self::Bytes(bytes)
    }
}

impl<'a, const N: usize> From<&'a [u8; N]> for Content<'a> {
    fn from(bytes: &'a [u8; N]) -> Self {
        Self::Bytes(bytes)
    }
}

impl<'a> From<&'a str> for Content<'a> {
    fn from(text: &'a str) -> Self {
        Self::Bytes(text.as_bytes())
    }
}

impl<'a> From<&'a Path> for Content<'a> {
    fn from(path: &'a Path) -> Self {
        Self::Path(path)
    }
}

impl<'a> From<&'a mut dyn Read> for Content<'a> {
    fn from(reader: &'a mut dyn Read) -> Self {
        Self::Stream(reader)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriterState {
    Writing,
    Closed,
    Aborted,
}

/// Writes a wheel archive into any seekable sink.
///
/// # Examples
///
/// ```
/// use std::io::Cursor;
/// use wheelwright_archive::naming::DistributionIdentity;
/// use wheelwright_archive::options::WriterOptions;
/// use wheelwright_archive::writer::WheelWriter;
///
/// let identity = DistributionIdentity::new("pkg", "1.0");
/// let mut writer = WheelWriter::new(Cursor::new(Vec::new()), identity, WriterOptions::default());
/// writer.write_entry("pkg/__init__.py", b"", None).expect("entry written");
/// let bytes = writer.into_inner().expect("finished").into_inner();
/// assert!(!bytes.is_empty());
/// ```
pub struct WheelWriter<W: Write + Seek> {
    zip: Option<ZipWriter<W>>,
    sink: Option<W>,
    state: WriterState,
    owned_path: Option<PathBuf>,
    identity: DistributionIdentity,
    options: WriterOptions,
    record: Record,
    dist_info_dir: String,
    data_dir: String,
    record_path: String,
}

impl WheelWriter<BufWriter<File>> {
    /// Create the wheel file at `path`.
    ///
    /// When `identity` is `None` it is parsed from the file name. The file
    /// is owned by the writer and deleted if the writer is aborted.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::BadFilename`] if no identity is given and the
    /// file name is not a valid wheel name, or [`ArchiveError::Io`] if the
    /// file cannot be created.
    pub fn create(
        path: &Path,
        identity: Option<DistributionIdentity>,
        options: WriterOptions,
    ) -> Result<Self> {
        let identity = match identity {
            Some(identity) => identity,
            None => DistributionIdentity::parse(&path.to_string_lossy())?,
        };
        let file = File::create(path)?;
        let mut writer = Self::new(BufWriter::new(file), identity, options);
        writer.owned_path = Some(path.to_path_buf());
        debug!(target: LOG_TARGET, "creating {}", path.display());
        Ok(writer)
    }
}

impl<W: Write + Seek> WheelWriter<W> {
    /// Start a wheel in `sink`, which the writer never deletes.
    #[must_use]
    pub fn new(sink: W, identity: DistributionIdentity, options: WriterOptions) -> Self {
        let dist_info_dir = identity.dist_info_dir();
        let record_path = format!("{dist_info_dir}/{RECORD_FILENAME}");
        Self {
            zip: Some(ZipWriter::new(sink)),
            sink: None,
            state: WriterState::Writing,
            owned_path: None,
            data_dir: identity.data_dir(),
            identity,
            options,
            record: Record::default(),
            dist_info_dir,
            record_path,
        }
    }

    /// Write one entry, hashing it as it streams into the container.
    ///
    /// Backslashes are normalised to `/` and leading slashes dropped. The
    /// stored timestamp follows [`WriterOptions::entry_timestamp`].
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::WriteAfterClose`] once finished or aborted,
    /// [`ArchiveError::InvalidEntryPath`] for empty paths, paths with `..`
    /// components, or the RECORD path itself, and container or I/O errors
    /// from reading the content or streaming it. Any such failure aborts
    /// the writer.
    pub fn write_entry<'c>(
        &mut self,
        path: &str,
        content: impl Into<Content<'c>>,
        timestamp: Option<EntryTimestamp>,
    ) -> Result<()> {
        self.ensure_writing()?;
        let name = normalize_entry_path(path)?;
        if name == self.record_path {
            return Err(ArchiveError::InvalidEntryPath {
                path: name,
                reason: "RECORD is written when the archive is finished".to_owned(),
            });
        }
        self.put_entry(name, content.into(), timestamp)
    }

    /// Write METADATA from ordered `(key, value)` fields.
    ///
    /// See [`render_metadata`] for the defaults applied.
    ///
    /// # Errors
    ///
    /// As for [`Self::write_entry`].
    pub fn write_metadata<I, K, V>(&mut self, fields: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let text = render_metadata(fields, &self.identity);
        self.write_metadata_file(METADATA_FILENAME, text.as_str())
    }

    /// Write WHEEL from the identity and options.
    ///
    /// # Errors
    ///
    /// As for [`Self::write_entry`].
    pub fn write_descriptor(&mut self) -> Result<()> {
        let descriptor = WheelDescriptor::for_identity(
            &self.identity,
            self.options.generator(),
            self.options.root_is_purelib(),
        );
        self.write_metadata_file(WHEEL_FILENAME, descriptor.render().as_str())
    }

    /// Write `name` inside the `.dist-info` directory.
    ///
    /// # Errors
    ///
    /// As for [`Self::write_entry`].
    pub fn write_metadata_file<'c>(
        &mut self,
        name: &str,
        content: impl Into<Content<'c>>,
    ) -> Result<()> {
        let path = format!("{}/{}", self.dist_info_dir, name.trim());
        self.write_entry(&path, content, None)
    }

    /// Write `name` inside the `.data` directory.
    ///
    /// # Errors
    ///
    /// As for [`Self::write_entry`].
    pub fn write_data_file<'c>(
        &mut self,
        name: &str,
        content: impl Into<Content<'c>>,
    ) -> Result<()> {
        let path = format!("{}/{}", self.data_dir, name.trim_matches('/'));
        self.write_entry(&path, content, None)
    }

    /// Write every regular file under `directory`, in file-name order.
    ///
    /// Directories are not entries. A file at the RECORD path is skipped.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::NotADirectory`] if `directory` is missing or
    /// is not a directory, [`ArchiveError::InvalidEntryPath`] for names that
    /// are not UTF-8, and errors from [`Self::write_entry`].
    pub fn write_from_directory(&mut self, directory: &Path) -> Result<()> {
        if !directory.is_dir() {
            return Err(ArchiveError::NotADirectory {
                path: directory.to_path_buf(),
            });
        }
        for entry in WalkDir::new(directory).sort_by_file_name() {
            let entry = entry.map_err(io::Error::from)?;
            if !entry.file_type().is_file() {
                continue;
            }
            let name = archive_name(directory, entry.path())?;
            if name == self.record_path {
                trace!(target: LOG_TARGET, "skipping existing {name}");
                continue;
            }
            self.write_entry(&name, entry.path(), None)?;
        }
        Ok(())
    }

    /// Finish the archive: synthesise default WHEEL and METADATA files when
    /// the caller wrote neither, then write RECORD and the ZIP central
    /// directory.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::WriteAfterClose`] if already finished or
    /// aborted. Any other failure aborts the writer before it is returned.
    pub fn finish(&mut self) -> Result<()> {
        self.ensure_writing()?;
        match self.finalize() {
            Ok(()) => {
                self.state = WriterState::Closed;
                debug!(
                    target: LOG_TARGET,
                    "finished {} with {} RECORD rows",
                    self.identity,
                    self.record.len() + 1
                );
                Ok(())
            }
            Err(err) => {
                self.discard();
                Err(err)
            }
        }
    }

    /// Finish if still writing and return the sink.
    ///
    /// # Errors
    ///
    /// Returns errors from [`Self::finish`], or
    /// [`ArchiveError::WriteAfterClose`] if the writer was aborted.
    pub fn into_inner(mut self) -> Result<W> {
        if self.state == WriterState::Writing {
            self.finish()?;
        }
        self.sink.take().ok_or(ArchiveError::WriteAfterClose)
    }

    /// Abandon the archive, deleting the file if this writer created it.
    pub fn abort(mut self) {
        self.discard();
    }

    /// Return the identity the archive is written for.
    #[must_use]
    pub fn identity(&self) -> &DistributionIdentity {
        &self.identity
    }

    /// Return the options in force.
    #[must_use]
    pub fn options(&self) -> &WriterOptions {
        &self.options
    }

    /// Return the RECORD rows collected so far.
    #[must_use]
    pub fn record(&self) -> &Record {
        &self.record
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
    pub fn record_path(&self) -> &str {
        &self.record_path
    }

    fn ensure_writing(&self) -> Result<()> {
        match self.state {
            WriterState::Writing => Ok(()),
            WriterState::Closed | WriterState::Aborted => Err(ArchiveError::WriteAfterClose),
        }
    }

    fn put_entry(
        &mut self,
        name: String,
        content: Content<'_>,
        timestamp: Option<EntryTimestamp>,
    ) -> Result<()> {
        let modified = self.options.entry_timestamp(timestamp).to_zip()?;
        let base = SimpleFileOptions::default()
            .compression_method(self.options.compression().method())
            .last_modified_time(modified);
        let algorithm = self.options.hash_algorithm();
        let zip = self.zip.as_mut().ok_or(ArchiveError::WriteAfterClose)?;

        let streamed = match content {
            Content::Bytes(mut bytes) => stream_entry(
                zip,
                &name,
                base.unix_permissions(DEFAULT_ENTRY_MODE),
                algorithm,
                &mut bytes,
            ),
            Content::Stream(reader) => stream_entry(
                zip,
                &name,
                base.unix_permissions(DEFAULT_ENTRY_MODE),
                algorithm,
                reader,
            ),
            Content::Path(source) => open_source(source).and_then(|(mut file, mode)| {
                stream_entry(zip, &name, base.unix_permissions(mode), algorithm, &mut file)
            }),
        };
        let (hash, size) = match streamed {
            Ok(streamed) => streamed,
            Err(err) => {
                self.discard();
                return Err(err);
            }
        };

        trace!(target: LOG_TARGET, "wrote {name} ({size} bytes)");
        if !is_control_file(&name, &self.dist_info_dir) {
            self.record.insert(RecordEntry::new(name, hash, size));
        }
        Ok(())
    }

    fn finalize(&mut self) -> Result<()> {
        let wheel_path = format!("{}/{WHEEL_FILENAME}", self.dist_info_dir);
        let metadata_path = format!("{}/{METADATA_FILENAME}", self.dist_info_dir);
        if !self.record.contains(&wheel_path) && !self.record.contains(&metadata_path) {
            self.write_descriptor()?;
            self.write_metadata(std::iter::empty::<(&str, &str)>())?;
        }

        let text = serialize_record(&self.record, &self.record_path)?;
        self.put_entry(self.record_path.clone(), Content::from(text.as_str()), None)?;

        let zip = self.zip.take().ok_or(ArchiveError::WriteAfterClose)?;
        let mut sink = zip.finish()?;
        sink.flush()?;
        self.sink = Some(sink);
        Ok(())
    }

    /// Drop the container and remove an owned partial file.
    fn discard(&mut self) {
        if self.state == WriterState::Aborted {
            return;
        }
        self.state = WriterState::Aborted;
        self.zip = None;
        self.sink = None;
        let Some(path) = self.owned_path.take() else {
            debug!(target: LOG_TARGET, "aborted {} (sink not owned)", self.identity);
            return;
        };
        match fs::remove_file(&path) {
            Ok(()) => debug!(target: LOG_TARGET, "aborted and removed {}", path.display()),
            Err(err) => warn!(
                target: LOG_TARGET,
                "failed to remove partial wheel {}: {err}",
                path.display()
            ),
        }
    }
}

impl<W: Write + Seek> Drop for WheelWriter<W> {
    fn drop(&mut self) {
        if self.state == WriterState::Writing {
            self.discard();
        }
    }
}

/// Create the wheel at `path`, run `build` against it, and finish.
///
/// If `build` fails the partial file is deleted and its error returned.
///
/// # Errors
///
/// Returns errors from [`WheelWriter::create`], `build`, or
/// [`WheelWriter::finish`].
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
/// use wheelwright_archive::options::WriterOptions;
/// use wheelwright_archive::writer::write_wheel;
///
/// write_wheel(
///     Path::new("dist/pkg-1.0-py3-none-any.whl"),
///     None,
///     WriterOptions::default(),
///     |writer| writer.write_entry("pkg/__init__.py", b"", None),
/// )
/// .expect("wheel written");
/// ```
pub fn write_wheel<T, F>(
    path: &Path,
    identity: Option<DistributionIdentity>,
    options: WriterOptions,
    build: F,
) -> Result<T>
where
    F: FnOnce(&mut WheelWriter<BufWriter<File>>) -> Result<T>,
{
    let mut writer = WheelWriter::create(path, identity, options)?;
    match build(&mut writer) {
        Ok(value) => {
            writer.finish()?;
            Ok(value)
        }
        Err(err) => {
            writer.abort();
            Err(err)
        }
    }
}

/// Normalise an entry path to forward slashes without a leading `/`.
fn normalize_entry_path(path: &str) -> Result<String> {
    let invalid = |reason: &str| ArchiveError::InvalidEntryPath {
        path: path.to_owned(),
        reason: reason.to_owned(),
    };
    let unified = path.replace('\\', "/");
    let mut parts = Vec::new();
    for part in unified.split('/') {
        match part {
            "" | "." => {}
            ".." => return Err(invalid("parent directory components are not allowed")),
            other => parts.push(other),
        }
    }
    if parts.is_empty() {
        return Err(invalid("path is empty"));
    }
    Ok(parts.join("/"))
}

/// The `/`-joined path of `file` relative to `root`.
fn archive_name(root: &Path, file: &Path) -> Result<String> {
    let invalid = |reason: &str| ArchiveError::InvalidEntryPath {
        path: file.display().to_string(),
        reason: reason.to_owned(),
    };
    let relative = file
        .strip_prefix(root)
        .map_err(|_| invalid("outside the source directory"))?;
    let mut parts = Vec::new();
    for component in relative.components() {
        let part = component
            .as_os_str()
            .to_str()
            .ok_or_else(|| invalid("not valid UTF-8"))?;
        parts.push(part);
    }
    Ok(parts.join("/"))
}

fn stream_entry<W: Write + Seek>(
    zip: &mut ZipWriter<W>,
    name: &str,
    options: SimpleFileOptions,
    algorithm: HashAlgorithm,
    source: &mut dyn Read,
) -> Result<(FileHash, u64)> {
    zip.start_file(name, options)?;
    let mut sink = HashingWriter::new(zip, algorithm);
    io::copy(source, &mut sink)?;
    Ok(sink.finish())
}

fn open_source(path: &Path) -> Result<(File, u32)> {
    let file = File::open(path)?;
    let mode = file_mode(&file.metadata()?);
    Ok((file, mode))
}

#[cfg(unix)]
fn file_mode(metadata: &fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o7777
}

#[cfg(not(unix))]
fn file_mode(metadata: &fs::Metadata) -> u32 {
    if metadata.permissions().readonly() {
        0o444
    } else {
        DEFAULT_ENTRY_MODE
    }
}

#[cfg(test)]
#[path = "writer_tests.rs"]
mod tests;
