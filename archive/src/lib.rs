//! Reading and writing wheel distribution archives.
//!
//! A wheel is a ZIP container holding application files plus a
//! `<name>-<version>.dist-info` directory. That directory carries the WHEEL
//! descriptor, the METADATA file, and RECORD: a CSV manifest with the
//! digest and size of every other entry. This crate writes archives while
//! hashing each entry as it streams, and reads them back with every entry
//! checked against RECORD.
//!
//! # Modules
//!
//! - [`naming`]: wheel file names, compatibility tags, and build tags.
//! - [`hashing`]: digest algorithms and the RECORD digest encoding.
//! - [`record`] and [`record_codec`]: the manifest model and its CSV form.
//! - [`descriptor`]: WHEEL and METADATA header files.
//! - [`writer`]: [`writer::WheelWriter`] and the scoped [`writer::write_wheel`].
//! - [`reader`]: [`reader::WheelReader`] with streaming verification.
//! - [`verification`]: the verifying stream used by the reader.
//! - [`extraction`]: safe placement of entries on disk.
//! - [`repack`]: packing an unpacked tree and unpacking a wheel.
//! - [`options`] and [`timestamp`]: writer configuration.
//! - [`error`]: the [`ArchiveError`] type.
//!
//! # Examples
//!
//! ```
//! use std::io::{Cursor, Read};
//! use wheelwright_archive::naming::DistributionIdentity;
//! use wheelwright_archive::options::WriterOptions;
//! use wheelwright_archive::reader::WheelReader;
//! use wheelwright_archive::writer::WheelWriter;
//!
//! let identity = DistributionIdentity::new("pkg", "1.0");
//! let mut writer = WheelWriter::new(Cursor::new(Vec::new()), identity, WriterOptions::default());
//! writer.write_entry("pkg/__init__.py", b"VALUE = 1\n", None).expect("entry written");
//! let bytes = writer.into_inner().expect("finished").into_inner();
//!
//! let mut reader = WheelReader::from_reader(Cursor::new(bytes), None).expect("opened");
//! reader.verify_all().expect("intact");
//! assert_eq!(reader.read_file("pkg/__init__.py").expect("read"), b"VALUE = 1\n");
//! ```

pub mod descriptor;
pub mod error;
pub mod extraction;
pub mod hashing;
pub mod naming;
pub mod options;
pub mod reader;
pub mod record;
pub mod record_codec;
pub mod repack;
pub mod timestamp;
pub mod verification;
pub mod writer;

pub use error::{ArchiveError, Result};
