//! Writer configuration.
//!
//! Every reproducibility-affecting input is carried here explicitly. Nothing
//! in this crate reads the process environment; callers that honour
//! `SOURCE_DATE_EPOCH` read it once and pass it in through
//! [`WriterOptions::with_source_date_epoch`].

use super::hashing::HashAlgorithm;
use super::timestamp::EntryTimestamp;
use zip::CompressionMethod;

/// Generator string recorded in WHEEL when the caller supplies none.
pub const DEFAULT_GENERATOR: &str = concat!("wheelwright (", env!("CARGO_PKG_VERSION"), ")");

/// How entry bytes are stored in the container.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Compression {
    /// DEFLATE, the default.
    #[default]
    Deflated,
    /// No compression.
    Stored,
}

impl Compression {
    pub(crate) fn method(self) -> CompressionMethod {
        match self {
            Self::Deflated => CompressionMethod::Deflated,
            Self::Stored => CompressionMethod::Stored,
        }
    }
}

/// Options for [`crate::writer::WheelWriter`].
///
/// # Examples
///
/// ```
/// use wheelwright_archive::options::{Compression, WriterOptions};
///
/// let options = WriterOptions::default()
///     .with_compression(Compression::Stored)
///     .with_source_date_epoch(Some(1_700_000_000));
/// assert_eq!(options.entry_timestamp(None).as_unix(), 1_700_000_000);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriterOptions {
    generator: String,
    root_is_purelib: bool,
    compression: Compression,
    hash_algorithm: HashAlgorithm,
    source_date_epoch: Option<i64>,
}

impl Default for WriterOptions {
    fn default() -> Self {
        Self {
            generator: DEFAULT_GENERATOR.to_owned(),
            root_is_purelib: true,
            compression: Compression::default(),
            hash_algorithm: HashAlgorithm::default(),
            source_date_epoch: None,
        }
    }
}

impl WriterOptions {
    /// Set the WHEEL `Generator` value.
    #[must_use]
    pub fn with_generator(mut self, generator: impl Into<String>) -> Self {
        self.generator = generator.into();
        self
    }

    /// Set the WHEEL `Root-Is-Purelib` flag.
    #[must_use]
    pub fn with_root_is_purelib(mut self, root_is_purelib: bool) -> Self {
        self.root_is_purelib = root_is_purelib;
        self
    }

    /// Set the entry compression.
    #[must_use]
    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    /// Set the digest algorithm for new RECORD rows.
    #[must_use]
    pub fn with_hash_algorithm(mut self, hash_algorithm: HashAlgorithm) -> Self {
        self.hash_algorithm = hash_algorithm;
        self
    }

    /// Pin every entry timestamp to `seconds` since the Unix epoch.
    #[must_use]
    pub fn with_source_date_epoch(mut self, seconds: Option<i64>) -> Self {
        self.source_date_epoch = seconds;
        self
    }

    /// Return the generator string.
    #[must_use]
    pub fn generator(&self) -> &str {
        &self.generator
    }

    /// Return the `Root-Is-Purelib` flag.
    #[must_use]
    pub fn root_is_purelib(&self) -> bool {
        self.root_is_purelib
    }

    /// Return the compression.
    #[must_use]
    pub fn compression(&self) -> Compression {
        self.compression
    }

    /// Return the digest algorithm.
    #[must_use]
    pub fn hash_algorithm(&self) -> HashAlgorithm {
        self.hash_algorithm
    }

    /// Return the reproducibility override, if set.
    #[must_use]
    pub fn source_date_epoch(&self) -> Option<i64> {
        self.source_date_epoch
    }

    /// Resolve the stored timestamp for one entry.
    ///
    /// The override wins over `requested`, which wins over the ZIP epoch.
    #[must_use]
    pub fn entry_timestamp(&self, requested: Option<EntryTimestamp>) -> EntryTimestamp {
        self.source_date_epoch
            .map(EntryTimestamp::from_unix)
            .or(requested)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timestamp::MINIMUM_TIMESTAMP;
    use rstest::rstest;

    #[test]
    fn defaults_match_the_common_wheel() {
        let options = WriterOptions::default();
        assert!(options.generator().starts_with("wheelwright ("));
        assert!(options.root_is_purelib());
        assert_eq!(options.compression(), Compression::Deflated);
        assert_eq!(options.hash_algorithm(), HashAlgorithm::Sha256);
        assert_eq!(options.source_date_epoch(), None);
    }

    #[rstest]
    #[case::nothing(None, None, MINIMUM_TIMESTAMP)]
    #[case::requested(None, Some(400_000_000), 400_000_000)]
    #[case::override_wins(Some(500_000_000), Some(400_000_000), 500_000_000)]
    #[case::override_clamped(Some(0), None, MINIMUM_TIMESTAMP)]
    fn resolves_timestamp_precedence(
        #[case] epoch: Option<i64>,
        #[case] requested: Option<i64>,
        #[case] expected: i64,
    ) {
        let options = WriterOptions::default().with_source_date_epoch(epoch);
        let resolved = options.entry_timestamp(requested.map(EntryTimestamp::from_unix));
        assert_eq!(resolved.as_unix(), expected);
    }

    #[test]
    fn compression_maps_to_zip_method() {
        assert_eq!(Compression::Stored.method(), CompressionMethod::Stored);
        assert_eq!(Compression::Deflated.method(), CompressionMethod::Deflated);
    }
}
