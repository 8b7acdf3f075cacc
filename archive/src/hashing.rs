//! Digest algorithms, RECORD hash encoding, and the write-side hashing sink.
//!
//! Only strong algorithms from the SHA-2 family are accepted. `md5` and
//! `sha1` are recognised so that they can be rejected as weak rather than
//! reported as unknown.

use super::error::{ArchiveError, Result};
use base64::Engine as _;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use sha2::{Digest, Sha224, Sha256, Sha384, Sha512, Sha512_224, Sha512_256};
use std::fmt;
use std::io::{self, Write};
use std::str::FromStr;

/// URL-safe base64 without padding; decoding accepts padded input too.
const RECORD_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Algorithms that are known but too weak to protect a RECORD.
const WEAK_ALGORITHMS: [&str; 2] = ["md5", "sha1"];

/// A hash algorithm permitted in RECORD rows.
///
/// # Examples
///
/// ```
/// use wheelwright_archive::hashing::HashAlgorithm;
///
/// let algorithm: HashAlgorithm = "sha256".parse().expect("allowed");
/// assert_eq!(algorithm.name(), "sha256");
/// assert!("md5".parse::<HashAlgorithm>().is_err());
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum HashAlgorithm {
    /// SHA-224.
    Sha224,
    /// SHA-256, the default.
    #[default]
    Sha256,
    /// SHA-384.
    Sha384,
    /// SHA-512.
    Sha512,
    /// SHA-512/224.
    Sha512_224,
    /// SHA-512/256.
    Sha512_256,
}

impl HashAlgorithm {
    /// The name used in RECORD rows.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Sha224 => "sha224",
            Self::Sha256 => "sha256",
            Self::Sha384 => "sha384",
            Self::Sha512 => "sha512",
            Self::Sha512_224 => "sha512_224",
            Self::Sha512_256 => "sha512_256",
        }
    }

    /// Start a running digest with this algorithm.
    #[must_use]
    pub fn hasher(self) -> Hasher {
        match self {
            Self::Sha224 => Hasher::Sha224(Sha224::new()),
            Self::Sha256 => Hasher::Sha256(Sha256::new()),
            Self::Sha384 => Hasher::Sha384(Sha384::new()),
            Self::Sha512 => Hasher::Sha512(Sha512::new()),
            Self::Sha512_224 => Hasher::Sha512_224(Sha512_224::new()),
            Self::Sha512_256 => Hasher::Sha512_256(Sha512_256::new()),
        }
    }

    /// Digest a complete buffer in one call.
    #[must_use]
    pub fn digest(self, data: &[u8]) -> Vec<u8> {
        let mut hasher = self.hasher();
        hasher.update(data);
        hasher.finalize()
    }
}

impl FromStr for HashAlgorithm {
    type Err = ArchiveError;

    /// Names are matched case-insensitively; `-` and `_` are equivalent.
    fn from_str(value: &str) -> Result<Self> {
        let normalised = value.to_ascii_lowercase().replace('-', "_");
        if WEAK_ALGORITHMS.contains(&normalised.as_str()) {
            return Err(ArchiveError::WeakHashAlgorithm {
                algorithm: value.to_owned(),
            });
        }
        match normalised.as_str() {
            "sha224" => Ok(Self::Sha224),
            "sha256" => Ok(Self::Sha256),
            "sha384" => Ok(Self::Sha384),
            "sha512" => Ok(Self::Sha512),
            "sha512_224" => Ok(Self::Sha512_224),
            "sha512_256" => Ok(Self::Sha512_256),
            _ => Err(ArchiveError::UnsupportedHashAlgorithm {
                algorithm: value.to_owned(),
            }),
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A running digest for one of the allowed algorithms.
#[derive(Debug, Clone)]
pub enum Hasher {
    /// SHA-224 state.
    Sha224(Sha224),
    /// SHA-256 state.
    Sha256(Sha256),
    /// SHA-384 state.
    Sha384(Sha384),
    /// SHA-512 state.
    Sha512(Sha512),
    /// SHA-512/224 state.
    Sha512_224(Sha512_224),
    /// SHA-512/256 state.
    Sha512_256(Sha512_256),
}

impl Hasher {
    /// Feed a chunk into the digest.
    pub fn update(&mut self, data: &[u8]) {
        match self {
            Self::Sha224(h) => h.update(data),
            Self::Sha256(h) => h.update(data),
            Self::Sha384(h) => h.update(data),
            Self::Sha512(h) => h.update(data),
            Self::Sha512_224(h) => h.update(data),
            Self::Sha512_256(h) => h.update(data),
        }
    }

    /// Consume the state and return the raw digest bytes.
    #[must_use]
    pub fn finalize(self) -> Vec<u8> {
        match self {
            Self::Sha224(h) => h.finalize().to_vec(),
            Self::Sha256(h) => h.finalize().to_vec(),
            Self::Sha384(h) => h.finalize().to_vec(),
            Self::Sha512(h) => h.finalize().to_vec(),
            Self::Sha512_224(h) => h.finalize().to_vec(),
            Self::Sha512_256(h) => h.finalize().to_vec(),
        }
    }
}

/// An algorithm paired with raw digest bytes, as stored in a RECORD row.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileHash {
    algorithm: HashAlgorithm,
    digest: Vec<u8>,
}

impl FileHash {
    /// Pair an algorithm with a digest.
    #[must_use]
    pub fn new(algorithm: HashAlgorithm, digest: Vec<u8>) -> Self {
        Self { algorithm, digest }
    }

    /// Return the algorithm.
    #[must_use]
    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    /// Return the raw digest bytes.
    #[must_use]
    pub fn digest(&self) -> &[u8] {
        &self.digest
    }

    /// Parse the `algorithm=digest` RECORD field.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::WeakHashAlgorithm`] or
    /// [`ArchiveError::UnsupportedHashAlgorithm`] for rejected algorithms
    /// and [`ArchiveError::InvalidRecord`] (row 0) for a missing `=` or an
    /// undecodable digest.
    pub fn parse_field(field: &str) -> Result<Self> {
        let (algorithm, encoded) =
            field
                .split_once('=')
                .ok_or_else(|| ArchiveError::InvalidRecord {
                    row: 0,
                    reason: format!("hash field \"{field}\" lacks '='"),
                })?;
        let algorithm = algorithm.parse::<HashAlgorithm>()?;
        Ok(Self::new(algorithm, decode_digest(encoded)?))
    }
}

/// The `algorithm=digest` RECORD field.
impl fmt::Display for FileHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.algorithm, encode_digest(&self.digest))
    }
}

/// Encode a raw digest as unpadded URL-safe base64.
///
/// # Examples
///
/// ```
/// use wheelwright_archive::hashing::encode_digest;
///
/// assert_eq!(encode_digest(&[0xfb, 0xff]), "-_8");
/// ```
#[must_use]
pub fn encode_digest(digest: &[u8]) -> String {
    RECORD_BASE64.encode(digest)
}

/// Decode a URL-safe base64 digest, with or without padding.
///
/// # Errors
///
/// Returns [`ArchiveError::InvalidRecord`] (row 0) if the value is not
/// valid base64.
pub fn decode_digest(encoded: &str) -> Result<Vec<u8>> {
    RECORD_BASE64
        .decode(encoded)
        .map_err(|err| ArchiveError::InvalidRecord {
            row: 0,
            reason: format!("undecodable digest \"{encoded}\": {err}"),
        })
}

/// A [`Write`] adapter that digests and counts everything written through it.
///
/// The ZIP entry sink stays opaque; this wrapper only observes the bytes.
#[derive(Debug)]
pub struct HashingWriter<W> {
    inner: W,
    algorithm: HashAlgorithm,
    hasher: Hasher,
    written: u64,
}

impl<W: Write> HashingWriter<W> {
    /// Wrap `inner`, digesting with `algorithm`.
    pub fn new(inner: W, algorithm: HashAlgorithm) -> Self {
        Self {
            inner,
            algorithm,
            hasher: algorithm.hasher(),
            written: 0,
        }
    }

    /// Finish digesting and return the hash and byte count.
    pub fn finish(self) -> (FileHash, u64) {
        (
            FileHash::new(self.algorithm, self.hasher.finalize()),
            self.written,
        )
    }
}

impl<W: Write> Write for HashingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let written = self.inner.write(buf)?;
        self.hasher.update(&buf[..written]);
        self.written += written as u64;
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
