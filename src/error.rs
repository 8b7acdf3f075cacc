//! Error types for the `wheelwright` command line.

use camino::Utf8PathBuf;
use std::io;
use thiserror::Error;
use wheelwright_archive::ArchiveError;

/// Errors reported by the command line.
#[derive(Debug, Error)]
pub enum CliError {
    /// An archive operation failed.
    #[error(transparent)]
    Archive(#[from] ArchiveError),

    /// The configuration file could not be read.
    #[error("cannot read configuration {path}: {source}")]
    ConfigRead {
        /// Configuration file path.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// The configuration file is not valid.
    #[error("invalid configuration {path}: {source}")]
    ConfigParse {
        /// Configuration file path.
        path: Utf8PathBuf,
        /// TOML deserialisation error.
        source: toml::de::Error,
    },

    /// The configured digest algorithm cannot be used for writing.
    #[error("hash_algorithm {name:?} cannot be used: {source}")]
    InvalidHashAlgorithm {
        /// Configured name.
        name: String,
        /// Why the algorithm was rejected.
        source: ArchiveError,
    },

    /// `SOURCE_DATE_EPOCH` is not an integer.
    #[error("SOURCE_DATE_EPOCH must be an integer number of seconds, got {value:?}")]
    InvalidSourceDateEpoch {
        /// Rejected value.
        value: String,
    },

    /// The wheel given to a command does not exist.
    #[error("wheel file not found: {path}")]
    WheelNotFound {
        /// Path given on the command line.
        path: Utf8PathBuf,
    },

    /// Writing command output failed.
    #[error("cannot write output: {0}")]
    Output(#[from] io::Error),

    /// JSON output could not be produced.
    #[error("cannot render JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience alias for command-line results.
pub type Result<T> = std::result::Result<T, CliError>;
