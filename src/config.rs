//! Command-line configuration loaded from `wheelwright.toml`.
//!
//! Settings cover how new wheels are written. The file is optional: when
//! `--config` is not given, `wheelwright.toml` in the working directory is
//! used if present, otherwise every setting keeps its default.
//! `SOURCE_DATE_EPOCH` is read here and nowhere else, then passed to the
//! archive writer as an explicit option.

use crate::error::{CliError, Result};
use camino::Utf8Path;
use log::debug;
use serde::Deserialize;
use std::fs;
use wheelwright_archive::hashing::HashAlgorithm;
use wheelwright_archive::options::{Compression, DEFAULT_GENERATOR, WriterOptions};

/// Name of the configuration file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "wheelwright.toml";

/// Environment variable holding the reproducible-build timestamp.
pub const SOURCE_DATE_EPOCH: &str = "SOURCE_DATE_EPOCH";

const LOG_TARGET: &str = "wheelwright::config";

/// Settings for writing wheels.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Value of the WHEEL `Generator` header.
    pub generator: String,
    /// Value of the WHEEL `Root-Is-Purelib` header.
    pub root_is_purelib: bool,
    /// Deflate entries; `false` stores them uncompressed.
    pub compress: bool,
    /// RECORD digest algorithm name, such as `sha256`.
    pub hash_algorithm: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            generator: DEFAULT_GENERATOR.to_owned(),
            root_is_purelib: true,
            compress: true,
            hash_algorithm: HashAlgorithm::default().name().to_owned(),
        }
    }
}

impl Settings {
    /// Load settings from `path`, or from [`DEFAULT_CONFIG_FILE`] if it
    /// exists in the working directory.
    ///
    /// # Errors
    ///
    /// Returns [`CliError::ConfigRead`] if an explicit file cannot be read
    /// and [`CliError::ConfigParse`] for invalid TOML or unknown keys.
    pub fn load(path: Option<&Utf8Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path,
            None if Utf8Path::new(DEFAULT_CONFIG_FILE).is_file() => {
                Utf8Path::new(DEFAULT_CONFIG_FILE)
            }
            None => return Ok(Self::default()),
        };
        let text = fs::read_to_string(path).map_err(|source| CliError::ConfigRead {
            path: path.to_owned(),
            source,
        })?;
        debug!(target: LOG_TARGET, "loaded settings from {path}");
        Self::from_toml(&text).map_err(|source| CliError::ConfigParse {
            path: path.to_owned(),
            source,
        })
    }

    /// Parse settings from TOML text.
    ///
    /// # Errors
    ///
    /// Returns the TOML deserialisation error.
    ///
    /// # Examples
    ///
    /// ```
    /// use wheelwright::config::Settings;
    ///
    /// let settings = Settings::from_toml("compress = false\n").expect("valid TOML");
    /// assert!(!settings.compress);
    /// assert_eq!(settings.hash_algorithm, "sha256");
    /// ```
    pub fn from_toml(text: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Build writer options, reading `SOURCE_DATE_EPOCH` from the process
    /// environment.
    ///
    /// # Errors
    ///
    /// As for [`Self::writer_options_with_epoch`].
    pub fn writer_options(&self) -> Result<WriterOptions> {
        let epoch = std::env::var(SOURCE_DATE_EPOCH).ok();
        self.writer_options_with_epoch(epoch.as_deref())
    }

    /// Build writer options with an explicit `SOURCE_DATE_EPOCH` value.
    ///
    /// Blank epoch values are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`CliError::InvalidHashAlgorithm`] for an unknown or weak
    /// algorithm and [`CliError::InvalidSourceDateEpoch`] when the epoch is
    /// not an integer.
    pub fn writer_options_with_epoch(&self, epoch: Option<&str>) -> Result<WriterOptions> {
        let hash_algorithm: HashAlgorithm =
            self.hash_algorithm
                .parse()
                .map_err(|source| CliError::InvalidHashAlgorithm {
                    name: self.hash_algorithm.clone(),
                    source,
                })?;
        let source_date_epoch = epoch
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(|value| {
                value
                    .parse::<i64>()
                    .map_err(|_| CliError::InvalidSourceDateEpoch {
                        value: value.to_owned(),
                    })
            })
            .transpose()?;
        let compression = if self.compress {
            Compression::Deflated
        } else {
            Compression::Stored
        };
        Ok(WriterOptions::default()
            .with_generator(self.generator.as_str())
            .with_root_is_purelib(self.root_is_purelib)
            .with_compression(compression)
            .with_hash_algorithm(hash_algorithm)
            .with_source_date_epoch(source_date_epoch))
    }
}
