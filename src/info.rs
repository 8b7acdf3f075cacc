//! Wheel summaries for the `info` command.
//!
//! [`WheelInfo::collect`] gathers the file name fields, the WHEEL and
//! METADATA headers, and entry sizes. [`format_human`] and [`format_json`]
//! render the result.

use serde::Serialize;
use std::io::{Read, Seek};
use wheelwright_archive::ArchiveError;
use wheelwright_archive::descriptor::{HeaderMessage, METADATA_FILENAME, WHEEL_FILENAME};
use wheelwright_archive::naming::DistributionIdentity;
use wheelwright_archive::reader::WheelReader;

const CLASSIFIER_PREVIEW: usize = 5;
const UNKNOWN: &str = "UNKNOWN";

/// One container entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileInfo {
    /// Archive path.
    pub path: String,
    /// Uncompressed size in bytes.
    pub size: u64,
}

/// Everything `info` reports about a wheel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WheelInfo {
    /// Distribution name from the file name.
    pub name: String,
    /// Version from the file name.
    pub version: String,
    /// Build tag from the file name, if any.
    pub build: Option<String>,
    /// WHEEL `Wheel-Version`.
    pub wheel_version: Option<String>,
    /// WHEEL `Root-Is-Purelib`, as written.
    pub root_is_purelib: Option<String>,
    /// Sorted `Tag` lines from WHEEL.
    pub tags: Vec<String>,
    /// WHEEL `Generator`.
    pub generator: Option<String>,
    /// METADATA `Summary`. This and the following METADATA fields are `None`
    /// when absent, empty, or `UNKNOWN`.
    pub summary: Option<String>,
    /// METADATA `Author`.
    pub author: Option<String>,
    /// METADATA `Author-email`.
    pub author_email: Option<String>,
    /// METADATA `Home-page`.
    pub home_page: Option<String>,
    /// METADATA `License`.
    pub license: Option<String>,
    /// Classifiers in METADATA order.
    pub classifiers: Vec<String>,
    /// Sorted `Requires-Dist` lines.
    pub requires_dist: Vec<String>,
    /// Every container entry in archive order.
    pub files: Vec<FileInfo>,
    /// Sum of the uncompressed entry sizes.
    pub total_size: u64,
    /// Descriptor files that were not found.
    pub warnings: Vec<String>,
}

impl WheelInfo {
    /// Collect information from an open wheel.
    ///
    /// A missing WHEEL or METADATA file becomes a warning rather than an
    /// error.
    ///
    /// # Errors
    ///
    /// Returns verification and container errors.
    pub fn collect<R: Read + Seek>(
        identity: &DistributionIdentity,
        reader: &mut WheelReader<R>,
    ) -> Result<Self, ArchiveError> {
        let mut info = Self {
            name: identity.name().to_owned(),
            version: identity.version().to_owned(),
            build: identity.build().map(ToString::to_string),
            ..Self::default()
        };

        if let Some(wheel) = read_headers(reader, WHEEL_FILENAME, &mut info.warnings)? {
            info.wheel_version = wheel.get("Wheel-Version").map(str::to_owned);
            info.root_is_purelib = wheel.get("Root-Is-Purelib").map(str::to_owned);
            info.generator = wheel.get("Generator").map(str::to_owned);
            info.tags = sorted(wheel.get_all("Tag"));
        }

        if let Some(metadata) = read_headers(reader, METADATA_FILENAME, &mut info.warnings)? {
            let known = |key: &str| {
                metadata
                    .get(key)
                    .filter(|value| !value.is_empty() && *value != UNKNOWN)
                    .map(str::to_owned)
            };
            info.summary = known("Summary");
            info.author = known("Author");
            info.author_email = known("Author-email");
            info.home_page = known("Home-page");
            info.license = known("License");
            info.classifiers = metadata.get_all("Classifier").map(str::to_owned).collect();
            info.requires_dist = sorted(metadata.get_all("Requires-Dist"));
        }

        info.files = reader
            .entries()?
            .into_iter()
            .map(|entry| FileInfo {
                path: entry.path,
                size: entry.size,
            })
            .collect();
        info.total_size = info.files.iter().map(|file| file.size).sum();
        Ok(info)
    }
}

fn read_headers<R: Read + Seek>(
    reader: &mut WheelReader<R>,
    name: &str,
    warnings: &mut Vec<String>,
) -> Result<Option<HeaderMessage>, ArchiveError> {
    match reader.read_metadata_file(name) {
        Ok(bytes) => Ok(Some(HeaderMessage::parse(&String::from_utf8_lossy(&bytes)))),
        Err(ArchiveError::FileNotFound { .. }) => {
            warnings.push(format!("{name} metadata file not found"));
            Ok(None)
        }
        Err(err) => Err(err),
    }
}

fn sorted<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut values: Vec<String> = values.map(str::to_owned).collect();
    values.sort();
    values
}

/// Render `info` as text.
///
/// With `verbose`, every file is listed with its size.
#[must_use]
pub fn format_human(info: &WheelInfo, verbose: bool) -> String {
    let mut output = format!("Name: {}\nVersion: {}\n", info.name, info.version);
    if let Some(build) = &info.build {
        output.push_str(&format!("Build: {build}\n"));
    }
    for warning in &info.warnings {
        output.push_str(&format!("Warning: {warning}\n"));
    }
    push_field(&mut output, "Wheel-Version", info.wheel_version.as_deref());
    push_field(&mut output, "Root-Is-Purelib", info.root_is_purelib.as_deref());
    push_list(&mut output, "Tags", &info.tags);
    push_field(&mut output, "Generator", info.generator.as_deref());
    push_field(&mut output, "Summary", info.summary.as_deref());
    push_field(&mut output, "Author", info.author.as_deref());
    push_field(&mut output, "Author-email", info.author_email.as_deref());
    push_field(&mut output, "Home-page", info.home_page.as_deref());
    push_field(&mut output, "License", info.license.as_deref());

    if !info.classifiers.is_empty() {
        let mut preview: Vec<&String> = info.classifiers.iter().take(CLASSIFIER_PREVIEW).collect();
        preview.sort();
        output.push_str("Classifiers:\n");
        for classifier in preview {
            output.push_str(&format!("  {classifier}\n"));
        }
        if info.classifiers.len() > CLASSIFIER_PREVIEW {
            output.push_str(&format!(
                "  ... and {} more\n",
                info.classifiers.len() - CLASSIFIER_PREVIEW
            ));
        }
    }
    push_list(&mut output, "Requires-Dist", &info.requires_dist);

    output.push_str(&format!("Files: {}\n", info.files.len()));
    output.push_str(&format!("Size: {} bytes\n", group_thousands(info.total_size)));
    if verbose {
        output.push_str("\nFile listing:\n");
        for file in &info.files {
            output.push_str(&format!(
                "  {:60} {:>10} bytes\n",
                file.path,
                group_thousands(file.size)
            ));
        }
    }
    output
}

/// Render `info` as pretty-printed JSON.
///
/// # Errors
///
/// Returns serialisation errors.
pub fn format_json(info: &WheelInfo) -> serde_json::Result<String> {
    serde_json::to_string_pretty(info)
}

fn push_field(output: &mut String, key: &str, value: Option<&str>) {
    if let Some(value) = value {
        output.push_str(&format!("{key}: {value}\n"));
    }
}

fn push_list(output: &mut String, key: &str, values: &[String]) {
    if values.is_empty() {
        return;
    }
    output.push_str(&format!("{key}:\n"));
    for value in values {
        output.push_str(&format!("  {value}\n"));
    }
}

/// Format `value` with `,` between groups of three digits.
fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, digit) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    grouped
}
