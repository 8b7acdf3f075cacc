//! Header-style metadata files: WHEEL and METADATA.
//!
//! Both files are a block of `Key: Value` lines, a blank line, and an
//! optional free-text body. Keys may repeat (`Tag`, `Classifier`) and are
//! looked up case-insensitively.

use super::error::{ArchiveError, Result};
use super::naming::{BuildTag, DistributionIdentity, Tag, TagSet};

/// Basename of the archive-format descriptor.
pub const WHEEL_FILENAME: &str = "WHEEL";

/// Basename of the package metadata file.
pub const METADATA_FILENAME: &str = "METADATA";

/// Format version written to every WHEEL file.
pub const WHEEL_VERSION: &str = "1.0";

/// Metadata schema version used when the caller supplies none.
pub const DEFAULT_METADATA_VERSION: &str = "2.1";

/// Field whose value becomes the METADATA body rather than a header.
const DESCRIPTION_KEY: &str = "Description";

/// An ordered list of headers plus an optional body.
///
/// # Examples
///
/// ```
/// use wheelwright_archive::descriptor::HeaderMessage;
///
/// let mut message = HeaderMessage::default();
/// message.add("Name", "pkg");
/// message.set_body("Long text\n");
/// assert_eq!(message.render(), "Name: pkg\n\nLong text\n");
/// assert_eq!(HeaderMessage::parse(&message.render()).get("name"), Some("pkg"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderMessage {
    headers: Vec<(String, String)>,
    body: Option<String>,
}

impl HeaderMessage {
    /// Append a header; existing headers with the same key are kept.
    ///
    /// Line breaks in `key` become spaces. Line breaks in `value` are folded
    /// into continuation lines, so a value can never start a new header.
    pub fn add(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into().replace(['\r', '\n'], " ");
        self.headers.push((key, fold_value(&value.into())));
    }

    /// Replace the body.
    pub fn set_body(&mut self, body: impl Into<String>) {
        self.body = Some(body.into());
    }

    /// Return whether a header named `key` exists, ignoring case.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// The first value for `key`, ignoring case.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.get_all(key).next()
    }

    /// Every value for `key` in file order, ignoring case.
    pub fn get_all<'a, 'k>(&'a self, key: &'k str) -> impl Iterator<Item = &'a str> + use<'a, 'k> {
        self.headers
            .iter()
            .filter(move |(name, _)| name.eq_ignore_ascii_case(key))
            .map(|(_, value)| value.as_str())
    }

    /// Every header in file order.
    pub fn headers(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    /// The body, if any.
    #[must_use]
    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }

    /// Render headers, the separating blank line, and the body.
    #[must_use]
    pub fn render(&self) -> String {
        let mut text = String::new();
        for (key, value) in &self.headers {
            text.push_str(key);
            text.push_str(": ");
            text.push_str(value);
            text.push('\n');
        }
        text.push('\n');
        if let Some(body) = &self.body {
            text.push_str(body);
        }
        text
    }

    /// Parse header-style text.
    ///
    /// Lines starting with whitespace continue the previous header. The
    /// header block ends at the first blank line or the first line that is
    /// not a header; everything after it is the body.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let mut message = Self::default();
        let mut rest = text;
        while !rest.is_empty() {
            let (line, remainder) = rest.split_once('\n').unwrap_or((rest, ""));
            let line = line.strip_suffix('\r').unwrap_or(line);
            if line.is_empty() {
                rest = remainder;
                break;
            }
            if line.starts_with([' ', '\t']) {
                if let Some((_, value)) = message.headers.last_mut() {
                    value.push(' ');
                    value.push_str(line.trim());
                    rest = remainder;
                    continue;
                }
            }
            let Some((key, value)) = line.split_once(':') else {
                break;
            };
            message.add(key.trim(), value.trim());
            rest = remainder;
        }
        if !rest.is_empty() {
            message.body = Some(rest.to_owned());
        }
        message
    }
}

/// Fold embedded line breaks into indented continuation lines.
fn fold_value(value: &str) -> String {
    if !value.contains(['\r', '\n']) {
        return value.to_owned();
    }
    value
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n        ")
}

/// The parsed WHEEL descriptor.
///
/// # Examples
///
/// ```
/// use wheelwright_archive::descriptor::WheelDescriptor;
/// use wheelwright_archive::naming::TagSet;
///
/// let descriptor = WheelDescriptor::new("wheelwright (0.1.0)", true, None, TagSet::pure_python3());
/// let parsed = WheelDescriptor::parse(&descriptor.render()).expect("valid WHEEL");
/// assert_eq!(parsed, descriptor);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WheelDescriptor {
    wheel_version: String,
    generator: Option<String>,
    root_is_purelib: bool,
    build: Option<BuildTag>,
    tags: TagSet,
}

impl WheelDescriptor {
    /// Describe a wheel in the current format version.
    #[must_use]
    pub fn new(
        generator: impl Into<String>,
        root_is_purelib: bool,
        build: Option<BuildTag>,
        tags: TagSet,
    ) -> Self {
        Self {
            wheel_version: WHEEL_VERSION.to_owned(),
            generator: Some(generator.into()),
            root_is_purelib,
            build,
            tags,
        }
    }

    /// Describe the wheel named by `identity`.
    #[must_use]
    pub fn for_identity(
        identity: &DistributionIdentity,
        generator: &str,
        root_is_purelib: bool,
    ) -> Self {
        Self::new(
            generator,
            root_is_purelib,
            identity.build().cloned(),
            identity.tags().clone(),
        )
    }

    /// Parse WHEEL text.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::InvalidDescriptor`] when `Wheel-Version`,
    /// `Root-Is-Purelib`, or every `Tag` line is missing, or a value is
    /// malformed.
    pub fn parse(text: &str) -> Result<Self> {
        let message = HeaderMessage::parse(text);
        let invalid = |reason: String| ArchiveError::InvalidDescriptor {
            name: WHEEL_FILENAME.to_owned(),
            reason,
        };

        let wheel_version = message
            .get("Wheel-Version")
            .ok_or_else(|| invalid("missing Wheel-Version".to_owned()))?
            .to_owned();
        let purelib = message
            .get("Root-Is-Purelib")
            .ok_or_else(|| invalid("missing Root-Is-Purelib".to_owned()))?;
        let root_is_purelib = match purelib.to_ascii_lowercase().as_str() {
            "true" => true,
            "false" => false,
            other => return Err(invalid(format!("Root-Is-Purelib is \"{other}\""))),
        };
        let build = message
            .get("Build")
            .map(BuildTag::try_from)
            .transpose()
            .map_err(|err| invalid(err.to_string()))?;

        let mut tags: Vec<Tag> = Vec::new();
        for line in message.get_all("Tag") {
            let expanded = expand_tag_line(line).map_err(|err| invalid(err.to_string()))?;
            tags.extend(expanded.iter().cloned());
        }
        let tags = TagSet::try_from(tags).map_err(|_| invalid("no Tag lines".to_owned()))?;

        Ok(Self {
            wheel_version,
            generator: message.get("Generator").map(str::to_owned),
            root_is_purelib,
            build,
            tags,
        })
    }

    /// Render WHEEL text with `Tag` lines sorted by interpreter, ABI, and
    /// platform.
    #[must_use]
    pub fn render(&self) -> String {
        let mut message = HeaderMessage::default();
        message.add("Wheel-Version", self.wheel_version.as_str());
        if let Some(generator) = &self.generator {
            message.add("Generator", generator.as_str());
        }
        message.add("Root-Is-Purelib", self.root_is_purelib.to_string());
        if let Some(build) = &self.build {
            message.add("Build", build.as_str());
        }
        for tag in &self.tags {
            message.add("Tag", tag.to_string());
        }
        message.render()
    }

    /// Return the format version.
    #[must_use]
    pub fn wheel_version(&self) -> &str {
        &self.wheel_version
    }

    /// Return the generator, if recorded.
    #[must_use]
    pub fn generator(&self) -> Option<&str> {
        self.generator.as_deref()
    }

    /// Return whether the archive root installs to purelib.
    #[must_use]
    pub fn root_is_purelib(&self) -> bool {
        self.root_is_purelib
    }

    /// Return the build tag, if recorded.
    #[must_use]
    pub fn build(&self) -> Option<&BuildTag> {
        self.build.as_ref()
    }

    /// Replace the build tag.
    #[must_use]
    pub fn with_build(mut self, build: Option<BuildTag>) -> Self {
        self.build = build;
        self
    }

    /// Return the tags.
    #[must_use]
    pub fn tags(&self) -> &TagSet {
        &self.tags
    }
}

/// A `Tag:` value may itself use the compressed dotted form.
fn expand_tag_line(line: &str) -> Result<TagSet> {
    let line = line.trim();
    let parts: Vec<&str> = line.split('-').collect();
    let [interpreters, abis, platforms] = *parts.as_slice() else {
        return Err(ArchiveError::BadFilename {
            filename: line.to_owned(),
            reason: "expected interpreter-abi-platform".to_owned(),
        });
    };
    let split = |axis: &str| axis.split('.').map(str::to_owned).collect::<Vec<_>>();
    TagSet::from_axes(&split(interpreters), &split(abis), &split(platforms))
}

/// Build METADATA text from ordered `(key, value)` fields.
///
/// Keys are title-cased. A `Description` field becomes the body. The
/// `Metadata-Version`, `Name`, and `Version` headers are appended from
/// defaults and `identity` when absent.
///
/// # Examples
///
/// ```
/// use wheelwright_archive::descriptor::render_metadata;
/// use wheelwright_archive::naming::DistributionIdentity;
///
/// let identity = DistributionIdentity::new("pkg", "1.0");
/// let text = render_metadata([("summary", "A package")], &identity);
/// assert_eq!(
///     text,
///     "Summary: A package\nMetadata-Version: 2.1\nName: pkg\nVersion: 1.0\n\n"
/// );
/// ```
pub fn render_metadata<I, K, V>(fields: I, identity: &DistributionIdentity) -> String
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut message = HeaderMessage::default();
    for (key, value) in fields {
        let key = title_case(key.as_ref());
        if key == DESCRIPTION_KEY {
            message.set_body(value.as_ref());
        } else {
            message.add(key, value.as_ref());
        }
    }
    if !message.contains("Metadata-Version") {
        message.add("Metadata-Version", DEFAULT_METADATA_VERSION);
    }
    if !message.contains("Name") {
        message.add("Name", identity.name());
    }
    if !message.contains("Version") {
        message.add("Version", identity.version());
    }
    message.render()
}

/// Capitalise the first letter of each alphabetic run and lowercase the rest.
fn title_case(key: &str) -> String {
    let mut titled = String::with_capacity(key.len());
    let mut previous_is_alpha = false;
    for c in key.chars() {
        if previous_is_alpha {
            titled.extend(c.to_lowercase());
        } else {
            titled.extend(c.to_uppercase());
        }
        previous_is_alpha = c.is_alphabetic();
    }
    titled
}
