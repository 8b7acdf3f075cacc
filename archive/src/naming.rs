//! Wheel filename grammar and compatibility tags.
//!
//! A wheel filename encodes the distribution identity and a compressed tag
//! set: `name-version[-build]-interpreters-abis-platforms.whl`, where each
//! tag axis is a dot-joined list. The Cartesian product of the three axes is
//! the set of `(interpreter, abi, platform)` triples the wheel supports.

use super::error::{ArchiveError, Result};
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// The fixed file extension for wheel archives.
pub const WHEEL_EXTENSION: &str = ".whl";

/// Suffix of the metadata directory name.
const DIST_INFO_SUFFIX: &str = ".dist-info";

/// Suffix of the data directory name.
const DATA_SUFFIX: &str = ".data";

/// A single `(interpreter, abi, platform)` compatibility triple.
///
/// Ordering is lexicographic by interpreter, then ABI, then platform, which
/// is the order used for `Tag:` lines in the WHEEL descriptor.
///
/// # Examples
///
/// ```
/// use wheelwright_archive::naming::Tag;
///
/// let tag: Tag = "py3-none-any".parse().expect("valid tag");
/// assert_eq!(tag.interpreter(), "py3");
/// assert_eq!(tag.to_string(), "py3-none-any");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tag {
    interpreter: String,
    abi: String,
    platform: String,
}

impl Tag {
    /// Create a tag from its three components.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::BadFilename`] if a component is empty or
    /// contains whitespace, `-`, or `.`.
    pub fn new(interpreter: &str, abi: &str, platform: &str) -> Result<Self> {
        let tag = Self {
            interpreter: interpreter.to_owned(),
            abi: abi.to_owned(),
            platform: platform.to_owned(),
        };
        for component in [interpreter, abi, platform] {
            if let Some(reason) = tag_component_problem(component) {
                return Err(ArchiveError::BadFilename {
                    filename: tag.to_string(),
                    reason,
                });
            }
        }
        Ok(tag)
    }

    /// Return the interpreter component.
    #[must_use]
    pub fn interpreter(&self) -> &str {
        &self.interpreter
    }

    /// Return the ABI component.
    #[must_use]
    pub fn abi(&self) -> &str {
        &self.abi
    }

    /// Return the platform component.
    #[must_use]
    pub fn platform(&self) -> &str {
        &self.platform
    }
}

impl FromStr for Tag {
    type Err = ArchiveError;

    fn from_str(value: &str) -> Result<Self> {
        let mut parts = value.split('-');
        match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(interpreter), Some(abi), Some(platform), None) => {
                Self::new(interpreter, abi, platform)
            }
            _ => Err(ArchiveError::BadFilename {
                filename: value.to_owned(),
                reason: "tag must have the form interpreter-abi-platform".to_owned(),
            }),
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.interpreter, self.abi, self.platform)
    }
}

/// A non-empty set of compatibility tags.
///
/// Filenames store the set compactly as three dot-joined axes; the set
/// itself always holds the expanded triples.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TagSet(BTreeSet<Tag>);

impl TagSet {
    /// A set holding exactly one tag.
    #[must_use]
    pub fn single(tag: Tag) -> Self {
        Self(BTreeSet::from([tag]))
    }

    /// The tag set of a pure Python 3 wheel: `py3-none-any`.
    #[must_use]
    pub fn pure_python3() -> Self {
        Self::single(Tag {
            interpreter: "py3".to_owned(),
            abi: "none".to_owned(),
            platform: "any".to_owned(),
        })
    }

    /// Expand three tag axes into their Cartesian product.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::BadFilename`] if any axis is empty or any
    /// component is malformed.
    ///
    /// # Examples
    ///
    /// ```
    /// use wheelwright_archive::naming::TagSet;
    ///
    /// let tags = TagSet::from_axes(&["py2", "py3"], &["none"], &["any"])
    ///     .expect("valid axes");
    /// assert_eq!(tags.len(), 2);
    /// ```
    pub fn from_axes<S: AsRef<str>>(
        interpreters: &[S],
        abis: &[S],
        platforms: &[S],
    ) -> Result<Self> {
        if interpreters.is_empty() || abis.is_empty() || platforms.is_empty() {
            return Err(ArchiveError::BadFilename {
                filename: String::new(),
                reason: "every tag axis needs at least one value".to_owned(),
            });
        }
        let mut tags = BTreeSet::new();
        for interpreter in interpreters {
            for abi in abis {
                for platform in platforms {
                    tags.insert(Tag::new(
                        interpreter.as_ref(),
                        abi.as_ref(),
                        platform.as_ref(),
                    )?);
                }
            }
        }
        Ok(Self(tags))
    }

    /// Add a tag to the set, returning `true` if it was not present.
    pub fn insert(&mut self, tag: Tag) -> bool {
        self.0.insert(tag)
    }

    /// Return whether `tag` is a member of the set.
    #[must_use]
    pub fn contains(&self, tag: &Tag) -> bool {
        self.0.contains(tag)
    }

    /// Number of expanded triples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always `false`; a tag set has at least one member.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate the tags sorted by `(interpreter, abi, platform)`.
    pub fn iter(&self) -> impl Iterator<Item = &Tag> {
        self.0.iter()
    }

    /// The unique sorted values of each axis.
    #[must_use]
    pub fn axes(&self) -> (Vec<&str>, Vec<&str>, Vec<&str>) {
        let interpreters: BTreeSet<&str> = self.0.iter().map(Tag::interpreter).collect();
        let abis: BTreeSet<&str> = self.0.iter().map(Tag::abi).collect();
        let platforms: BTreeSet<&str> = self.0.iter().map(Tag::platform).collect();
        (
            interpreters.into_iter().collect(),
            abis.into_iter().collect(),
            platforms.into_iter().collect(),
        )
    }
}

impl TryFrom<Vec<Tag>> for TagSet {
    type Error = ArchiveError;

    fn try_from(tags: Vec<Tag>) -> Result<Self> {
        if tags.is_empty() {
            return Err(ArchiveError::BadFilename {
                filename: String::new(),
                reason: "a wheel needs at least one tag".to_owned(),
            });
        }
        Ok(Self(tags.into_iter().collect()))
    }
}

impl<'a> IntoIterator for &'a TagSet {
    type Item = &'a Tag;
    type IntoIter = std::collections::btree_set::Iter<'a, Tag>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Compressed `interpreters-abis-platforms` form used in filenames.
impl fmt::Display for TagSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (interpreters, abis, platforms) = self.axes();
        write!(
            f,
            "{}-{}-{}",
            interpreters.join("."),
            abis.join("."),
            platforms.join(".")
        )
    }
}

/// An optional build tag: a decimal ordinal followed by a free-form suffix.
///
/// The original text is preserved so that `01` does not collapse to `1`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BuildTag(String);

impl BuildTag {
    /// Return the build tag text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The leading decimal ordinal, saturating at `u64::MAX`.
    #[must_use]
    pub fn ordinal(&self) -> u64 {
        self.0
            .chars()
            .take_while(char::is_ascii_digit)
            .filter_map(|c| c.to_digit(10))
            .fold(0_u64, |acc, digit| {
                acc.saturating_mul(10).saturating_add(u64::from(digit))
            })
    }

    /// The text following the leading digits.
    #[must_use]
    pub fn suffix(&self) -> &str {
        self.0.trim_start_matches(|c: char| c.is_ascii_digit())
    }
}

impl TryFrom<&str> for BuildTag {
    type Error = ArchiveError;

    fn try_from(value: &str) -> Result<Self> {
        let reason = if !value.starts_with(|c: char| c.is_ascii_digit()) {
            Some("build tag must start with a digit")
        } else if value.chars().any(|c| c.is_whitespace() || c == '-') {
            Some("build tag must not contain whitespace or '-'")
        } else {
            None
        };
        match reason {
            Some(reason) => Err(ArchiveError::BadFilename {
                filename: value.to_owned(),
                reason: reason.to_owned(),
            }),
            None => Ok(Self(value.to_owned())),
        }
    }
}

impl PartialOrd for BuildTag {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for BuildTag {
    fn cmp(&self, other: &Self) -> Ordering {
        self.ordinal()
            .cmp(&other.ordinal())
            .then_with(|| self.suffix().cmp(other.suffix()))
            .then_with(|| self.0.cmp(&other.0))
    }
}

impl fmt::Display for BuildTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The identity encoded in a wheel filename.
///
/// # Examples
///
/// ```
/// use wheelwright_archive::naming::DistributionIdentity;
///
/// let identity = DistributionIdentity::parse("foo-2-py2.py3-none-any.whl")
///     .expect("valid filename");
/// assert_eq!(identity.name(), "foo");
/// assert_eq!(identity.version(), "2");
/// assert_eq!(identity.tags().len(), 2);
/// assert_eq!(identity.dist_info_dir(), "foo-2.dist-info");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistributionIdentity {
    name: String,
    version: String,
    build: Option<BuildTag>,
    tags: TagSet,
}

impl DistributionIdentity {
    /// Create an identity for a pure Python 3 wheel.
    ///
    /// Use [`Self::with_tags`] and [`Self::with_build`] to refine it.
    #[must_use]
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            build: None,
            tags: TagSet::pure_python3(),
        }
    }

    /// Replace the tag set.
    #[must_use]
    pub fn with_tags(mut self, tags: TagSet) -> Self {
        self.tags = tags;
        self
    }

    /// Set or clear the build tag.
    #[must_use]
    pub fn with_build(mut self, build: Option<BuildTag>) -> Self {
        self.build = build;
        self
    }

    /// Parse a wheel filename.
    ///
    /// Any leading directory components are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::BadFilename`] if the name lacks the `.whl`
    /// extension, has the wrong number of dash-separated fields, or has an
    /// empty or whitespace-bearing component.
    pub fn parse(filename: &str) -> Result<Self> {
        let basename = filename.rsplit(['/', '\\']).next().unwrap_or(filename);
        let bad = |reason: &str| ArchiveError::BadFilename {
            filename: basename.to_owned(),
            reason: reason.to_owned(),
        };

        let stem = basename
            .strip_suffix(WHEEL_EXTENSION)
            .ok_or_else(|| bad("missing .whl extension"))?;
        if stem.chars().any(char::is_whitespace) {
            return Err(bad("whitespace is not allowed"));
        }

        let fields: Vec<&str> = stem.split('-').collect();
        if fields.iter().any(|field| field.is_empty()) {
            return Err(bad("empty component"));
        }
        let (name, version, build, axes) = match *fields.as_slice() {
            [name, version, interp, abi, plat] => (name, version, None, [interp, abi, plat]),
            [name, version, build, interp, abi, plat] => {
                (name, version, Some(build), [interp, abi, plat])
            }
            _ => return Err(bad("expected 5 or 6 dash-separated fields")),
        };

        let build = build
            .map(BuildTag::try_from)
            .transpose()
            .map_err(|_| bad("build tag must start with a digit"))?;
        let split_axis = |axis: &str| axis.split('.').map(str::to_owned).collect::<Vec<_>>();
        let tags = TagSet::from_axes(
            &split_axis(axes[0]),
            &split_axis(axes[1]),
            &split_axis(axes[2]),
        )
        .map_err(|err| match err {
            ArchiveError::BadFilename { reason, .. } => bad(&reason),
            other => other,
        })?;

        Ok(Self {
            name: name.to_owned(),
            version: version.to_owned(),
            build,
            tags,
        })
    }

    /// Return the distribution name as supplied.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Return the version as supplied.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Return the build tag, if any.
    #[must_use]
    pub fn build(&self) -> Option<&BuildTag> {
        self.build.as_ref()
    }

    /// Return the compatibility tags.
    #[must_use]
    pub fn tags(&self) -> &TagSet {
        &self.tags
    }

    /// The name with every run of characters outside `[A-Za-z0-9.]`
    /// replaced by `_`.
    #[must_use]
    pub fn escaped_name(&self) -> String {
        escape_component(&self.name)
    }

    /// The version, escaped like [`Self::escaped_name`].
    #[must_use]
    pub fn escaped_version(&self) -> String {
        escape_component(&self.version)
    }

    /// The metadata directory: `<name>-<version>.dist-info`.
    #[must_use]
    pub fn dist_info_dir(&self) -> String {
        format!(
            "{}-{}{DIST_INFO_SUFFIX}",
            self.escaped_name(),
            self.escaped_version()
        )
    }

    /// The data directory: `<name>-<version>.data`.
    #[must_use]
    pub fn data_dir(&self) -> String {
        format!(
            "{}-{}{DATA_SUFFIX}",
            self.escaped_name(),
            self.escaped_version()
        )
    }

    /// Return the canonical wheel filename.
    #[must_use]
    pub fn filename(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for DistributionIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.escaped_name(), self.escaped_version())?;
        if let Some(build) = &self.build {
            write!(f, "-{build}")?;
        }
        write!(f, "-{}{WHEEL_EXTENSION}", self.tags)
    }
}

/// Split a metadata directory name into `(name, version)`.
///
/// Accepts `<name>-<version>.dist-info` with exactly one dash, optionally
/// followed by a trailing `/`.
#[must_use]
pub fn split_dist_info_dir(dir: &str) -> Option<(&str, &str)> {
    let stem = dir.trim_end_matches('/').strip_suffix(DIST_INFO_SUFFIX)?;
    let (name, version) = stem.split_once('-')?;
    let valid = |part: &str| {
        !part.is_empty() && !part.contains(['-', '/']) && !part.contains(char::is_whitespace)
    };
    (valid(name) && valid(version)).then_some((name, version))
}

/// Replace each run of characters outside `[A-Za-z0-9.]` with `_`.
fn escape_component(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    let mut in_run = false;
    for c in value.chars() {
        if c.is_ascii_alphanumeric() || c == '.' {
            escaped.push(c);
            in_run = false;
        } else if !in_run {
            escaped.push('_');
            in_run = true;
        }
    }
    escaped
}

/// Describe why `component` cannot appear in a tag, if it cannot.
fn tag_component_problem(component: &str) -> Option<String> {
    if component.is_empty() {
        Some("empty tag component".to_owned())
    } else if component.contains(char::is_whitespace) {
        Some(format!("whitespace in tag component \"{component}\""))
    } else if component.contains(['-', '.']) {
        Some(format!("tag component \"{component}\" contains '-' or '.'"))
    } else {
        None
    }
}
