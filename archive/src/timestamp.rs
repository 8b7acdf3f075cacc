//! Modification timestamps stored in ZIP entry headers.
//!
//! ZIP headers use MS-DOS date/time fields, which cannot represent anything
//! before 1980-01-01. Earlier timestamps are clamped to that epoch.

use super::error::{ArchiveError, Result};
use std::fmt;
use time::OffsetDateTime;

/// 1980-01-01T00:00:00Z as seconds since the Unix epoch.
pub const MINIMUM_TIMESTAMP: i64 = 315_532_800;

/// A validated entry modification time in whole seconds since the Unix epoch.
///
/// # Examples
///
/// ```
/// use wheelwright_archive::timestamp::{EntryTimestamp, MINIMUM_TIMESTAMP};
///
/// let ts = EntryTimestamp::from_unix(0);
/// assert_eq!(ts.as_unix(), MINIMUM_TIMESTAMP);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntryTimestamp(i64);

impl EntryTimestamp {
    /// Build a timestamp, clamping values before 1980 up to the ZIP epoch.
    #[must_use]
    pub fn from_unix(seconds: i64) -> Self {
        Self(seconds.max(MINIMUM_TIMESTAMP))
    }

    /// Return the seconds since the Unix epoch.
    #[must_use]
    pub fn as_unix(self) -> i64 {
        self.0
    }

    /// Convert to the ZIP header representation (UTC, 2-second resolution).
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::InvalidTimestamp`] for times after 2107,
    /// which the DOS date field cannot hold.
    pub fn to_zip(self) -> Result<zip::DateTime> {
        let invalid = || ArchiveError::InvalidTimestamp { seconds: self.0 };
        let utc = OffsetDateTime::from_unix_timestamp(self.0).map_err(|_| invalid())?;
        let year = u16::try_from(utc.year()).map_err(|_| invalid())?;
        zip::DateTime::from_date_and_time(
            year,
            u8::from(utc.month()),
            utc.day(),
            utc.hour(),
            utc.minute(),
            utc.second(),
        )
        .map_err(|_| invalid())
    }
}

impl Default for EntryTimestamp {
    /// The ZIP epoch, used when no timestamp is supplied.
    fn default() -> Self {
        Self(MINIMUM_TIMESTAMP)
    }
}

impl From<EntryTimestamp> for i64 {
    fn from(ts: EntryTimestamp) -> Self {
        ts.0
    }
}

impl fmt::Display for EntryTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
