//! Snapshot directory naming
//!
//! A [`TimestampFormat`] both names new snapshots and decodes the names of
//! existing ones, so it is only accepted if it round-trips: a rendered time
//! must parse back completely, with no trailing characters.

use crate::error::{Result, SnapshotError};
use chrono::format::{self, Item, Parsed, StrftimeItems};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use std::fmt::Write as _;

/// A validated strftime-style format for snapshot names
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimestampFormat {
    pattern: String,
}

impl TimestampFormat {
    /// Validate `pattern` and wrap it
    ///
    /// # Errors
    ///
    /// [`SnapshotError::InvalidTimestampFormat`] if the pattern contains an
    /// unknown specifier, renders an empty name or a path separator, or
    /// cannot parse back what it renders.
    ///
    /// # Example
    ///
    /// ```rust
    /// use isnapshot::timestamp::TimestampFormat;
    ///
    /// assert!(TimestampFormat::new("%Y-%m-%d_%H%M%S").is_ok());
    /// assert!(TimestampFormat::new("%Y/%m/%d").is_err());
    /// assert!(TimestampFormat::new("%H-%M").is_err()); // no date to decode
    /// ```
    pub fn new(pattern: impl Into<String>) -> Result<Self> {
        let pattern = pattern.into();
        let invalid = |reason: &str| {
            SnapshotError::InvalidTimestampFormat(format!("{pattern:?}: {reason}"))
        };

        if StrftimeItems::new(&pattern).any(|item| matches!(item, Item::Error)) {
            return Err(invalid("unknown format specifier"));
        }

        let format = Self { pattern: pattern.clone() };
        let sample = NaiveDate::from_ymd_opt(2006, 1, 2)
            .and_then(|date| date.and_hms_opt(15, 4, 5))
            .ok_or_else(|| invalid("sample time out of range"))?;
        let rendered = format.render(sample)?;

        if rendered.is_empty() || rendered == "." || rendered == ".." {
            return Err(invalid("renders an unusable directory name"));
        }
        if rendered.contains('/') {
            return Err(invalid("renders a path separator"));
        }
        let decoded = format
            .parse(&rendered)
            .ok_or_else(|| invalid("rendered names cannot be parsed back"))?;
        // `%I` without `%p`, or `%M` without `%H`, parses but decodes to midnight
        if format.render(decoded)? != rendered {
            return Err(invalid("rendered names do not decode to the time they name"));
        }
        Ok(format)
    }

    /// The underlying strftime pattern
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Render `time` as a snapshot name
    pub fn render(&self, time: NaiveDateTime) -> Result<String> {
        let mut name = String::new();
        write!(name, "{}", time.format_with_items(StrftimeItems::new(&self.pattern))).map_err(
            |_| SnapshotError::InvalidTimestampFormat(format!("{:?}: cannot render", self.pattern)),
        )?;
        Ok(name)
    }

    /// Decode a snapshot name
    ///
    /// Returns `None` unless the whole of `name` matches the format. A
    /// date-only format decodes to midnight. Epoch seconds (`%s`) decode as
    /// UTC, which is also how they render.
    pub fn parse(&self, name: &str) -> Option<NaiveDateTime> {
        let mut parsed = Parsed::new();
        format::parse(&mut parsed, name, StrftimeItems::new(&self.pattern)).ok()?;
        match parsed.to_naive_date() {
            Ok(date) => {
                let time = parsed.to_naive_time().unwrap_or(NaiveTime::MIN);
                Some(date.and_time(time))
            }
            Err(_) => parsed.to_naive_datetime_with_offset(0).ok(),
        }
    }
}

impl Default for TimestampFormat {
    fn default() -> Self {
        Self {
            pattern: crate::types::DEFAULT_DATE_FORMAT.to_string(),
        }
    }
}

impl std::fmt::Display for TimestampFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.pattern)
    }
}
