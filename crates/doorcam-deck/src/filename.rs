//! Snapshot basenames: `YYYY-MM-DD_HH_MM_<state>.<ext>`.

use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use doorcam_core::DoorState;
use serde::{Deserialize, Serialize};

/// Door state written into a snapshot's name when it was taken.
///
/// This is ground truth for scoring only; the pipeline never reads it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordedState {
    #[serde(rename = "open")]
    Open,
    #[serde(rename = "close")]
    Closed,
    #[serde(rename = "unknown")]
    Unknown,
}

impl RecordedState {
    fn from_word(word: &str) -> Self {
        match word {
            "open" => RecordedState::Open,
            "close" => RecordedState::Closed,
            _ => RecordedState::Unknown,
        }
    }

    /// Whether `state` agrees with this label; `None` when the label is unknown.
    pub fn agrees_with(self, state: DoorState) -> Option<bool> {
        match self {
            RecordedState::Open => Some(state == DoorState::Open),
            RecordedState::Closed => Some(state == DoorState::Closed),
            RecordedState::Unknown => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RecordedState::Open => "open",
            RecordedState::Closed => "close",
            RecordedState::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for RecordedState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RecordedState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "open" => Ok(RecordedState::Open),
            "close" | "closed" => Ok(RecordedState::Closed),
            other => Err(format!("expected `open` or `close`, got `{other}`")),
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum FilenameError {
    #[error("`{0}` does not look like YYYY-MM-DD_HH_MM_<state>.<ext>")]
    UnparsableFilename(String),
}

/// What a snapshot's basename says about it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotName {
    pub timestamp: NaiveDateTime,
    pub state: RecordedState,
}

impl SnapshotName {
    #[inline]
    pub fn date(&self) -> NaiveDate {
        self.timestamp.date()
    }

    /// Taken before noon.
    #[inline]
    pub fn is_morning(&self) -> bool {
        self.timestamp.hour() < 12
    }

    /// `open`/`close` snapshots are domain files; anything else is not.
    #[inline]
    pub fn is_domain_file(&self) -> bool {
        self.state != RecordedState::Unknown
    }
}

fn digits(s: &str) -> Option<u32> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

/// Parse a snapshot basename such as `2017-11-20_06_25_close.jpg`.
///
/// A word other than `open`/`close` parses as [`RecordedState::Unknown`].
pub fn parse_snapshot_name(basename: &str) -> Result<SnapshotName, FilenameError> {
    let bad = || FilenameError::UnparsableFilename(basename.to_string());

    // Fixed-width prefix: YYYY-MM-DD_HH_MM_
    let prefix = basename.get(..17).ok_or_else(bad)?;
    let b = prefix.as_bytes();
    let separators = [(4, b'-'), (7, b'-'), (10, b'_'), (13, b'_'), (16, b'_')];
    if !prefix.is_ascii() || separators.iter().any(|&(i, c)| b[i] != c) {
        return Err(bad());
    }
    let year = digits(&prefix[0..4]).ok_or_else(bad)?;
    let month = digits(&prefix[5..7]).ok_or_else(bad)?;
    let day = digits(&prefix[8..10]).ok_or_else(bad)?;
    let hour = digits(&prefix[11..13]).ok_or_else(bad)?;
    let minute = digits(&prefix[14..16]).ok_or_else(bad)?;

    let (word, ext) = basename[17..].rsplit_once('.').ok_or_else(bad)?;
    if word.is_empty() || ext.is_empty() || !word.bytes().all(|c| c.is_ascii_alphanumeric()) {
        return Err(bad());
    }

    let date = NaiveDate::from_ymd_opt(year as i32, month, day).ok_or_else(bad)?;
    let time = NaiveTime::from_hms_opt(hour, minute, 0).ok_or_else(bad)?;
    Ok(SnapshotName {
        timestamp: date.and_time(time),
        state: RecordedState::from_word(word),
    })
}

/// [`parse_snapshot_name`] on the final component of `path`.
pub fn parse_snapshot_path(path: &Path) -> Result<SnapshotName, FilenameError> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| FilenameError::UnparsableFilename(path.display().to_string()))?;
    parse_snapshot_name(name)
}
