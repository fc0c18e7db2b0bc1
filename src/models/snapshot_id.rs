//! Snapshot identifiers
//!
//! A snapshot is named after the calendar day it was taken, with a numeric
//! suffix for the second and later snapshots of the same day:
//! `2024-03-13`, `2024-03-13.1`, `2024-03-13.2`, ...
//!
//! Ids order by date, then by sequence, so sorting directory names through
//! [`SnapshotId`] gives oldest-to-newest.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::AeonError;

/// Date plus same-day sequence number; sequence 0 renders without a suffix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SnapshotId {
    // Field order drives the derived ordering.
    date: NaiveDate,
    sequence: u32,
}

impl SnapshotId {
    /// Create an id from its parts
    pub fn new(date: NaiveDate, sequence: u32) -> Self {
        Self { date, sequence }
    }

    /// The first (unsuffixed) id of a day
    pub fn first_of_day(date: NaiveDate) -> Self {
        Self::new(date, 0)
    }

    /// Calendar day of the snapshot
    pub fn date(&self) -> NaiveDate {
        self.date
    }

    /// Same-day sequence number
    pub fn sequence(&self) -> u32 {
        self.sequence
    }

    /// Parse a directory name
    ///
    /// Accepts `YYYY-MM-DD` or `YYYY-MM-DD.N` with `N` a positive integer
    /// without leading zeros. `.0` is rejected because it is not canonical.
    pub fn parse(s: &str) -> Result<Self, AeonError> {
        let malformed = || AeonError::MalformedId(s.to_string());

        let (date_part, sequence_part) = match s.split_once('.') {
            Some((date, seq)) => (date, Some(seq)),
            None => (s, None),
        };

        let bytes = date_part.as_bytes();
        let shape_ok = bytes.len() == 10
            && bytes.iter().enumerate().all(|(i, b)| match i {
                4 | 7 => *b == b'-',
                _ => b.is_ascii_digit(),
            });
        if !shape_ok {
            return Err(malformed());
        }

        let date = NaiveDate::parse_from_str(date_part, "%Y-%m-%d").map_err(|_| malformed())?;

        let sequence = match sequence_part {
            None => 0,
            Some(seq) => {
                if seq.is_empty()
                    || !seq.bytes().all(|b| b.is_ascii_digit())
                    || seq.starts_with('0')
                {
                    return Err(malformed());
                }
                seq.parse::<u32>().map_err(|_| malformed())?
            }
        };

        Ok(Self { date, sequence })
    }
}

/// Pick the id for a new sync
///
/// In daily mode an existing snapshot dated `today` is returned unchanged
/// (the newest of that day). Otherwise the result is strictly greater than
/// every existing id of `today`: sequence 0 when the day is empty, else one
/// past the highest sequence.
pub fn next_id<'a, I>(existing: I, today: NaiveDate, daily_mode: bool) -> SnapshotId
where
    I: IntoIterator<Item = &'a SnapshotId>,
{
    let highest_today = existing
        .into_iter()
        .filter(|id| id.date == today)
        .map(|id| id.sequence)
        .max();

    match highest_today {
        Some(sequence) if daily_mode => SnapshotId::new(today, sequence),
        Some(sequence) => SnapshotId::new(today, sequence + 1),
        None => SnapshotId::first_of_day(today),
    }
}

impl fmt::Display for SnapshotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02}",
            self.date.year(),
            self.date.month(),
            self.date.day()
        )?;
        if self.sequence > 0 {
            write!(f, ".{}", self.sequence)?;
        }
        Ok(())
    }
}

impl FromStr for SnapshotId {
    type Err = AeonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for SnapshotId {
    type Error = AeonError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<SnapshotId> for String {
    fn from(id: SnapshotId) -> Self {
        id.to_string()
    }
}
