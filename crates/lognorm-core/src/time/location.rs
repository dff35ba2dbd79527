use std::fmt;
use std::str::FromStr;

use chrono::{FixedOffset, Local, NaiveDateTime, TimeZone, Utc};

use super::Timestamp;
use crate::error::TimeError;

/// Time zone that a codec forces its results into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Location {
    #[default]
    Utc,
    /// The process-local zone
    Local,
    Fixed(FixedOffset),
}

impl Location {
    /// Same instant, presented in this location
    pub fn convert(&self, ts: &Timestamp) -> Timestamp {
        match self {
            Location::Utc => ts.with_timezone(&Utc).fixed_offset(),
            Location::Local => ts.with_timezone(&Local).fixed_offset(),
            Location::Fixed(offset) => ts.with_timezone(offset),
        }
    }

    /// Interpret a zoneless date-time as wall clock time in this location
    pub fn localize(&self, naive: &NaiveDateTime) -> Option<Timestamp> {
        match self {
            Location::Utc => Some(naive.and_utc().fixed_offset()),
            Location::Local => Local
                .from_local_datetime(naive)
                .earliest()
                .map(|dt| dt.fixed_offset()),
            Location::Fixed(offset) => offset.from_local_datetime(naive).single(),
        }
    }
}

impl FromStr for Location {
    type Err = TimeError;

    /// Accepts `UTC`, `Z`, `Local`, or an offset like `+05:30`, `-0800`, `UTC+02`.
    fn from_str(s: &str) -> Result<Self, TimeError> {
        let trimmed = s.trim();
        match trimmed {
            "" | "UTC" | "utc" | "Z" | "GMT" => return Ok(Location::Utc),
            "Local" | "local" => return Ok(Location::Local),
            _ => {}
        }

        let offset = trimmed
            .strip_prefix("UTC")
            .or_else(|| trimmed.strip_prefix("GMT"))
            .unwrap_or(trimmed);
        parse_offset(offset)
            .map(Location::Fixed)
            .ok_or_else(|| TimeError::InvalidLocation(s.to_string()))
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Utc => write!(f, "UTC"),
            Location::Local => write!(f, "Local"),
            Location::Fixed(offset) => write!(f, "{}", offset),
        }
    }
}

fn parse_offset(s: &str) -> Option<FixedOffset> {
    let (sign, rest) = match s.as_bytes().first()? {
        b'+' => (1, &s[1..]),
        b'-' => (-1, &s[1..]),
        _ => return None,
    };
    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let (hours, minutes) = match digits.len() {
        1 | 2 => (digits.parse::<i32>().ok()?, 0),
        4 => (digits[..2].parse::<i32>().ok()?, digits[2..].parse::<i32>().ok()?),
        _ => return None,
    };
    if hours > 23 || minutes > 59 {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}
