use std::{fmt, str::FromStr, sync::LazyLock};

use chrono::{Datelike, NaiveDate};
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::RegistryError;

pub const NUPCAN_PREFIX: &str = "GABCONCOURS";

static NUPCAN_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^GABCONCOURS-(\d{2}-\d{2})-([1-9]\d*)$").expect("static NUPCAN pattern")
});

/// Calendar day in `MM-DD` form. One counter row exists per key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DateKey(String);

impl DateKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<NaiveDate> for DateKey {
    fn from(date: NaiveDate) -> Self {
        Self(format!("{:02}-{:02}", date.month(), date.day()))
    }
}

impl FromStr for DateKey {
    type Err = RegistryError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let malformed = || RegistryError::MalformedIdentifier(format!("bad date key {input:?}"));

        let (month, day) = input.split_once('-').ok_or_else(malformed)?;
        let two_digits = |part: &str| part.len() == 2 && part.bytes().all(|b| b.is_ascii_digit());
        if !two_digits(month) || !two_digits(day) {
            return Err(malformed());
        }

        let month: u32 = month.parse().map_err(|_| malformed())?;
        let day: u32 = day.parse().map_err(|_| malformed())?;
        // leap year, so 02-29 stays valid
        NaiveDate::from_ymd_opt(2000, month, day).ok_or_else(malformed)?;

        Ok(Self(input.to_string()))
    }
}

impl fmt::Display for DateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Application number handed to a candidate: `GABCONCOURS-<MM-DD>-<N>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Nupcan {
    pub date_key: DateKey,
    pub sequence: u64,
}

impl Nupcan {
    pub fn new(date_key: DateKey, sequence: u64) -> Self {
        Self { date_key, sequence }
    }
}

impl fmt::Display for Nupcan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{NUPCAN_PREFIX}-{}-{}", self.date_key, self.sequence)
    }
}

impl FromStr for Nupcan {
    type Err = RegistryError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let captures = NUPCAN_PATTERN
            .captures(input)
            .ok_or_else(|| RegistryError::MalformedIdentifier(input.to_string()))?;

        let date_key: DateKey = captures[1].parse()?;
        let sequence: u64 = captures[2]
            .parse()
            .map_err(|_| RegistryError::MalformedIdentifier(input.to_string()))?;

        Ok(Self { date_key, sequence })
    }
}

impl Serialize for Nupcan {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Nupcan {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
