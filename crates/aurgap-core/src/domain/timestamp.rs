use std::fmt::{Display, Formatter};

use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use time::macros::format_description;
use time::{Date, Duration, PrimitiveDateTime, Time};

use crate::ValidationError;

const SECONDS_PER_YEAR: f64 = 365.0 * 86_400.0;

/// Wall-clock timestamp without an offset.
///
/// Every input series is assumed to be recorded on the same civil clock, so
/// no zone conversion is ever applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CivilDateTime(PrimitiveDateTime);

impl CivilDateTime {
    pub const fn new(value: PrimitiveDateTime) -> Self {
        Self(value)
    }

    /// Midnight of `date`.
    pub const fn from_date(date: Date) -> Self {
        Self(PrimitiveDateTime::new(date, Time::MIDNIGHT))
    }

    /// Parse the timestamp layouts found in exported price files.
    ///
    /// Date-only values are interpreted as midnight.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let trimmed = input.trim();
        parse_datetime(trimmed)
            .or_else(|| parse_date(trimmed).map(|date| PrimitiveDateTime::new(date, Time::MIDNIGHT)))
            .map(Self)
            .ok_or_else(|| ValidationError::InvalidTimestamp {
                value: input.to_owned(),
            })
    }

    pub const fn date(self) -> Date {
        self.0.date()
    }

    pub const fn into_inner(self) -> PrimitiveDateTime {
        self.0
    }

    /// Signed distance to `later` in 365-day years.
    pub fn years_until(self, later: Self) -> f64 {
        let elapsed: Duration = later.0 - self.0;
        elapsed.as_seconds_f64() / SECONDS_PER_YEAR
    }
}

impl From<PrimitiveDateTime> for CivilDateTime {
    fn from(value: PrimitiveDateTime) -> Self {
        Self(value)
    }
}

impl Display for CivilDateTime {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let date = self.0.date();
        let time = self.0.time();
        write!(
            f,
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
            date.year(),
            u8::from(date.month()),
            date.day(),
            time.hour(),
            time.minute(),
            time.second()
        )
    }
}

impl Serialize for CivilDateTime {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for CivilDateTime {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Self::parse(&value).map_err(D::Error::custom)
    }
}

/// Parse a calendar date, also accepting a full timestamp and truncating it.
pub fn parse_date_key(input: &str) -> Result<Date, ValidationError> {
    let trimmed = input.trim();
    parse_date(trimmed)
        .or_else(|| parse_datetime(trimmed).map(PrimitiveDateTime::date))
        .ok_or_else(|| ValidationError::InvalidTimestamp {
            value: input.to_owned(),
        })
}

fn parse_datetime(input: &str) -> Option<PrimitiveDateTime> {
    PrimitiveDateTime::parse(
        input,
        &format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"),
    )
    .or_else(|_| {
        PrimitiveDateTime::parse(
            input,
            &format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
        )
    })
    .or_else(|_| {
        PrimitiveDateTime::parse(
            input,
            &format_description!("[year]-[month]-[day] [hour]:[minute]"),
        )
    })
    .or_else(|_| {
        PrimitiveDateTime::parse(
            input,
            &format_description!("[year]/[month]/[day] [hour]:[minute]:[second]"),
        )
    })
    .or_else(|_| {
        PrimitiveDateTime::parse(
            input,
            &format_description!("[year]/[month]/[day] [hour]:[minute]"),
        )
    })
    .ok()
}

fn parse_date(input: &str) -> Option<Date> {
    Date::parse(input, &format_description!("[year]-[month]-[day]"))
        .or_else(|_| Date::parse(input, &format_description!("[year]/[month]/[day]")))
        .ok()
}
