use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::Date;

use crate::{CivilDateTime, ValidationError};

/// One of the four bar price fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceField {
    Open,
    High,
    Low,
    Close,
}

impl PriceField {
    pub const ALL: [Self; 4] = [Self::Open, Self::High, Self::Low, Self::Close];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::High => "high",
            Self::Low => "low",
            Self::Close => "close",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Open => "Open",
            Self::High => "High",
            Self::Low => "Low",
            Self::Close => "Close",
        }
    }
}

impl Display for PriceField {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PriceField {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "open" => Ok(Self::Open),
            "high" => Ok(Self::High),
            "low" => Ok(Self::Low),
            "close" => Ok(Self::Close),
            _ => Err(ValidationError::InvalidValue {
                field: "price_field",
                value: value.to_owned(),
            }),
        }
    }
}

/// Open/high/low/close quadruple. Missing values are carried as NaN.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ohlc {
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl Ohlc {
    pub const fn new(open: f64, high: f64, low: f64, close: f64) -> Self {
        Self {
            open,
            high,
            low,
            close,
        }
    }

    pub const fn splat(value: f64) -> Self {
        Self::new(value, value, value, value)
    }

    pub const fn get(&self, field: PriceField) -> f64 {
        match field {
            PriceField::Open => self.open,
            PriceField::High => self.high,
            PriceField::Low => self.low,
            PriceField::Close => self.close,
        }
    }

    /// Apply `f` to each field independently.
    pub fn map(self, mut f: impl FnMut(f64) -> f64) -> Self {
        Self::new(f(self.open), f(self.high), f(self.low), f(self.close))
    }

    /// Combine two quadruples field by field.
    pub fn zip_with(self, other: Self, mut f: impl FnMut(f64, f64) -> f64) -> Self {
        Self::new(
            f(self.open, other.open),
            f(self.high, other.high),
            f(self.low, other.low),
            f(self.close, other.close),
        )
    }

    pub fn is_complete(&self) -> bool {
        PriceField::ALL
            .iter()
            .all(|field| self.get(*field).is_finite())
    }
}

/// Intraday (or daily) price bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub ts: CivilDateTime,
    #[serde(flatten)]
    pub prices: Ohlc,
}

impl PriceBar {
    pub const fn new(ts: CivilDateTime, prices: Ohlc) -> Self {
        Self { ts, prices }
    }
}

/// Daily scalar observation: an FX spot rate or an annualized funding rate in percent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RateObservation {
    pub date: Date,
    pub rate: f64,
}

impl RateObservation {
    pub const fn new(date: Date, rate: f64) -> Self {
        Self { date, rate }
    }
}

/// A benchmark observation with every pricing input attached.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JoinedRecord {
    pub ts: CivilDateTime,
    pub benchmark: Ohlc,
    pub fx_rate: f64,
    pub funding_rate: f64,
    /// Time to expiry in 365-day years; negative after expiry.
    pub t: f64,
    pub contract: Ohlc,
}

impl JoinedRecord {
    pub fn is_complete(&self) -> bool {
        self.benchmark.is_complete()
            && self.contract.is_complete()
            && self.fx_rate.is_finite()
            && self.funding_rate.is_finite()
            && self.t.is_finite()
    }
}

/// Observed contract price minus parity forward price, per field.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GapRecord {
    #[serde(rename = "DateTime")]
    pub ts: CivilDateTime,
    pub gap_open: f64,
    pub gap_high: f64,
    pub gap_low: f64,
    pub gap_close: f64,
}

impl GapRecord {
    pub const fn new(ts: CivilDateTime, gaps: Ohlc) -> Self {
        Self {
            ts,
            gap_open: gaps.open,
            gap_high: gaps.high,
            gap_low: gaps.low,
            gap_close: gaps.close,
        }
    }

    pub const fn gaps(&self) -> Ohlc {
        Ohlc::new(self.gap_open, self.gap_high, self.gap_low, self.gap_close)
    }

    pub fn gap(&self, field: PriceField) -> f64 {
        self.gaps().get(field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_price_field_case_insensitively() {
        assert_eq!(PriceField::from_str(" Close ").expect("field"), PriceField::Close);
        assert!(PriceField::from_str("volume").is_err());
    }

    #[test]
    fn nan_makes_ohlc_incomplete() {
        assert!(Ohlc::new(1.0, 2.0, 0.5, 1.5).is_complete());
        assert!(!Ohlc::new(1.0, f64::NAN, 0.5, 1.5).is_complete());
    }

    #[test]
    fn gap_record_round_trips_fields() {
        let ts = CivilDateTime::parse("2024-01-02 09:00:00").expect("timestamp");
        let record = GapRecord::new(ts, Ohlc::new(1.0, 2.0, 3.0, 4.0));
        assert_eq!(record.gap(PriceField::Low), 3.0);
        assert_eq!(record.gaps(), Ohlc::new(1.0, 2.0, 3.0, 4.0));
    }
}
