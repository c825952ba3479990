//! Parity fair value of a gold forward.
//!
//! The benchmark is quoted per troy ounce in the foreign currency; domestic
//! contracts are quoted per gram in the domestic currency. Conversion is
//! `price * fx / 31.1035`, and the forward is the converted spot compounded
//! continuously at the domestic funding rate until expiry.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{ContractFamily, JoinedRecord, Ohlc, ValidationError};

/// Grams per troy ounce.
pub const TROY_OUNCE_GRAMS: f64 = 31.1035;

/// Convert a per-ounce foreign price to a per-gram domestic price.
pub fn convert_spot(price_per_ounce: f64, fx_rate: f64) -> f64 {
    price_per_ounce * fx_rate / TROY_OUNCE_GRAMS
}

/// Continuous-compounding parity forward. `funding_rate_percent` is annualized, in percent.
pub fn parity_forward(converted: f64, funding_rate_percent: f64, t_years: f64) -> f64 {
    converted * (funding_rate_percent / 100.0 * t_years).exp()
}

/// Converted spot and parity forward for all four fields of one record.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FairValue {
    pub converted: Ohlc,
    pub forward: Ohlc,
}

/// Synthesize the parity forward for each price field of `record`.
///
/// Fields are computed independently; a NaN in one never reaches another.
pub fn synthesize(record: &JoinedRecord) -> FairValue {
    let converted = record
        .benchmark
        .map(|price| convert_spot(price, record.fx_rate));
    let forward = converted.map(|spot| parity_forward(spot, record.funding_rate, record.t));
    FairValue { converted, forward }
}

/// Unit the traded contract is quoted in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuoteConvention {
    /// Follow the contract family: domestic symbols are per gram, international per ounce.
    #[default]
    Auto,
    /// Already per gram in domestic currency; compared as-is.
    PerGram,
    /// Per ounce in the foreign currency; converted with the same day's FX rate.
    PerOunce,
}

impl QuoteConvention {
    /// Concrete convention for a contract of `family`.
    pub const fn resolve(self, family: ContractFamily) -> Self {
        match (self, family) {
            (Self::Auto, ContractFamily::Domestic) => Self::PerGram,
            (Self::Auto, ContractFamily::International) => Self::PerOunce,
            (other, _) => other,
        }
    }

    /// Observed contract prices expressed per gram in domestic currency.
    pub fn observed(self, record: &JoinedRecord) -> Ohlc {
        match self {
            Self::PerOunce => record
                .contract
                .map(|price| convert_spot(price, record.fx_rate)),
            Self::Auto | Self::PerGram => record.contract,
        }
    }
}

impl FromStr for QuoteConvention {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "auto" => Ok(Self::Auto),
            "per_gram" | "domestic" => Ok(Self::PerGram),
            "per_ounce" | "international" => Ok(Self::PerOunce),
            _ => Err(ValidationError::InvalidValue {
                field: "quote_convention",
                value: value.to_owned(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CivilDateTime;

    fn record(benchmark: Ohlc, contract: Ohlc) -> JoinedRecord {
        JoinedRecord {
            ts: CivilDateTime::parse("2024-01-02 09:00:00").expect("timestamp"),
            benchmark,
            fx_rate: 7.1,
            funding_rate: 2.0,
            t: 0.25,
            contract,
        }
    }

    #[test]
    fn converts_ounce_to_gram() {
        let converted = convert_spot(2000.0, 7.1);
        assert!((converted - 14_200.0 / 31.1035).abs() < 1e-9);
    }

    #[test]
    fn zero_horizon_forward_equals_spot() {
        assert_eq!(parity_forward(456.5, 2.0, 0.0), 456.5);
        assert!(parity_forward(456.5, 2.0, -0.1) < 456.5);
    }

    #[test]
    fn fields_are_synthesized_independently() {
        let clean = synthesize(&record(Ohlc::new(2000.0, 2010.0, 1990.0, 2005.0), Ohlc::splat(460.0)));
        let dirty = synthesize(&record(
            Ohlc::new(2000.0, f64::NAN, 1990.0, 2005.0),
            Ohlc::splat(460.0),
        ));

        assert!(dirty.forward.high.is_nan());
        assert_eq!(clean.forward.open, dirty.forward.open);
        assert_eq!(clean.forward.low, dirty.forward.low);
        assert_eq!(clean.forward.close, dirty.forward.close);
    }

    #[test]
    fn per_ounce_contracts_are_converted_before_comparison() {
        let joined = record(Ohlc::splat(2000.0), Ohlc::splat(2010.0));
        let auto_intl = QuoteConvention::Auto.resolve(ContractFamily::International);
        assert_eq!(auto_intl, QuoteConvention::PerOunce);
        assert_eq!(auto_intl.observed(&joined).close, convert_spot(2010.0, 7.1));

        let auto_dom = QuoteConvention::Auto.resolve(ContractFamily::Domestic);
        assert_eq!(auto_dom.observed(&joined).close, 2010.0);
        assert_eq!(
            QuoteConvention::PerGram.resolve(ContractFamily::International),
            QuoteConvention::PerGram
        );
    }
}
