//! Contract calendar: symbol → expiry instant, and time-to-expiry models.
//!
//! Two symbol grammars are understood:
//!
//! | Family | Layout | Example | Delivery month |
//! |--------|--------|---------|----------------|
//! | Domestic | `<product><YY><MM>` | `AU2412` | 2024-12 |
//! | International | `<product><month letter><YY>[...]` | `GCZ23E` | 2023-12 |
//!
//! The product code is always two letters, and the grammar is picked from the
//! character that follows it. Every contract expires on the first day of its
//! delivery month at 02:30 clearing time.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::macros::time;
use time::{Date, Month, PrimitiveDateTime, Time};
use tracing::warn;

use crate::{CivilDateTime, ContractSymbol, ValidationError};

/// Intraday cutoff applied to every expiry date.
pub const EXPIRY_CUTOFF: Time = time!(02:30);

const PRODUCT_LEN: usize = 2;
const DOMESTIC_LEN: usize = PRODUCT_LEN + 4;

/// Naming convention a contract symbol follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractFamily {
    /// Numeric year and month suffix, quoted per gram in domestic currency.
    Domestic,
    /// Month letter and two-digit year, quoted per ounce in the foreign currency.
    International,
}

impl ContractFamily {
    pub const ALL: [Self; 2] = [Self::Domestic, Self::International];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Domestic => "domestic",
            Self::International => "international",
        }
    }
}

impl Display for ContractFamily {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What to do with a month letter outside `F,G,H,J,K,M,N,Q,U,V,X,Z`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MonthCodePolicy {
    /// Fall back to January and log a warning.
    #[default]
    Lenient,
    /// Reject the symbol.
    Strict,
}

impl FromStr for MonthCodePolicy {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "lenient" => Ok(Self::Lenient),
            "strict" => Ok(Self::Strict),
            _ => Err(ValidationError::InvalidValue {
                field: "month_code_policy",
                value: value.to_owned(),
            }),
        }
    }
}

/// A resolved contract: its code, grammar family and expiry instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractSpec {
    pub symbol: ContractSymbol,
    pub product: String,
    pub family: ContractFamily,
    pub expiry: CivilDateTime,
}

/// Map an international month letter to its delivery month.
pub const fn month_from_code(code: char) -> Option<Month> {
    match code {
        'F' => Some(Month::January),
        'G' => Some(Month::February),
        'H' => Some(Month::March),
        'J' => Some(Month::April),
        'K' => Some(Month::May),
        'M' => Some(Month::June),
        'N' => Some(Month::July),
        'Q' => Some(Month::August),
        'U' => Some(Month::September),
        'V' => Some(Month::October),
        'X' => Some(Month::November),
        'Z' => Some(Month::December),
        _ => None,
    }
}

/// Identify the grammar of `symbol` without resolving its expiry.
pub fn detect_family(symbol: &ContractSymbol) -> Result<ContractFamily, ValidationError> {
    let code = symbol.as_str();
    let bytes = code.as_bytes();
    if bytes.len() <= PRODUCT_LEN {
        return Err(ValidationError::invalid_symbol(code, "too short"));
    }
    if !bytes[..PRODUCT_LEN].iter().all(u8::is_ascii_alphabetic) {
        return Err(ValidationError::invalid_symbol(
            code,
            "product code must be two letters",
        ));
    }

    if bytes[PRODUCT_LEN].is_ascii_digit() {
        Ok(ContractFamily::Domestic)
    } else {
        Ok(ContractFamily::International)
    }
}

/// Resolve a contract symbol to its expiry.
pub fn resolve(
    symbol: &ContractSymbol,
    policy: MonthCodePolicy,
) -> Result<ContractSpec, ValidationError> {
    let family = detect_family(symbol)?;
    let code = symbol.as_str();
    let (year, month) = match family {
        ContractFamily::Domestic => domestic_delivery(code)?,
        ContractFamily::International => international_delivery(code, policy)?,
    };

    let date = Date::from_calendar_date(year, month, 1)
        .map_err(|error| ValidationError::invalid_symbol(code, error.to_string()))?;

    Ok(ContractSpec {
        symbol: symbol.clone(),
        product: code[..PRODUCT_LEN].to_owned(),
        family,
        expiry: CivilDateTime::new(PrimitiveDateTime::new(date, EXPIRY_CUTOFF)),
    })
}

fn domestic_delivery(code: &str) -> Result<(i32, Month), ValidationError> {
    if code.len() != DOMESTIC_LEN || !code[PRODUCT_LEN..].bytes().all(|b| b.is_ascii_digit()) {
        return Err(ValidationError::invalid_symbol(
            code,
            "domestic contracts use <product><YY><MM>",
        ));
    }

    let year = two_digit_year(code, &code[PRODUCT_LEN..PRODUCT_LEN + 2])?;
    let month_number: u8 = code[PRODUCT_LEN + 2..DOMESTIC_LEN]
        .parse()
        .map_err(|_| ValidationError::invalid_symbol(code, "month is not numeric"))?;
    let month = Month::try_from(month_number).map_err(|_| {
        ValidationError::invalid_symbol(code, format!("month {month_number:02} outside 01-12"))
    })?;

    Ok((year, month))
}

fn international_delivery(
    code: &str,
    policy: MonthCodePolicy,
) -> Result<(i32, Month), ValidationError> {
    let letter = char::from(code.as_bytes()[PRODUCT_LEN]);
    let year_digits = code
        .get(PRODUCT_LEN + 1..PRODUCT_LEN + 3)
        .filter(|digits| digits.bytes().all(|b| b.is_ascii_digit()))
        .ok_or_else(|| {
            ValidationError::invalid_symbol(code, "international contracts use <product><M><YY>")
        })?;
    let year = two_digit_year(code, year_digits)?;

    let month = match (month_from_code(letter), policy) {
        (Some(month), _) => month,
        (None, MonthCodePolicy::Lenient) => {
            warn!(symbol = code, letter = %letter, "unknown month code, defaulting to January");
            Month::January
        }
        (None, MonthCodePolicy::Strict) => {
            return Err(ValidationError::invalid_symbol(
                code,
                format!("unknown month code '{letter}'"),
            ))
        }
    };

    Ok((year, month))
}

fn two_digit_year(code: &str, digits: &str) -> Result<i32, ValidationError> {
    digits
        .parse::<i32>()
        .map(|yy| 2000 + yy)
        .map_err(|_| ValidationError::invalid_symbol(code, "year is not numeric"))
}

/// Time to expiry, in 365-day years, as seen from an observation.
pub trait ExpiryModel: Send + Sync {
    fn years_to_expiry(&self, observed: CivilDateTime) -> f64;

    fn name(&self) -> &'static str;
}

/// Fractional distance to a contract's resolved expiry instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContractExpiry {
    pub expiry: CivilDateTime,
}

impl ContractExpiry {
    pub const fn new(expiry: CivilDateTime) -> Self {
        Self { expiry }
    }
}

impl ExpiryModel for ContractExpiry {
    fn years_to_expiry(&self, observed: CivilDateTime) -> f64 {
        observed.years_until(self.expiry)
    }

    fn name(&self) -> &'static str {
        "contract"
    }
}

/// Whole days from the observation date to 31 December of the same year.
///
/// Ignores the contract entirely; kept for comparing against the fixed
/// fraction-of-year horizon.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct YearEnd;

impl ExpiryModel for YearEnd {
    fn years_to_expiry(&self, observed: CivilDateTime) -> f64 {
        let date = observed.date();
        let days_left = time::util::days_in_year(date.year()) - date.ordinal();
        f64::from(days_left) / 365.0
    }

    fn name(&self) -> &'static str {
        "year_end"
    }
}

/// Configured choice of [`ExpiryModel`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpiryModelKind {
    #[default]
    Contract,
    YearEnd,
}

impl ExpiryModelKind {
    pub fn build(self, spec: &ContractSpec) -> Box<dyn ExpiryModel> {
        match self {
            Self::Contract => Box::new(ContractExpiry::new(spec.expiry)),
            Self::YearEnd => Box::new(YearEnd),
        }
    }
}

impl FromStr for ExpiryModelKind {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "contract" => Ok(Self::Contract),
            "year_end" => Ok(Self::YearEnd),
            _ => Err(ValidationError::InvalidValue {
                field: "expiry_model",
                value: value.to_owned(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    fn resolve_str(symbol: &str, policy: MonthCodePolicy) -> Result<ContractSpec, ValidationError> {
        resolve(&ContractSymbol::parse(symbol).expect("symbol"), policy)
    }

    #[test]
    fn resolves_domestic_symbols() {
        for (yy, mm) in [(24, 12), (23, 1), (0, 6), (99, 9)] {
            let symbol = format!("AU{yy:02}{mm:02}");
            let spec = resolve_str(&symbol, MonthCodePolicy::Lenient).expect("must resolve");
            let date = spec.expiry.date();
            assert_eq!(date.year(), 2000 + yy);
            assert_eq!(u8::from(date.month()), mm);
            assert_eq!(date.day(), 1);
            assert_eq!(spec.expiry.into_inner().time(), EXPIRY_CUTOFF);
            assert_eq!(spec.family, ContractFamily::Domestic);
            assert_eq!(spec.product, "AU");
        }
    }

    #[test]
    fn rejects_domestic_month_out_of_range() {
        for symbol in ["AU2413", "AU2400"] {
            let err = resolve_str(symbol, MonthCodePolicy::Lenient).expect_err("must fail");
            assert!(matches!(err, ValidationError::InvalidSymbol { .. }));
        }
    }

    #[test]
    fn rejects_malformed_domestic_symbols() {
        for symbol in ["AU241", "AU24123", "AU24A2"] {
            assert!(resolve_str(symbol, MonthCodePolicy::Lenient).is_err(), "{symbol}");
        }
    }

    #[test]
    fn maps_every_international_month_letter() {
        let letters = ['F', 'G', 'H', 'J', 'K', 'M', 'N', 'Q', 'U', 'V', 'X', 'Z'];
        for (index, letter) in letters.iter().enumerate() {
            let symbol = format!("GC{letter}24");
            let spec = resolve_str(&symbol, MonthCodePolicy::Strict).expect("must resolve");
            assert_eq!(usize::from(u8::from(spec.expiry.date().month())), index + 1);
            assert_eq!(spec.expiry.date().year(), 2024);
            assert_eq!(spec.family, ContractFamily::International);
        }
    }

    #[test]
    fn unknown_month_letter_defaults_to_january_when_lenient() {
        let spec = resolve_str("GCA24", MonthCodePolicy::Lenient).expect("lenient");
        assert_eq!(spec.expiry.date().month(), Month::January);

        let err = resolve_str("GCA24", MonthCodePolicy::Strict).expect_err("strict");
        assert!(matches!(err, ValidationError::InvalidSymbol { .. }));
    }

    #[test]
    fn international_symbols_allow_trailing_qualifiers() {
        let spec = resolve_str("GCZ23E.CMX", MonthCodePolicy::Lenient).expect("must resolve");
        assert_eq!(
            spec.expiry,
            CivilDateTime::new(datetime!(2023-12-01 02:30:00))
        );
    }

    #[test]
    fn rejects_bad_product_or_year() {
        for symbol in ["A12412", "GCZ2", "GCZAB"] {
            assert!(resolve_str(symbol, MonthCodePolicy::Lenient).is_err(), "{symbol}");
        }
    }

    #[test]
    fn contract_expiry_is_fractional_and_signed() {
        let model = ContractExpiry::new(CivilDateTime::new(datetime!(2024-02-01 02:30)));
        let t = model.years_to_expiry(CivilDateTime::new(datetime!(2024-01-02 09:00)));
        let expected_days = 29.0 + 17.5 / 24.0;
        assert!((t - expected_days / 365.0).abs() < 1e-12);

        let after = model.years_to_expiry(CivilDateTime::new(datetime!(2024-02-02 02:30)));
        assert!((after + 1.0 / 365.0).abs() < 1e-12);
    }

    #[test]
    fn year_end_counts_whole_days() {
        let t = YearEnd.years_to_expiry(CivilDateTime::new(datetime!(2024-12-30 23:00)));
        assert!((t - 1.0 / 365.0).abs() < 1e-12);
        let t = YearEnd.years_to_expiry(CivilDateTime::new(datetime!(2023-01-01 09:00)));
        assert!((t - 364.0 / 365.0).abs() < 1e-12);
    }
}
