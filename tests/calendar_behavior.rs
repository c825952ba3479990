//! Behavior tests for contract symbol resolution and time-to-expiry models.

use aurgap_core::calendar::{self, ContractExpiry, ExpiryModel, YearEnd};
use aurgap_core::{
    CivilDateTime, ContractFamily, ContractSymbol, MonthCodePolicy, ValidationError,
};
use aurgap_tests::assert_close;

fn spec(code: &str, policy: MonthCodePolicy) -> Result<aurgap_core::ContractSpec, ValidationError> {
    let symbol = ContractSymbol::parse(code)?;
    calendar::resolve(&symbol, policy)
}

fn at(text: &str) -> CivilDateTime {
    CivilDateTime::parse(text).expect("timestamp")
}

#[test]
fn when_user_resolves_a_domestic_code_expiry_is_the_delivery_month_start() {
    let spec = spec("AU2412", MonthCodePolicy::Lenient).expect("spec");

    assert_eq!(spec.family, ContractFamily::Domestic);
    assert_eq!(spec.product, "AU");
    assert_eq!(spec.expiry, at("2024-12-01 02:30:00"));
}

#[test]
fn when_user_resolves_an_international_code_the_exchange_suffix_is_ignored() {
    let spec = spec("GCZ23E.CMX", MonthCodePolicy::Lenient).expect("spec");

    assert_eq!(spec.symbol.as_str(), "GCZ23E");
    assert_eq!(spec.family, ContractFamily::International);
    assert_eq!(spec.expiry, at("2023-12-01 02:30:00"));
}

#[test]
fn when_a_domestic_month_is_out_of_range_resolution_fails() {
    let error = spec("AU2413", MonthCodePolicy::Lenient).expect_err("month 13");

    assert!(matches!(error, ValidationError::InvalidSymbol { .. }));
}

#[test]
fn when_a_month_letter_is_unknown_the_policy_decides() {
    // Given: a letter outside the futures month alphabet
    let lenient = spec("GCA24E", MonthCodePolicy::Lenient).expect("lenient");
    let strict = spec("GCA24E", MonthCodePolicy::Strict);

    // Then: lenient falls back to January, strict rejects
    assert_eq!(lenient.expiry, at("2024-01-01 02:30:00"));
    assert!(matches!(strict, Err(ValidationError::InvalidSymbol { .. })));
}

#[test]
fn when_an_observation_is_after_expiry_time_to_expiry_is_negative() {
    let model = ContractExpiry::new(at("2024-12-01 02:30:00"));

    let before = model.years_to_expiry(at("2024-11-30 02:30:00"));
    let after = model.years_to_expiry(at("2024-12-02 02:30:00"));

    assert_close(before, 1.0 / 365.0, 1e-12);
    assert_close(after, -1.0 / 365.0, 1e-12);
}

#[test]
fn when_the_year_end_model_is_used_only_whole_days_count() {
    let model = YearEnd;

    assert_close(model.years_to_expiry(at("2023-12-31 23:59:00")), 0.0, 1e-12);
    assert_close(model.years_to_expiry(at("2023-01-01 00:00:00")), 364.0 / 365.0, 1e-12);
    assert_close(model.years_to_expiry(at("2023-01-01 18:00:00")), 364.0 / 365.0, 1e-12);
}
