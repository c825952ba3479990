//! Alignment of the four input series.
//!
//! Every stage is an inner join driven by the benchmark series:
//!
//! 1. benchmark timestamp truncated to its date ⋈ FX rate date
//! 2. the same date ⋈ funding rate date
//! 3. benchmark timestamp ⋈ contract bar timestamp (exact match)
//!
//! A benchmark observation without a partner at any stage is dropped, and so
//! is any surviving record with a missing (NaN) input. Output follows the
//! benchmark's ascending timestamp order.

use serde::Serialize;
use tracing::debug;

use crate::{BarSeries, ExpiryModel, JoinedRecord, RateSeries};

/// Read-only views of the four series joined for one contract.
#[derive(Debug, Clone, Copy)]
pub struct JoinInputs<'a> {
    pub benchmark: &'a BarSeries,
    pub fx: &'a RateSeries,
    pub funding: &'a RateSeries,
    pub contract: &'a BarSeries,
}

/// Row counts before the join and after each stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct JoinStats {
    pub benchmark_rows: usize,
    pub fx_rows: usize,
    pub funding_rows: usize,
    pub contract_rows: usize,
    pub after_fx: usize,
    pub after_funding: usize,
    pub after_contract: usize,
    pub incomplete_dropped: usize,
    pub joined: usize,
}

/// Joined records plus the bookkeeping of how they were obtained.
#[derive(Debug, Clone, PartialEq)]
pub struct Alignment {
    pub records: Vec<JoinedRecord>,
    pub stats: JoinStats,
}

/// Inner-join the inputs and attach time to expiry from `expiry`.
pub fn align(inputs: JoinInputs<'_>, expiry: &dyn ExpiryModel) -> Alignment {
    let mut stats = JoinStats {
        benchmark_rows: inputs.benchmark.len(),
        fx_rows: inputs.fx.len(),
        funding_rows: inputs.funding.len(),
        contract_rows: inputs.contract.len(),
        ..JoinStats::default()
    };
    let mut records = Vec::new();

    for bar in inputs.benchmark {
        let date = bar.ts.date();
        let Some(fx_rate) = inputs.fx.rate_on(date) else {
            continue;
        };
        stats.after_fx += 1;

        let Some(funding_rate) = inputs.funding.rate_on(date) else {
            continue;
        };
        stats.after_funding += 1;

        let Some(contract_bar) = inputs.contract.get(bar.ts) else {
            continue;
        };
        stats.after_contract += 1;

        let record = JoinedRecord {
            ts: bar.ts,
            benchmark: bar.prices,
            fx_rate,
            funding_rate,
            t: expiry.years_to_expiry(bar.ts),
            contract: contract_bar.prices,
        };
        if !record.is_complete() {
            stats.incomplete_dropped += 1;
            continue;
        }
        records.push(record);
    }

    stats.joined = records.len();
    debug!(
        contract = inputs.contract.name(),
        expiry_model = expiry.name(),
        benchmark = stats.benchmark_rows,
        after_fx = stats.after_fx,
        after_funding = stats.after_funding,
        after_contract = stats.after_contract,
        incomplete = stats.incomplete_dropped,
        joined = stats.joined,
        "aligned input series"
    );

    Alignment { records, stats }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use time::macros::{date, datetime};
    use time::PrimitiveDateTime;

    use super::*;
    use crate::{CivilDateTime, ContractExpiry, Ohlc, PriceBar, RateObservation, YearEnd};

    fn bar(ts: PrimitiveDateTime, price: f64) -> PriceBar {
        PriceBar::new(CivilDateTime::new(ts), Ohlc::splat(price))
    }

    fn fixture() -> (BarSeries, RateSeries, RateSeries, BarSeries) {
        let benchmark = BarSeries::new(
            "benchmark",
            [
                bar(datetime!(2024-01-02 09:00), 2000.0),
                bar(datetime!(2024-01-02 09:01), 2001.0),
                bar(datetime!(2024-01-03 09:00), 2002.0),
                bar(datetime!(2024-01-04 09:00), 2003.0),
                bar(datetime!(2024-01-05 09:00), 2004.0),
            ],
        );
        let fx = RateSeries::new(
            "fx",
            [
                RateObservation::new(date!(2024-01-02), 7.1),
                RateObservation::new(date!(2024-01-03), 7.1),
                RateObservation::new(date!(2024-01-05), 7.2),
            ],
        );
        let funding = RateSeries::new(
            "funding",
            [
                RateObservation::new(date!(2024-01-02), 2.0),
                RateObservation::new(date!(2024-01-05), 2.1),
            ],
        );
        let contract = BarSeries::new(
            "AU2402",
            [
                bar(datetime!(2024-01-02 09:00), 460.0),
                bar(datetime!(2024-01-02 09:01), 461.0),
                bar(datetime!(2024-01-02 09:02), 462.0),
                bar(datetime!(2024-01-05 09:00), 463.0),
            ],
        );
        (benchmark, fx, funding, contract)
    }

    #[test]
    fn inner_joins_every_stage() {
        let (benchmark, fx, funding, contract) = fixture();
        let inputs = JoinInputs {
            benchmark: &benchmark,
            fx: &fx,
            funding: &funding,
            contract: &contract,
        };
        let aligned = align(inputs, &YearEnd);

        let stamps: Vec<String> = aligned.records.iter().map(|r| r.ts.to_string()).collect();
        assert_eq!(
            stamps,
            vec![
                "2024-01-02 09:00:00",
                "2024-01-02 09:01:00",
                "2024-01-05 09:00:00"
            ]
        );
        assert_eq!(aligned.stats.after_fx, 4);
        assert_eq!(aligned.stats.after_funding, 3);
        assert_eq!(aligned.stats.after_contract, 3);
        assert_eq!(aligned.stats.joined, 3);
        assert_eq!(aligned.records[2].fx_rate, 7.2);
        assert_eq!(aligned.records[2].funding_rate, 2.1);
    }

    #[test]
    fn output_is_bounded_and_complete() {
        let (benchmark, fx, funding, contract) = fixture();
        let inputs = JoinInputs {
            benchmark: &benchmark,
            fx: &fx,
            funding: &funding,
            contract: &contract,
        };
        let aligned = align(inputs, &YearEnd);

        assert!(aligned.records.len() <= benchmark.len().min(contract.len()));
        let dates: BTreeSet<_> = aligned.records.iter().map(|r| r.ts.date()).collect();
        assert!(dates.len() <= fx.len().min(funding.len()));
        assert!(aligned.records.iter().all(JoinedRecord::is_complete));
        assert!(aligned.records.windows(2).all(|w| w[0].ts < w[1].ts));
    }

    #[test]
    fn records_with_missing_inputs_are_dropped() {
        let (benchmark, fx, _, _) = fixture();
        let funding = RateSeries::new(
            "funding",
            [RateObservation::new(date!(2024-01-02), f64::NAN)],
        );
        let contract = BarSeries::new(
            "AU2402",
            [PriceBar::new(
                CivilDateTime::new(datetime!(2024-01-02 09:00)),
                Ohlc::new(460.0, 461.0, f64::NAN, 460.5),
            )],
        );
        let inputs = JoinInputs {
            benchmark: &benchmark,
            fx: &fx,
            funding: &funding,
            contract: &contract,
        };
        let aligned = align(inputs, &YearEnd);

        assert!(aligned.records.is_empty());
        assert_eq!(aligned.stats.incomplete_dropped, 1);
    }

    #[test]
    fn attaches_time_to_expiry() {
        let (benchmark, fx, funding, contract) = fixture();
        let expiry = ContractExpiry::new(CivilDateTime::new(datetime!(2024-02-01 02:30)));
        let inputs = JoinInputs {
            benchmark: &benchmark,
            fx: &fx,
            funding: &funding,
            contract: &contract,
        };
        let aligned = align(inputs, &expiry);
        let first = aligned.records[0];
        assert!((first.t - (29.0 + 17.5 / 24.0) / 365.0).abs() < 1e-12);
    }
}
