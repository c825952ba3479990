//! Observed minus parity forward, per field and per timestamp.

use crate::fair_value::{synthesize, QuoteConvention};
use crate::{GapRecord, JoinedRecord};

/// Gap for a single joined record under a concrete quote convention.
pub fn gap_for(record: &JoinedRecord, convention: QuoteConvention) -> GapRecord {
    let fair = synthesize(record);
    let observed = convention.observed(record);
    GapRecord::new(
        record.ts,
        observed.zip_with(fair.forward, |observed, forward| observed - forward),
    )
}

/// Gap series in the order of `records` (the join's ascending timestamp order).
pub fn compute_gaps(records: &[JoinedRecord], convention: QuoteConvention) -> Vec<GapRecord> {
    records
        .iter()
        .map(|record| gap_for(record, convention))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fair_value::{convert_spot, parity_forward};
    use crate::{CivilDateTime, Ohlc, PriceField};

    fn record(ts: &str, contract_close: f64) -> JoinedRecord {
        JoinedRecord {
            ts: CivilDateTime::parse(ts).expect("timestamp"),
            benchmark: Ohlc::new(2000.0, 2012.0, 1995.0, 2004.0),
            fx_rate: 7.1,
            funding_rate: 2.0,
            t: 0.08,
            contract: Ohlc::new(459.0, 462.0, 458.0, contract_close),
        }
    }

    #[test]
    fn gap_is_observed_minus_forward() {
        let joined = record("2024-01-02 09:00:00", 460.0);
        let gap = gap_for(&joined, QuoteConvention::PerGram);

        for field in PriceField::ALL {
            let forward = parity_forward(
                convert_spot(joined.benchmark.get(field), joined.fx_rate),
                joined.funding_rate,
                joined.t,
            );
            let expected = joined.contract.get(field) - forward;
            assert!((gap.gap(field) - expected).abs() <= f64::EPSILON * expected.abs().max(1.0));
        }
    }

    #[test]
    fn preserves_record_order() {
        let records = [
            record("2024-01-02 09:00:00", 460.0),
            record("2024-01-02 09:01:00", 461.0),
        ];
        let gaps = compute_gaps(&records, QuoteConvention::PerGram);
        assert_eq!(gaps.len(), 2);
        assert!(gaps[0].ts < gaps[1].ts);
        assert!((gaps[1].gap_close - gaps[0].gap_close - 1.0).abs() < 1e-9);
    }
}
