//! # aurgap Core
//!
//! Fair-value gap analysis for gold futures under covered interest-rate parity.
//!
//! ## Overview
//!
//! A benchmark spot price quoted per troy ounce in a foreign currency is
//! converted at the day's FX rate and projected to each contract's expiry at
//! the domestic funding rate. The traded contract price minus that parity
//! forward is the gap; the mean gap of every contract and price field is
//! then tested against zero.
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`domain`] | Bars, rate observations, joined and gap records, symbols, timestamps |
//! | [`series`] | Sorted, key-unique in-memory time series |
//! | [`calendar`] | Symbol grammars, expiry resolution and time-to-expiry models |
//! | [`join`] | Inner-join alignment of benchmark, FX, funding and contract series |
//! | [`fair_value`] | Spot conversion, parity forward and quote conventions |
//! | [`gap`] | Observed minus forward, per field |
//! | [`significance`] | Mean-zero test, significance bands and reports |
//! | [`pipeline`] | Per-contract runs and sequential or parallel batches |
//! | [`ingest`] | CSV readers |
//! | [`export`] | CSV writers for gap files and reports |
//! | [`config`] | YAML batch configuration |
//! | [`envelope`] | Response envelope for machine-readable output |
//! | [`error`] | Core error types |
//!
//! ## Architecture
//!
//! ```text
//! benchmark ─┐
//! fx ────────┼─▶ join ─▶ fair value ─▶ gap ─▶ significance ─▶ report
//! funding ───┤     ▲
//! contract ──┘     └── calendar (expiry model)
//! ```

pub mod calendar;
pub mod config;
pub mod domain;
pub mod envelope;
pub mod error;
pub mod export;
pub mod fair_value;
pub mod gap;
pub mod ingest;
pub mod join;
pub mod pipeline;
pub mod series;
pub mod significance;

pub use calendar::{
    ContractExpiry, ContractFamily, ContractSpec, ExpiryModel, ExpiryModelKind, MonthCodePolicy,
    YearEnd,
};
pub use config::{BatchConfig, ContractEntry, WarehouseOptions};
pub use domain::{
    parse_date_key, CivilDateTime, ContractSymbol, GapRecord, JoinedRecord, Ohlc, PriceBar,
    PriceField, RateObservation,
};
pub use envelope::{Envelope, EnvelopeError, EnvelopeMeta};
pub use error::{CoreError, ValidationError};
pub use fair_value::{FairValue, QuoteConvention};
pub use join::{Alignment, JoinInputs, JoinStats};
pub use pipeline::{
    BatchReport, ContractInput, ContractIssue, ContractOutcome, Execution, GapDirectoryScan,
    GapPipeline, IssueKind, ReferenceSeries,
};
pub use series::{BarSeries, Keyed, RateSeries, SeriesKey, TimeSeries};
pub use significance::{
    FieldStatistics, SignificanceBand, SignificanceReport, SignificanceResult,
};
