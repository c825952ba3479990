//! # Domain Models
//!
//! Value types shared by every pipeline stage.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`PriceBar`] | OHLC bar keyed by a civil timestamp |
//! | [`RateObservation`] | Daily FX or funding rate |
//! | [`JoinedRecord`] | Benchmark, rates, time to expiry and contract prices at one timestamp |
//! | [`GapRecord`] | Observed minus parity forward price per field |
//! | [`ContractSymbol`] | Normalized contract code |
//! | [`CivilDateTime`] | Offset-free wall-clock timestamp |
//!
//! Nothing here is mutated after construction; each stage derives new values
//! from its inputs. Missing prices are carried as NaN until the join drops them.

mod models;
mod symbol;
mod timestamp;

pub use models::{GapRecord, JoinedRecord, Ohlc, PriceBar, PriceField, RateObservation};
pub use symbol::ContractSymbol;
pub use timestamp::{parse_date_key, CivilDateTime};
