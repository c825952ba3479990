//! In-memory time-series store.
//!
//! A [`TimeSeries`] holds values sorted by key with at most one value per key.
//! When the same key appears more than once the first occurrence in input order
//! is kept and the rest are discarded.

use std::fmt::Debug;

use time::{Date, Duration};
use tracing::warn;

use crate::{CivilDateTime, PriceBar, RateObservation};

/// Ordering key of a series: an intraday timestamp or a calendar date.
pub trait SeriesKey: Copy + Ord + Debug {
    /// Absolute distance between two keys.
    fn distance(self, other: Self) -> Duration;
}

impl SeriesKey for CivilDateTime {
    fn distance(self, other: Self) -> Duration {
        (self.into_inner() - other.into_inner()).abs()
    }
}

impl SeriesKey for Date {
    fn distance(self, other: Self) -> Duration {
        (self - other).abs()
    }
}

/// A value that knows its own series key.
pub trait Keyed {
    type Key: SeriesKey;

    fn key(&self) -> Self::Key;
}

impl Keyed for PriceBar {
    type Key = CivilDateTime;

    fn key(&self) -> Self::Key {
        self.ts
    }
}

impl Keyed for RateObservation {
    type Key = Date;

    fn key(&self) -> Self::Key {
        self.date
    }
}

/// Sorted, key-unique series of observations.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries<T> {
    name: String,
    values: Vec<T>,
    duplicates_dropped: usize,
}

/// Intraday price series (benchmark spot or traded contract).
pub type BarSeries = TimeSeries<PriceBar>;

/// Daily rate series (FX spot or funding rate).
pub type RateSeries = TimeSeries<RateObservation>;

impl<T: Keyed> TimeSeries<T> {
    pub fn new(name: impl Into<String>, values: impl IntoIterator<Item = T>) -> Self {
        let name = name.into();
        let mut values: Vec<T> = values.into_iter().collect();
        // Stable: equal keys keep input order, so dedup retains the first occurrence.
        values.sort_by_key(T::key);
        let before = values.len();
        values.dedup_by_key(|value| value.key());
        let duplicates_dropped = before - values.len();
        if duplicates_dropped > 0 {
            warn!(
                series = %name,
                duplicates = duplicates_dropped,
                "duplicate keys dropped, first occurrence kept"
            );
        }

        Self {
            name,
            values,
            duplicates_dropped,
        }
    }

    pub fn empty(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: Vec::new(),
            duplicates_dropped: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn duplicates_dropped(&self) -> usize {
        self.duplicates_dropped
    }

    pub fn values(&self) -> &[T] {
        &self.values
    }

    /// Values in ascending key order.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.values.iter()
    }

    pub fn first_key(&self) -> Option<T::Key> {
        self.values.first().map(T::key)
    }

    pub fn last_key(&self) -> Option<T::Key> {
        self.values.last().map(T::key)
    }

    /// Exact-key lookup.
    pub fn get(&self, key: T::Key) -> Option<&T> {
        self.values
            .binary_search_by_key(&key, T::key)
            .ok()
            .map(|index| &self.values[index])
    }

    /// Latest value with a key at or before `key`.
    pub fn at_or_before(&self, key: T::Key) -> Option<&T> {
        let upper = self.values.partition_point(|value| value.key() <= key);
        upper.checked_sub(1).map(|index| &self.values[index])
    }

    /// Value whose key is closest to `key`; ties go to the earlier key.
    pub fn nearest(&self, key: T::Key) -> Option<&T> {
        let split = self.values.partition_point(|value| value.key() < key);
        let after = self.values.get(split);
        let before = split.checked_sub(1).and_then(|index| self.values.get(index));
        match (before, after) {
            (Some(before), Some(after)) => {
                if after.key().distance(key) < before.key().distance(key) {
                    Some(after)
                } else {
                    Some(before)
                }
            }
            (before, after) => before.or(after),
        }
    }
}

impl<'a, T> IntoIterator for &'a TimeSeries<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}

impl RateSeries {
    /// Rate observed on `date`, if any.
    pub fn rate_on(&self, date: Date) -> Option<f64> {
        self.get(date).map(|observation| observation.rate)
    }
}
