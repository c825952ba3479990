//! Large-sample test of "mean gap = 0" per contract and price field.
//!
//! The statistic is `mean / (std_dev / sqrt(n))` with the sample standard
//! deviation, and the two-tailed p-value comes from the standard normal
//! distribution. A zero or undefined standard error yields a NaN statistic
//! and p-value rather than an error.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal};
use tracing::warn;

use crate::{ContractFamily, ContractSymbol, GapRecord, PriceField};

/// Summary statistics and test outcome for one gap column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FieldStatistics {
    /// Number of non-missing observations.
    pub n: usize,
    pub mean: f64,
    pub std_dev: f64,
    pub std_err: f64,
    pub statistic: f64,
    pub p_value: f64,
}

impl FieldStatistics {
    /// Row for a series with nothing to test.
    pub const fn undefined(n: usize) -> Self {
        Self {
            n,
            mean: f64::NAN,
            std_dev: f64::NAN,
            std_err: f64::NAN,
            statistic: f64::NAN,
            p_value: f64::NAN,
        }
    }

    pub fn band(&self) -> SignificanceBand {
        SignificanceBand::from_p_value(self.p_value)
    }
}

/// Test whether the mean of `values` differs from zero. NaN and infinite
/// entries are skipped, so `n` counts finite values.
pub fn test_mean_zero(values: &[f64]) -> FieldStatistics {
    let sample: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    let n = sample.len();
    if n == 0 {
        return FieldStatistics::undefined(0);
    }

    let count = n as f64;
    let mean = sample.iter().sum::<f64>() / count;
    let std_dev = if n > 1 {
        let squares: f64 = sample.iter().map(|v| (v - mean).powi(2)).sum();
        (squares / (count - 1.0)).sqrt()
    } else {
        f64::NAN
    };
    let std_err = std_dev / count.sqrt();
    let statistic = if std_err == 0.0 || std_err.is_nan() {
        f64::NAN
    } else {
        mean / std_err
    };

    FieldStatistics {
        n,
        mean,
        std_dev,
        std_err,
        statistic,
        p_value: two_tailed_p_value(statistic),
    }
}

/// `2 * (1 - Φ(|z|))`; NaN in, NaN out.
pub fn two_tailed_p_value(statistic: f64) -> f64 {
    if statistic.is_nan() {
        return f64::NAN;
    }
    match Normal::new(0.0, 1.0) {
        Ok(standard) => 2.0 * (1.0 - standard.cdf(statistic.abs())),
        Err(_) => f64::NAN,
    }
}

/// Conventional star annotation for a p-value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignificanceBand {
    /// p < 0.01
    Strong,
    /// p < 0.05
    Moderate,
    /// p < 0.10
    Weak,
    /// p ≥ 0.10 or undefined
    None,
}

impl SignificanceBand {
    pub fn from_p_value(p_value: f64) -> Self {
        if p_value.is_nan() {
            Self::None
        } else if p_value < 0.01 {
            Self::Strong
        } else if p_value < 0.05 {
            Self::Moderate
        } else if p_value < 0.10 {
            Self::Weak
        } else {
            Self::None
        }
    }

    pub const fn stars(self) -> &'static str {
        match self {
            Self::Strong => "***",
            Self::Moderate => "**",
            Self::Weak => "*",
            Self::None => "",
        }
    }
}

/// Test outcome for one (contract, price field) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignificanceResult {
    pub contract: ContractSymbol,
    pub family: ContractFamily,
    pub field: PriceField,
    #[serde(flatten)]
    pub stats: FieldStatistics,
}

/// The four results (open, high, low, close) for one gap series.
pub fn test_gap_series(
    contract: &ContractSymbol,
    family: ContractFamily,
    gaps: &[GapRecord],
) -> Vec<SignificanceResult> {
    if gaps.is_empty() {
        warn!(contract = %contract, "empty gap series, reporting undefined statistics");
    }
    PriceField::ALL
        .into_iter()
        .map(|field| {
            let column: Vec<f64> = gaps.iter().map(|gap| gap.gap(field)).collect();
            SignificanceResult {
                contract: contract.clone(),
                family,
                field,
                stats: test_mean_zero(&column),
            }
        })
        .collect()
}

/// Undefined results for a contract that produced no gap series at all.
pub fn undefined_results(
    contract: &ContractSymbol,
    family: ContractFamily,
) -> Vec<SignificanceResult> {
    PriceField::ALL
        .into_iter()
        .map(|field| SignificanceResult {
            contract: contract.clone(),
            family,
            field,
            stats: FieldStatistics::undefined(0),
        })
        .collect()
}

/// All results of a batch, kept in contract input order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SignificanceReport {
    rows: Vec<SignificanceResult>,
}

impl SignificanceReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extend(&mut self, results: impl IntoIterator<Item = SignificanceResult>) {
        self.rows.extend(results);
    }

    pub fn rows(&self) -> &[SignificanceResult] {
        &self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn family(&self, family: ContractFamily) -> impl Iterator<Item = &SignificanceResult> {
        self.rows.iter().filter(move |row| row.family == family)
    }

    /// Contracts of `family` in first-seen order, each with its four rows.
    pub fn contracts(&self, family: ContractFamily) -> Vec<(&ContractSymbol, Vec<&SignificanceResult>)> {
        let mut grouped: Vec<(&ContractSymbol, Vec<&SignificanceResult>)> = Vec::new();
        for row in self.family(family) {
            match grouped.iter_mut().find(|(contract, _)| **contract == row.contract) {
                Some((_, rows)) => rows.push(row),
                None => grouped.push((&row.contract, vec![row])),
            }
        }
        grouped
    }

    /// Fixed-width grid of the rows of `family`, one line per field.
    pub fn render_grid(&self, family: ContractFamily) -> String {
        const HEADERS: [&str; 7] = [
            "Contract",
            "Price Type",
            "Mean",
            "Std Dev",
            "Std Err",
            "t-stat",
            "p-value",
        ];

        let cells: Vec<[String; 7]> = self
            .family(family)
            .map(|row| {
                let stats = &row.stats;
                let p_value = if stats.p_value.is_nan() {
                    "nan".to_owned()
                } else {
                    format!("{:.6}{}", stats.p_value, stats.band().stars())
                };
                [
                    row.contract.to_string(),
                    row.field.label().to_owned(),
                    fixed(stats.mean, 6),
                    fixed(stats.std_dev, 6),
                    fixed(stats.std_err, 6),
                    fixed(stats.statistic, 4),
                    p_value,
                ]
            })
            .collect();

        let mut widths = HEADERS.map(str::len);
        for line in &cells {
            for (width, cell) in widths.iter_mut().zip(line) {
                *width = (*width).max(cell.chars().count());
            }
        }

        let mut out = String::new();
        rule(&mut out, &widths, '-');
        cells_line(&mut out, &widths, HEADERS.iter().copied());
        rule(&mut out, &widths, '=');
        for line in &cells {
            cells_line(&mut out, &widths, line.iter().map(String::as_str));
            rule(&mut out, &widths, '-');
        }
        out
    }
}

fn fixed(value: f64, precision: usize) -> String {
    if value.is_nan() {
        "nan".to_owned()
    } else {
        format!("{value:.precision$}")
    }
}

fn rule(out: &mut String, widths: &[usize], fill: char) {
    out.push('+');
    for width in widths {
        out.extend(std::iter::repeat(fill).take(width + 2));
        out.push('+');
    }
    out.push('\n');
}

fn cells_line<'a>(out: &mut String, widths: &[usize], cells: impl Iterator<Item = &'a str>) {
    out.push('|');
    for (&width, cell) in widths.iter().zip(cells) {
        let _ = write!(out, " {cell:<width$} |");
    }
    out.push('\n');
}
