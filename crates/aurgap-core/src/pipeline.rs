//! Batch pipeline: one parameterized run per contract, merged into a report.
//!
//! Reference series are loaded once and shared read-only. Every contract
//! produces a [`ContractOutcome`] whatever happens to it: failures are
//! recorded as [`ContractIssue`]s next to an undefined result group, so a
//! batch never aborts because of a single contract.

use std::fmt::{Display, Formatter};
use std::fs;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::calendar::{self, ContractSpec, ExpiryModelKind, MonthCodePolicy};
use crate::export;
use crate::fair_value::QuoteConvention;
use crate::gap::compute_gaps;
use crate::ingest::{self, Ingested};
use crate::join::{align, JoinInputs, JoinStats};
use crate::significance::{test_gap_series, undefined_results, SignificanceReport, SignificanceResult};
use crate::{
    BarSeries, ContractFamily, ContractSymbol, CoreError, GapRecord, Keyed, RateSeries, TimeSeries,
    ValidationError,
};

/// Benchmark, FX and funding series shared by every contract of a batch.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceSeries {
    pub benchmark: BarSeries,
    pub fx: RateSeries,
    pub funding: RateSeries,
    /// Load problems that did not stop the run (rejected rows, missing columns).
    pub warnings: Vec<String>,
}

impl ReferenceSeries {
    pub fn new(benchmark: BarSeries, fx: RateSeries, funding: RateSeries) -> Self {
        Self {
            benchmark,
            fx,
            funding,
            warnings: Vec::new(),
        }
    }

    /// Load the three reference files.
    ///
    /// A missing required column leaves that series empty, so every record
    /// depending on it is excluded; unreadable files are an error.
    pub fn load(benchmark: &Path, fx: &Path, funding: &Path) -> Result<Self, CoreError> {
        let mut warnings = Vec::new();
        let benchmark = tolerate_missing_field(
            ingest::read_bars(benchmark, "benchmark"),
            "benchmark",
            &mut warnings,
        )?;
        let fx = tolerate_missing_field(ingest::read_rates(fx, "fx"), "fx", &mut warnings)?;
        let funding = tolerate_missing_field(
            ingest::read_rates(funding, "funding"),
            "funding",
            &mut warnings,
        )?;

        Ok(Self {
            benchmark,
            fx,
            funding,
            warnings,
        })
    }
}

fn tolerate_missing_field<T: Keyed>(
    loaded: Result<Ingested<TimeSeries<T>>, CoreError>,
    name: &str,
    warnings: &mut Vec<String>,
) -> Result<TimeSeries<T>, CoreError> {
    match loaded {
        Ok(ingested) => {
            if ingested.rejected_rows > 0 {
                warnings.push(format!(
                    "{name}: {} row(s) rejected",
                    ingested.rejected_rows
                ));
            }
            Ok(ingested.data)
        }
        Err(CoreError::Validation(error @ ValidationError::MissingField { .. })) => {
            warn!(series = name, %error, "series contributes no records");
            warnings.push(error.to_string());
            Ok(TimeSeries::empty(name))
        }
        Err(error) => Err(error),
    }
}

/// Category of a per-contract failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    InvalidSymbol,
    MissingField,
    EmptyJoinResult,
    Io,
}

impl IssueKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidSymbol => "invalid_symbol",
            Self::MissingField => "missing_field",
            Self::EmptyJoinResult => "empty_join_result",
            Self::Io => "io",
        }
    }
}

/// A failure confined to a single contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractIssue {
    pub kind: IssueKind,
    pub message: String,
}

impl ContractIssue {
    pub fn new(kind: IssueKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl Display for ContractIssue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind.as_str(), self.message)
    }
}

/// One traded contract's bars, plus any problem met while loading them.
#[derive(Debug, Clone, PartialEq)]
pub struct ContractInput {
    pub symbol: ContractSymbol,
    pub bars: BarSeries,
    pub issues: Vec<ContractIssue>,
}

impl ContractInput {
    pub fn new(symbol: ContractSymbol, bars: BarSeries) -> Self {
        Self {
            symbol,
            bars,
            issues: Vec::new(),
        }
    }

    /// Read a contract file, deriving its code from the file name.
    ///
    /// A name that is not a contract code becomes an `InvalidSymbol` issue
    /// under the raw file stem, and the file is not read.
    pub fn from_path(path: &Path) -> Self {
        match ContractSymbol::from_path(path) {
            Ok(symbol) => Self::load(path, symbol),
            Err(error) => Self::invalid(ContractSymbol::unparsed_from_path(path), &error),
        }
    }

    /// A contract that cannot be resolved, kept so it still gets a result group.
    pub fn invalid(label: ContractSymbol, error: &ValidationError) -> Self {
        warn!(contract = %label, %error, "contract name rejected");
        Self {
            bars: TimeSeries::empty(label.as_str()),
            issues: vec![ContractIssue::new(IssueKind::InvalidSymbol, error.to_string())],
            symbol: label,
        }
    }

    fn has_invalid_symbol(&self) -> bool {
        self.issues
            .iter()
            .any(|issue| issue.kind == IssueKind::InvalidSymbol)
    }

    /// Read a contract file. Unreadable files and missing columns become
    /// issues and leave the series empty.
    pub fn load(path: &Path, symbol: ContractSymbol) -> Self {
        let name = symbol.to_string();
        match ingest::read_bars(path, &name) {
            Ok(ingested) => {
                if ingested.rejected_rows > 0 {
                    warn!(
                        contract = %symbol,
                        rejected = ingested.rejected_rows,
                        "contract rows rejected"
                    );
                }
                Self::new(symbol, ingested.data)
            }
            Err(error) => {
                let kind = match &error {
                    CoreError::Validation(ValidationError::MissingField { .. }) => {
                        IssueKind::MissingField
                    }
                    _ => IssueKind::Io,
                };
                warn!(contract = %symbol, %error, "contract series unavailable");
                Self {
                    bars: TimeSeries::empty(name),
                    symbol,
                    issues: vec![ContractIssue::new(kind, error.to_string())],
                }
            }
        }
    }
}

/// How contracts of a batch are scheduled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Execution {
    Sequential,
    #[default]
    Parallel,
}

/// Everything produced for one contract.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContractOutcome {
    pub symbol: ContractSymbol,
    pub family: ContractFamily,
    pub spec: Option<ContractSpec>,
    pub join: JoinStats,
    #[serde(skip)]
    pub gaps: Vec<GapRecord>,
    pub results: Vec<SignificanceResult>,
    pub issues: Vec<ContractIssue>,
}

impl ContractOutcome {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    fn unresolved(symbol: ContractSymbol, family: ContractFamily, issues: Vec<ContractIssue>) -> Self {
        Self {
            results: undefined_results(&symbol, family),
            symbol,
            family,
            spec: None,
            join: JoinStats::default(),
            gaps: Vec::new(),
            issues,
        }
    }
}

/// Settings shared by every contract of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GapPipeline {
    pub expiry_model: ExpiryModelKind,
    pub quote_convention: QuoteConvention,
    pub month_code_policy: MonthCodePolicy,
    pub execution: Execution,
}

impl GapPipeline {
    pub fn run_contract(&self, refs: &ReferenceSeries, input: &ContractInput) -> ContractOutcome {
        let symbol = input.symbol.clone();
        let family = calendar::detect_family(&symbol).unwrap_or(ContractFamily::Domestic);
        let mut issues = input.issues.clone();

        if input.has_invalid_symbol() {
            return ContractOutcome::unresolved(symbol, family, issues);
        }
        let spec = match calendar::resolve(&symbol, self.month_code_policy) {
            Ok(spec) => spec,
            Err(error) => {
                warn!(contract = %symbol, %error, "contract skipped");
                issues.push(ContractIssue::new(IssueKind::InvalidSymbol, error.to_string()));
                return ContractOutcome::unresolved(symbol, family, issues);
            }
        };

        let expiry = self.expiry_model.build(&spec);
        let aligned = align(
            JoinInputs {
                benchmark: &refs.benchmark,
                fx: &refs.fx,
                funding: &refs.funding,
                contract: &input.bars,
            },
            expiry.as_ref(),
        );
        if aligned.records.is_empty() {
            warn!(contract = %symbol, "no records survived the join");
            issues.push(ContractIssue::new(
                IssueKind::EmptyJoinResult,
                format!("no timestamp of {symbol} matched every input series"),
            ));
        }

        let gaps = compute_gaps(&aligned.records, self.quote_convention.resolve(spec.family));
        let results = test_gap_series(&symbol, spec.family, &gaps);
        info!(
            contract = %symbol,
            family = spec.family.as_str(),
            expiry = %spec.expiry,
            records = gaps.len(),
            "contract processed"
        );

        ContractOutcome {
            symbol,
            family: spec.family,
            spec: Some(spec),
            join: aligned.stats,
            gaps,
            results,
            issues,
        }
    }

    /// Run every contract; outcomes keep the order of `inputs` either way.
    pub fn run_batch(&self, refs: &ReferenceSeries, inputs: &[ContractInput]) -> BatchReport {
        let outcomes: Vec<ContractOutcome> = match self.execution {
            Execution::Sequential => inputs
                .iter()
                .map(|input| self.run_contract(refs, input))
                .collect(),
            Execution::Parallel => inputs
                .par_iter()
                .map(|input| self.run_contract(refs, input))
                .collect(),
        };
        BatchReport::new(outcomes)
    }
}

/// Outcomes of a batch and the significance rows merged from them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchReport {
    pub outcomes: Vec<ContractOutcome>,
    pub report: SignificanceReport,
}

impl BatchReport {
    pub fn new(outcomes: Vec<ContractOutcome>) -> Self {
        let mut report = SignificanceReport::new();
        for outcome in &outcomes {
            report.extend(outcome.results.iter().cloned());
        }
        Self { outcomes, report }
    }

    pub fn issues(&self) -> impl Iterator<Item = (&ContractSymbol, &ContractIssue)> {
        self.outcomes
            .iter()
            .flat_map(|outcome| outcome.issues.iter().map(move |issue| (&outcome.symbol, issue)))
    }

    pub fn has_issues(&self) -> bool {
        self.issues().next().is_some()
    }

    /// Write one gap file per contract that has gaps, and one report per family.
    pub fn write_outputs(&self, dir: &Path) -> Result<Vec<PathBuf>, CoreError> {
        let mut written = Vec::new();
        for outcome in self.outcomes.iter().filter(|outcome| !outcome.gaps.is_empty()) {
            let path = dir.join(export::gap_file_name(&outcome.symbol));
            export::write_gaps(&path, &outcome.gaps)?;
            written.push(path);
        }
        for family in ContractFamily::ALL {
            written.push(export::write_report(dir, &self.report, family)?);
        }
        Ok(written)
    }
}

/// Significance over gap files already on disk.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GapDirectoryScan {
    pub files: Vec<PathBuf>,
    pub report: SignificanceReport,
    pub skipped: Vec<String>,
}

/// Test every `price_gaps_*.csv` in `dir`, in file-name order.
///
/// A file that cannot be read contributes an undefined result group and a
/// note in `skipped`; only an unreadable directory is an error.
pub fn scan_gap_directory(dir: &Path) -> Result<GapDirectoryScan, CoreError> {
    let entries = fs::read_dir(dir).map_err(|source| CoreError::io(dir, source))?;
    let mut files = Vec::new();
    for entry in entries {
        let path = entry.map_err(|source| CoreError::io(dir, source))?.path();
        if export::is_gap_file(&path) {
            files.push(path);
        }
    }
    files.sort();

    let mut scan = GapDirectoryScan::default();
    for path in files {
        let symbol = match ContractSymbol::from_path(&path) {
            Ok(symbol) => symbol,
            Err(error) => {
                warn!(path = %path.display(), %error, "gap file skipped");
                scan.skipped.push(format!("{}: {error}", path.display()));
                continue;
            }
        };
        let family = calendar::detect_family(&symbol).unwrap_or(ContractFamily::Domestic);
        let gaps = match ingest::read_gaps(&path) {
            Ok(gaps) => gaps,
            Err(error) => {
                warn!(contract = %symbol, %error, "gap file unreadable");
                scan.skipped.push(format!("{}: {error}", path.display()));
                scan.report.extend(undefined_results(&symbol, family));
                continue;
            }
        };
        if gaps.rejected_rows > 0 {
            scan.skipped.push(format!(
                "{}: {} row(s) rejected",
                path.display(),
                gaps.rejected_rows
            ));
        }
        scan.report.extend(test_gap_series(&symbol, family, &gaps.data));
        scan.files.push(path);
    }

    info!(dir = %dir.display(), files = scan.files.len(), "scanned gap files");
    Ok(scan)
}
