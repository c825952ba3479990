//! Shared handling of batch results for `run` and `gap`.

use std::path::PathBuf;

use aurgap_core::{
    BatchReport, ContractFamily, ContractOutcome, EnvelopeError, SignificanceReport,
};
use aurgap_warehouse::{GapRow, RunLogEntry, RunPersistReport, SignificanceRow, Warehouse};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::error::CliError;

use super::CommandResult;

#[derive(Debug, Serialize)]
pub struct PersistSummary {
    pub run_id: String,
    pub db_path: PathBuf,
    #[serde(flatten)]
    pub written: RunPersistReport,
}

#[derive(Debug, Serialize)]
struct BatchResponseData<'a> {
    contracts: &'a [ContractOutcome],
    files: Vec<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warehouse: Option<PersistSummary>,
}

pub fn summarize(
    batch: &BatchReport,
    files: Vec<PathBuf>,
    warehouse: Option<PersistSummary>,
    warnings: Vec<String>,
) -> Result<CommandResult, CliError> {
    let data = BatchResponseData {
        contracts: &batch.outcomes,
        files,
        warehouse,
    };

    let errors = batch
        .issues()
        .map(|(symbol, issue)| {
            EnvelopeError::new(issue.kind.as_str(), issue.message.as_str())
                .map(|error| error.with_contract(symbol.as_str()))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(CommandResult::ok(serde_json::to_value(&data)?)
        .with_warnings(warnings)
        .with_errors(errors)
        .with_tables(report_tables(&batch.report)))
}

/// One titled grid per family that has rows.
pub fn report_tables(report: &SignificanceReport) -> Vec<String> {
    ContractFamily::ALL
        .into_iter()
        .filter(|family| report.family(*family).next().is_some())
        .map(|family| format!("{family} contracts\n{}", report.render_grid(family)))
        .collect()
}

/// Store gaps, significance rows and the run log under a fresh run id.
pub fn persist(warehouse: &Warehouse, batch: &BatchReport) -> Result<PersistSummary, CliError> {
    let run_id = Uuid::new_v4().simple().to_string();

    let gaps: Vec<GapRow> = batch
        .outcomes
        .iter()
        .flat_map(|outcome| {
            outcome.gaps.iter().map(move |gap| GapRow {
                contract: outcome.symbol.to_string(),
                ts: gap.ts.to_string(),
                gap_open: gap.gap_open,
                gap_high: gap.gap_high,
                gap_low: gap.gap_low,
                gap_close: gap.gap_close,
            })
        })
        .collect();

    let significance: Vec<SignificanceRow> = batch
        .report
        .rows()
        .iter()
        .map(|row| SignificanceRow {
            contract: row.contract.to_string(),
            family: row.family.as_str().to_owned(),
            field: row.field.as_str().to_owned(),
            n: u64::try_from(row.stats.n).unwrap_or(u64::MAX),
            mean: row.stats.mean,
            std_dev: row.stats.std_dev,
            std_err: row.stats.std_err,
            t_stat: row.stats.statistic,
            p_value: row.stats.p_value,
        })
        .collect();

    let log: Vec<RunLogEntry> = batch.outcomes.iter().map(run_log_entry).collect();

    let written = warehouse.record_run(&run_id, &gaps, &significance, &log)?;
    info!(
        run_id = run_id.as_str(),
        gap_rows = written.gap_rows,
        significance_rows = written.significance_rows,
        "persisted run"
    );

    Ok(PersistSummary {
        run_id,
        db_path: warehouse.db_path().to_path_buf(),
        written,
    })
}

fn run_log_entry(outcome: &ContractOutcome) -> RunLogEntry {
    let status = outcome
        .issues
        .first()
        .map_or("ok", |issue| issue.kind.as_str());
    let message = (!outcome.issues.is_empty()).then(|| {
        outcome
            .issues
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ")
    });

    RunLogEntry {
        contract: outcome.symbol.to_string(),
        status: status.to_owned(),
        records: u64::try_from(outcome.gaps.len()).unwrap_or(u64::MAX),
        message,
    }
}
