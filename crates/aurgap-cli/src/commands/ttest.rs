use std::path::PathBuf;

use aurgap_core::export;
use aurgap_core::pipeline::scan_gap_directory;
use aurgap_core::{ContractFamily, SignificanceResult};
use serde::Serialize;

use crate::cli::TtestArgs;
use crate::error::CliError;

use super::{batch, CommandResult};

#[derive(Debug, Serialize)]
struct TtestResponseData<'a> {
    files: &'a [PathBuf],
    results: &'a [SignificanceResult],
    reports: Vec<PathBuf>,
}

pub fn run(args: &TtestArgs) -> Result<CommandResult, CliError> {
    let scan = scan_gap_directory(&args.dir)?;

    let reports = match &args.output_dir {
        Some(dir) => ContractFamily::ALL
            .into_iter()
            .map(|family| export::write_report(dir, &scan.report, family))
            .collect::<Result<Vec<_>, _>>()?,
        None => Vec::new(),
    };

    let data = TtestResponseData {
        files: &scan.files,
        results: scan.report.rows(),
        reports,
    };

    let mut result = CommandResult::ok(serde_json::to_value(&data)?)
        .with_warnings(scan.skipped.iter().cloned())
        .with_tables(batch::report_tables(&scan.report));
    if scan.files.is_empty() {
        result = result.with_warning(format!(
            "no price_gaps_*.csv files found in {}",
            args.dir.display()
        ));
    }

    Ok(result)
}
