//! CSV writers for gap series and significance reports.
//!
//! Missing values (NaN) are written as empty cells.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use csv::Writer;
use tracing::info;

use crate::{
    ContractFamily, ContractSymbol, CoreError, GapRecord, PriceField, SignificanceReport,
};

const GAP_FILE_PREFIX: &str = "price_gaps_";
const GAP_HEADER: [&str; 5] = ["DateTime", "gap_open", "gap_high", "gap_low", "gap_close"];
const STAT_COLUMNS: [&str; 6] = ["mean", "std_dev", "std_err", "t_stat", "p_value", "n"];

/// `price_gaps_<CONTRACT>.csv`
pub fn gap_file_name(contract: &ContractSymbol) -> String {
    format!("{GAP_FILE_PREFIX}{contract}.csv")
}

/// `<family>_t_test_results.csv`
pub fn report_file_name(family: ContractFamily) -> String {
    format!("{}_t_test_results.csv", family.as_str())
}

/// Whether `path` looks like a file written by [`write_gaps`].
pub fn is_gap_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.starts_with(GAP_FILE_PREFIX) && name.ends_with(".csv"))
}

pub fn write_gaps(path: &Path, gaps: &[GapRecord]) -> Result<(), CoreError> {
    let file = create(path)?;
    write_gaps_to(file, gaps)?;
    info!(path = %path.display(), rows = gaps.len(), "wrote gap series");
    Ok(())
}

pub fn write_gaps_to<W: Write>(writer: W, gaps: &[GapRecord]) -> Result<(), CoreError> {
    let mut writer = Writer::from_writer(writer);
    writer.write_record(GAP_HEADER)?;
    for gap in gaps {
        let mut row = vec![gap.ts.to_string()];
        row.extend(PriceField::ALL.map(|field| cell(gap.gap(field))));
        writer.write_record(&row)?;
    }
    flush(writer)
}

/// Write the report rows of one family. Returns the file path.
pub fn write_report(
    dir: &Path,
    report: &SignificanceReport,
    family: ContractFamily,
) -> Result<PathBuf, CoreError> {
    let path = dir.join(report_file_name(family));
    write_report_to(create(&path)?, report, family)?;
    info!(path = %path.display(), family = family.as_str(), "wrote significance report");
    Ok(path)
}

/// One line per contract: `Contract` followed by the statistics of each field.
pub fn write_report_to<W: Write>(
    writer: W,
    report: &SignificanceReport,
    family: ContractFamily,
) -> Result<(), CoreError> {
    let mut writer = Writer::from_writer(writer);
    writer.write_record(report_header())?;
    for (contract, rows) in report.contracts(family) {
        let mut line = vec![contract.to_string()];
        for field in PriceField::ALL {
            match rows.iter().find(|row| row.field == field) {
                Some(row) => {
                    let stats = &row.stats;
                    line.extend(
                        [
                            stats.mean,
                            stats.std_dev,
                            stats.std_err,
                            stats.statistic,
                            stats.p_value,
                        ]
                        .map(cell),
                    );
                    line.push(stats.n.to_string());
                }
                None => line.extend(STAT_COLUMNS.map(|_| String::new())),
            }
        }
        writer.write_record(&line)?;
    }
    flush(writer)
}

fn report_header() -> Vec<String> {
    let mut header = vec!["Contract".to_owned()];
    for field in PriceField::ALL {
        header.extend(STAT_COLUMNS.map(|stat| format!("{}_{stat}", field.as_str())));
    }
    header
}

fn cell(value: f64) -> String {
    if value.is_nan() {
        String::new()
    } else {
        value.to_string()
    }
}

fn create(path: &Path) -> Result<File, CoreError> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| CoreError::io(parent, source))?;
    }
    File::create(path).map_err(|source| CoreError::io(path, source))
}

fn flush<W: Write>(mut writer: Writer<W>) -> Result<(), CoreError> {
    writer
        .flush()
        .map_err(|source| CoreError::io("<csv output>", source))
}
