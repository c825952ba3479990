//! CSV readers for price, rate and gap files.
//!
//! Headers are matched case-insensitively after trimming whitespace and a
//! UTF-8 byte-order mark. Cells are decoded lossily, so stray bytes in vendor
//! exports never abort a read. A price cell that does not parse becomes NaN and
//! is dropped later by the join; a row whose timestamp does not parse is
//! rejected, counted and logged.

use std::borrow::Cow;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::{ByteRecord, ReaderBuilder};
use tracing::{debug, warn};

use crate::{
    parse_date_key, BarSeries, CivilDateTime, CoreError, GapRecord, Ohlc, PriceBar,
    RateObservation, RateSeries, TimeSeries, ValidationError,
};

const TIMESTAMP_COLUMN: &str = "DateTime";
const BAR_COLUMNS: [&str; 5] = [TIMESTAMP_COLUMN, "open", "high", "low", "close"];
const RATE_COLUMNS: [&str; 2] = [TIMESTAMP_COLUMN, "OPEN"];
const GAP_COLUMNS: [&str; 5] = [
    TIMESTAMP_COLUMN,
    "gap_open",
    "gap_high",
    "gap_low",
    "gap_close",
];

/// A series read from disk plus the number of rows that were rejected.
#[derive(Debug, Clone, PartialEq)]
pub struct Ingested<T> {
    pub data: T,
    pub rejected_rows: usize,
}

/// Read an intraday OHLC file (benchmark or contract).
pub fn read_bars(path: &Path, name: &str) -> Result<Ingested<BarSeries>, CoreError> {
    read_bars_from(open(path)?, name)
}

pub fn read_bars_from<R: Read>(reader: R, name: &str) -> Result<Ingested<BarSeries>, CoreError> {
    let (rows, rejected_rows) = read_rows(reader, name, &BAR_COLUMNS, |cells| {
        let ts = CivilDateTime::parse(&cells[0])?;
        Ok(PriceBar::new(ts, ohlc(&cells[1..])))
    })?;
    Ok(Ingested {
        data: TimeSeries::new(name, rows),
        rejected_rows,
    })
}

/// Read a daily rate file (FX spot or funding rate); the rate is the `OPEN` column.
pub fn read_rates(path: &Path, name: &str) -> Result<Ingested<RateSeries>, CoreError> {
    read_rates_from(open(path)?, name)
}

pub fn read_rates_from<R: Read>(
    reader: R,
    name: &str,
) -> Result<Ingested<RateSeries>, CoreError> {
    let (rows, rejected_rows) = read_rows(reader, name, &RATE_COLUMNS, |cells| {
        let date = parse_date_key(&cells[0])?;
        Ok(RateObservation::new(date, number(&cells[1])))
    })?;
    Ok(Ingested {
        data: TimeSeries::new(name, rows),
        rejected_rows,
    })
}

/// Read a previously written gap file, keeping file order.
pub fn read_gaps(path: &Path) -> Result<Ingested<Vec<GapRecord>>, CoreError> {
    let name = path.display().to_string();
    read_gaps_from(open(path)?, &name)
}

pub fn read_gaps_from<R: Read>(
    reader: R,
    name: &str,
) -> Result<Ingested<Vec<GapRecord>>, CoreError> {
    let (data, rejected_rows) = read_rows(reader, name, &GAP_COLUMNS, |cells| {
        let ts = CivilDateTime::parse(&cells[0])?;
        Ok(GapRecord::new(ts, ohlc(&cells[1..])))
    })?;
    Ok(Ingested {
        data,
        rejected_rows,
    })
}

fn open(path: &Path) -> Result<File, CoreError> {
    File::open(path).map_err(|source| CoreError::io(path, source))
}

fn read_rows<R, T>(
    reader: R,
    series: &str,
    columns: &[&str],
    mut parse_row: impl FnMut(&[Cow<'_, str>]) -> Result<T, ValidationError>,
) -> Result<(Vec<T>, usize), CoreError>
where
    R: Read,
{
    let mut reader = ReaderBuilder::new()
        .flexible(true)
        .has_headers(true)
        .from_reader(reader);
    let indices = locate_columns(reader.byte_headers()?, series, columns)?;

    let mut rows = Vec::new();
    let mut rejected = 0usize;
    let mut record = ByteRecord::new();
    let mut line = 1usize;
    while reader.read_byte_record(&mut record)? {
        line += 1;
        let cells: Vec<Cow<'_, str>> = indices
            .iter()
            .map(|&index| String::from_utf8_lossy(record.get(index).unwrap_or_default()))
            .collect();
        match parse_row(&cells) {
            Ok(row) => rows.push(row),
            Err(error) => {
                rejected += 1;
                warn!(series, line, %error, "rejected input row");
            }
        }
    }

    debug!(series, rows = rows.len(), rejected, "read csv series");
    Ok((rows, rejected))
}

fn locate_columns(
    headers: &ByteRecord,
    series: &str,
    columns: &[&str],
) -> Result<Vec<usize>, ValidationError> {
    let names: Vec<String> = headers
        .iter()
        .map(|raw| {
            String::from_utf8_lossy(raw)
                .trim_start_matches('\u{feff}')
                .trim()
                .to_owned()
        })
        .collect();

    columns
        .iter()
        .map(|column| {
            names
                .iter()
                .position(|name| name.eq_ignore_ascii_case(column))
                .ok_or_else(|| ValidationError::missing_field(series, *column))
        })
        .collect()
}

fn number(cell: &str) -> f64 {
    cell.trim().parse().unwrap_or(f64::NAN)
}

fn ohlc(cells: &[Cow<'_, str>]) -> Ohlc {
    Ohlc::new(
        number(&cells[0]),
        number(&cells[1]),
        number(&cells[2]),
        number(&cells[3]),
    )
}

#[cfg(test)]
mod tests {
    use time::macros::date;

    use super::*;

    #[test]
    fn reads_bars_with_loose_headers() {
        let csv = "\u{feff}datetime, Open ,HIGH,low,close,volume\n\
                   2024-01-02 09:01:00,2001,2003,2000,2002,10\n\
                   2024-01-02 09:00:00,2000,2002,1999,2001,12\n\
                   2024/01/02 09:02,2002,,2001,2002.5,3\n";
        let bars = read_bars_from(csv.as_bytes(), "SPTAUUSDOZ").expect("bars");

        assert_eq!(bars.rejected_rows, 0);
        assert_eq!(bars.data.len(), 3);
        let first = bars.data.values()[0];
        assert_eq!(first.ts.to_string(), "2024-01-02 09:00:00");
        assert_eq!(first.prices.close, 2001.0);
        assert!(bars.data.values()[2].prices.high.is_nan());
    }

    #[test]
    fn rejects_rows_with_bad_timestamps() {
        let csv = "DateTime,open,high,low,close\n\
                   not-a-time,1,1,1,1\n\
                   2024-01-02,1,1,1,1\n";
        let bars = read_bars_from(csv.as_bytes(), "AU2412").expect("bars");
        assert_eq!(bars.rejected_rows, 1);
        assert_eq!(bars.data.values()[0].ts.to_string(), "2024-01-02 00:00:00");
    }

    #[test]
    fn reads_rates_from_open_column() {
        let csv = "DateTime,OPEN,CLOSE\n\
                   2024-01-02,7.1,7.2\n\
                   2024-01-03 00:00:00,7.15,7.2\n\
                   2024-01-04,n/a,7.3\n";
        let rates = read_rates_from(csv.as_bytes(), "USDCNY").expect("rates");

        assert_eq!(rates.data.len(), 3);
        assert_eq!(rates.data.rate_on(date!(2024-01-03)), Some(7.15));
        assert!(rates.data.rate_on(date!(2024-01-04)).is_some_and(f64::is_nan));
    }

    #[test]
    fn missing_column_is_reported() {
        let csv = "DateTime,CLOSE\n2024-01-02,7.1\n";
        let err = read_rates_from(csv.as_bytes(), "funding").expect_err("missing OPEN");
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::MissingField { ref field, .. }) if field == "OPEN"
        ));
    }

    #[test]
    fn reads_gap_files_with_empty_cells() {
        let csv = "DateTime,gap_open,gap_high,gap_low,gap_close\n\
                   2024-01-02 09:00:00,1.5,,0.5,-0.25\n";
        let gaps = read_gaps_from(csv.as_bytes(), "price_gaps_AU2412.csv").expect("gaps");
        assert_eq!(gaps.data.len(), 1);
        assert!(gaps.data[0].gap_high.is_nan());
        assert_eq!(gaps.data[0].gap_close, -0.25);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = read_bars(&dir.path().join("absent.csv"), "absent").expect_err("io");
        assert!(matches!(err, CoreError::Io { .. }));
    }
}
