//! # aurgap Warehouse
//!
//! DuckDB storage for gap series, significance results and the run log.
//!
//! Writes are parameterized and wrapped in a transaction; user SQL goes
//! through [`Warehouse::execute_query`], which accepts read-only statements
//! and enforces row and time limits.
//!
//! ```rust,no_run
//! use aurgap_warehouse::{QueryGuardrails, Warehouse};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let warehouse = Warehouse::open_default()?;
//!     let result = warehouse.execute_query(
//!         "SELECT * FROM vw_significant_fields",
//!         QueryGuardrails::default(),
//!     )?;
//!     println!("{} significant fields", result.row_count);
//!     Ok(())
//! }
//! ```
//!
//! ## Tables
//!
//! | Table | Description |
//! |-------|-------------|
//! | `gap_series` | Gap per contract and timestamp |
//! | `significance_results` | One row per run, contract and price field |
//! | `run_log` | Outcome of every contract of every run |
//!
//! ## Views
//!
//! | View | Description |
//! |------|-------------|
//! | `vw_gap_daily` | Daily mean gaps per contract |
//! | `vw_significant_fields` | Results with `p_value < 0.05` |

pub mod duckdb;
pub mod migrations;
pub mod views;

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use ::duckdb::types::Value as DuckValue;
use ::duckdb::Connection;
use ::duckdb::ToSql;
use serde::Serialize;
use serde_json::{Number, Value};
use thiserror::Error;

pub use self::duckdb::{AccessMode, DuckDbConnectionManager, PooledConnection};

/// Errors that can occur during warehouse operations.
#[derive(Debug, Error)]
pub enum WarehouseError {
    #[error(transparent)]
    DuckDb(#[from] ::duckdb::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Query was rejected by the read-only or guardrail policy.
    #[error("query rejected: {0}")]
    QueryRejected(String),

    #[error("query timed out after {timeout_ms}ms")]
    QueryTimeout { timeout_ms: u64 },
}

/// Location and pool size of the warehouse database.
#[derive(Debug, Clone)]
pub struct WarehouseConfig {
    /// Root directory for aurgap data.
    pub aurgap_home: PathBuf,
    pub db_path: PathBuf,
    pub max_pool_size: usize,
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        Self::in_home(resolve_aurgap_home())
    }
}

impl WarehouseConfig {
    /// `<home>/warehouse.duckdb`.
    pub fn in_home(aurgap_home: PathBuf) -> Self {
        let db_path = aurgap_home.join("warehouse.duckdb");
        Self {
            aurgap_home,
            db_path,
            max_pool_size: 4,
        }
    }

    /// Explicit database file; the home becomes its directory.
    pub fn at_path(db_path: PathBuf) -> Self {
        let aurgap_home = db_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Self {
            aurgap_home,
            db_path,
            max_pool_size: 4,
        }
    }
}

/// Guardrails for user queries.
#[derive(Debug, Clone, Copy)]
pub struct QueryGuardrails {
    pub max_rows: usize,
    pub query_timeout_ms: u64,
}

impl Default for QueryGuardrails {
    fn default() -> Self {
        Self {
            max_rows: 10_000,
            query_timeout_ms: 5_000,
        }
    }
}

impl QueryGuardrails {
    fn timeout(self) -> Duration {
        Duration::from_millis(self.query_timeout_ms.max(1))
    }

    fn validate(self) -> Result<(), WarehouseError> {
        if self.max_rows == 0 {
            return Err(WarehouseError::QueryRejected(String::from(
                "--max-rows must be greater than zero",
            )));
        }
        if self.query_timeout_ms == 0 {
            return Err(WarehouseError::QueryRejected(String::from(
                "--query-timeout-ms must be greater than zero",
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SqlColumn {
    pub name: String,
    #[serde(rename = "type")]
    pub r#type: String,
}

/// Result of a guarded SQL query.
#[derive(Debug, Clone, Serialize)]
pub struct QueryResult {
    pub columns: Vec<SqlColumn>,
    pub rows: Vec<Vec<Value>>,
    pub row_count: usize,
    /// Whether rows beyond `max_rows` were dropped.
    pub truncated: bool,
}

/// One gap observation. NaN gaps are stored as NULL.
#[derive(Debug, Clone)]
pub struct GapRow {
    pub contract: String,
    /// `YYYY-MM-DD HH:MM:SS`
    pub ts: String,
    pub gap_open: f64,
    pub gap_high: f64,
    pub gap_low: f64,
    pub gap_close: f64,
}

/// One (contract, field) significance result of a run. NaN values are stored as NULL.
#[derive(Debug, Clone)]
pub struct SignificanceRow {
    pub contract: String,
    pub family: String,
    pub field: String,
    pub n: u64,
    pub mean: f64,
    pub std_dev: f64,
    pub std_err: f64,
    pub t_stat: f64,
    pub p_value: f64,
}

/// Outcome of one contract within a run.
#[derive(Debug, Clone)]
pub struct RunLogEntry {
    pub contract: String,
    /// `ok` or the kind of the first issue met.
    pub status: String,
    pub records: u64,
    pub message: Option<String>,
}

/// Row counts written by [`Warehouse::record_run`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunPersistReport {
    pub gap_rows: usize,
    pub significance_rows: usize,
    pub log_entries: usize,
}

/// The warehouse handle; cheap to clone.
#[derive(Clone)]
pub struct Warehouse {
    config: WarehouseConfig,
    manager: DuckDbConnectionManager,
}

impl Warehouse {
    pub fn open_default() -> Result<Self, WarehouseError> {
        Self::open(WarehouseConfig::default())
    }

    pub fn open(config: WarehouseConfig) -> Result<Self, WarehouseError> {
        if let Some(parent) = config.db_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let manager = DuckDbConnectionManager::new(config.db_path.clone(), config.max_pool_size);
        let warehouse = Self { config, manager };
        warehouse.initialize()?;
        Ok(warehouse)
    }

    /// Apply migrations and (re)create views.
    pub fn initialize(&self) -> Result<(), WarehouseError> {
        let connection = self.manager.acquire(AccessMode::ReadWrite)?;
        migrations::apply_migrations(&connection)?;
        views::create_views(&connection)?;
        Ok(())
    }

    pub fn db_path(&self) -> &Path {
        self.manager.db_path()
    }

    pub fn home(&self) -> &Path {
        self.config.aurgap_home.as_path()
    }

    /// Run a read-only query (`SELECT`, `WITH`, `EXPLAIN`, `SHOW`, `DESCRIBE`).
    pub fn execute_query(
        &self,
        sql: &str,
        guardrails: QueryGuardrails,
    ) -> Result<QueryResult, WarehouseError> {
        guardrails.validate()?;
        let sql = normalize_sql(sql)?;
        enforce_read_only_query(sql)?;

        let connection = self.manager.acquire(AccessMode::ReadOnly)?;
        execute_select_query(&connection, sql, guardrails, Instant::now())
    }

    /// Insert or replace gap observations keyed by (contract, ts).
    pub fn ingest_gaps(&self, rows: &[GapRow]) -> Result<usize, WarehouseError> {
        if rows.is_empty() {
            return Ok(0);
        }
        let connection = self.manager.acquire(AccessMode::ReadWrite)?;
        connection.execute_batch("BEGIN TRANSACTION")?;
        let result = insert_gaps(&connection, rows);
        finalize_transaction(&connection, result)
    }

    /// Insert or replace the significance rows of `run_id`.
    pub fn ingest_significance(
        &self,
        run_id: &str,
        rows: &[SignificanceRow],
    ) -> Result<usize, WarehouseError> {
        if rows.is_empty() {
            return Ok(0);
        }
        let connection = self.manager.acquire(AccessMode::ReadWrite)?;
        connection.execute_batch("BEGIN TRANSACTION")?;
        let result = insert_significance(&connection, run_id, rows);
        finalize_transaction(&connection, result)
    }

    /// Append run log entries for `run_id`.
    pub fn log_run(&self, run_id: &str, entries: &[RunLogEntry]) -> Result<usize, WarehouseError> {
        if entries.is_empty() {
            return Ok(0);
        }
        let connection = self.manager.acquire(AccessMode::ReadWrite)?;
        connection.execute_batch("BEGIN TRANSACTION")?;
        let result = insert_run_log(&connection, run_id, entries);
        finalize_transaction(&connection, result)
    }

    /// Persist everything a run produced in a single transaction.
    pub fn record_run(
        &self,
        run_id: &str,
        gaps: &[GapRow],
        significance: &[SignificanceRow],
        log: &[RunLogEntry],
    ) -> Result<RunPersistReport, WarehouseError> {
        let connection = self.manager.acquire(AccessMode::ReadWrite)?;
        connection.execute_batch("BEGIN TRANSACTION")?;
        let result = (|| -> Result<RunPersistReport, WarehouseError> {
            Ok(RunPersistReport {
                gap_rows: insert_gaps(&connection, gaps)?,
                significance_rows: insert_significance(&connection, run_id, significance)?,
                log_entries: insert_run_log(&connection, run_id, log)?,
            })
        })();
        finalize_transaction(&connection, result)
    }
}

fn insert_gaps(connection: &Connection, rows: &[GapRow]) -> Result<usize, WarehouseError> {
    for row in rows {
        let gaps = [row.gap_open, row.gap_high, row.gap_low, row.gap_close].map(nullable);
        let params: [&dyn ToSql; 6] = [
            &row.contract,
            &row.ts,
            &gaps[0],
            &gaps[1],
            &gaps[2],
            &gaps[3],
        ];
        connection.execute(
            "INSERT OR REPLACE INTO gap_series \
             (contract, ts, gap_open, gap_high, gap_low, gap_close, updated_at) \
             VALUES (?, CAST(? AS TIMESTAMP), ?, ?, ?, ?, CURRENT_TIMESTAMP)",
            params.as_slice(),
        )?;
    }
    Ok(rows.len())
}

fn insert_significance(
    connection: &Connection,
    run_id: &str,
    rows: &[SignificanceRow],
) -> Result<usize, WarehouseError> {
    for row in rows {
        let stats = [row.mean, row.std_dev, row.std_err, row.t_stat, row.p_value].map(nullable);
        let n = saturating_i64(row.n);
        let params: [&dyn ToSql; 10] = [
            &run_id,
            &row.contract,
            &row.family,
            &row.field,
            &n,
            &stats[0],
            &stats[1],
            &stats[2],
            &stats[3],
            &stats[4],
        ];
        connection.execute(
            "INSERT OR REPLACE INTO significance_results \
             (run_id, contract, family, field, n, mean, std_dev, std_err, t_stat, p_value, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, CURRENT_TIMESTAMP)",
            params.as_slice(),
        )?;
    }
    Ok(rows.len())
}

fn insert_run_log(
    connection: &Connection,
    run_id: &str,
    entries: &[RunLogEntry],
) -> Result<usize, WarehouseError> {
    for entry in entries {
        let records = saturating_i64(entry.records);
        let params: [&dyn ToSql; 5] = [
            &run_id,
            &entry.contract,
            &entry.status,
            &records,
            &entry.message,
        ];
        connection.execute(
            "INSERT INTO run_log (run_id, contract, status, records, message, logged_at) \
             VALUES (?, ?, ?, ?, ?, CURRENT_TIMESTAMP)",
            params.as_slice(),
        )?;
    }
    Ok(entries.len())
}

fn nullable(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}

fn saturating_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// Commit on success, roll back on failure.
fn finalize_transaction<T>(
    connection: &Connection,
    result: Result<T, WarehouseError>,
) -> Result<T, WarehouseError> {
    match result {
        Ok(value) => {
            connection.execute_batch("COMMIT")?;
            Ok(value)
        }
        Err(error) => {
            let _ = connection.execute_batch("ROLLBACK");
            Err(error)
        }
    }
}

fn execute_select_query(
    connection: &Connection,
    sql: &str,
    guardrails: QueryGuardrails,
    started: Instant,
) -> Result<QueryResult, WarehouseError> {
    let mut statement = connection.prepare(sql)?;
    // Column metadata is only available once the statement has run.
    let _ = statement.query([] as [&dyn ToSql; 0])?;

    let column_count = statement.column_count();
    let mut columns = Vec::with_capacity(column_count);
    for index in 0..column_count {
        let name = statement
            .column_name(index)
            .map_or_else(|_| format!("column_{index}"), ToString::to_string);
        columns.push(SqlColumn {
            name,
            r#type: statement.column_type(index).to_string(),
        });
    }

    let mut cursor = statement.query([] as [&dyn ToSql; 0])?;
    let mut rows = Vec::new();
    let mut truncated = false;
    while let Some(row) = cursor.next()? {
        ensure_timeout(started, guardrails.timeout())?;
        if rows.len() >= guardrails.max_rows {
            truncated = true;
            break;
        }
        rows.push(read_row(row, column_count)?);
    }
    ensure_timeout(started, guardrails.timeout())?;

    Ok(QueryResult {
        columns,
        row_count: rows.len(),
        rows,
        truncated,
    })
}

fn read_row(row: &::duckdb::Row<'_>, column_count: usize) -> Result<Vec<Value>, ::duckdb::Error> {
    let mut output = Vec::with_capacity(column_count);
    for index in 0..column_count {
        let value: DuckValue = row.get(index)?;
        output.push(to_json_value(value));
    }
    Ok(output)
}

fn to_json_value(value: DuckValue) -> Value {
    match value {
        DuckValue::Null => Value::Null,
        DuckValue::Boolean(value) => Value::Bool(value),
        DuckValue::TinyInt(value) => Value::Number(Number::from(value)),
        DuckValue::SmallInt(value) => Value::Number(Number::from(value)),
        DuckValue::Int(value) => Value::Number(Number::from(value)),
        DuckValue::BigInt(value) => Value::Number(Number::from(value)),
        DuckValue::UTinyInt(value) => Value::Number(Number::from(value)),
        DuckValue::USmallInt(value) => Value::Number(Number::from(value)),
        DuckValue::UInt(value) => Value::Number(Number::from(value)),
        DuckValue::UBigInt(value) => Value::Number(Number::from(value)),
        DuckValue::Float(value) => number_from_f64(f64::from(value)),
        DuckValue::Double(value) => number_from_f64(value),
        DuckValue::Text(value) => Value::String(value),
        DuckValue::Blob(value) => Value::String(hex::encode(value)),
        other => Value::String(format!("{other:?}")),
    }
}

/// NaN and infinities have no JSON form and become null.
fn number_from_f64(value: f64) -> Value {
    Number::from_f64(value)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

fn normalize_sql(sql: &str) -> Result<&str, WarehouseError> {
    let normalized = sql.trim();
    if normalized.is_empty() {
        return Err(WarehouseError::QueryRejected(String::from(
            "query must not be empty",
        )));
    }
    Ok(normalized.trim_end_matches(';').trim())
}

fn enforce_read_only_query(sql: &str) -> Result<(), WarehouseError> {
    if !is_select_like(sql) {
        return Err(WarehouseError::QueryRejected(String::from(
            "only SELECT/CTE queries are accepted",
        )));
    }
    if has_multiple_statements(sql) {
        return Err(WarehouseError::QueryRejected(String::from(
            "multiple SQL statements are not allowed",
        )));
    }
    Ok(())
}

fn is_select_like(sql: &str) -> bool {
    let first_keyword = sql
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_ascii_uppercase();
    matches!(
        first_keyword.as_str(),
        "SELECT" | "WITH" | "EXPLAIN" | "SHOW" | "DESCRIBE"
    )
}

fn has_multiple_statements(sql: &str) -> bool {
    sql.split(';')
        .filter(|part| !part.trim().is_empty())
        .count()
        > 1
}

fn ensure_timeout(started: Instant, timeout: Duration) -> Result<(), WarehouseError> {
    if started.elapsed() > timeout {
        return Err(WarehouseError::QueryTimeout {
            timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        });
    }
    Ok(())
}

/// `AURGAP_HOME`, else `$HOME/.aurgap`, else `.aurgap`.
fn resolve_aurgap_home() -> PathBuf {
    if let Some(path) = env::var_os("AURGAP_HOME") {
        let path = PathBuf::from(path);
        if !path.as_os_str().is_empty() {
            return path;
        }
    }
    if let Some(home) = env::var_os("HOME") {
        return PathBuf::from(home).join(".aurgap");
    }
    PathBuf::from(".aurgap")
}
