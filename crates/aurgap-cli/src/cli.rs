//! Command-line interface for aurgap.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `run` | Full batch from a YAML configuration |
//! | `gap` | Ad-hoc gap series for one or more contract files |
//! | `ttest` | Significance over gap files already on disk |
//! | `expiry` | Resolve contract symbols to family and expiry |
//! | `sql` | Query the local DuckDB warehouse |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--format` | `json` | Output format (json, ndjson, table) |
//! | `--pretty` | `false` | Pretty-print JSON output |
//! | `--strict` | `false` | Treat warnings as errors |
//! | `-v` | warn | Raise log verbosity (repeatable) |
//!
//! # Examples
//!
//! ```bash
//! aurgap run --config batch.yaml
//! aurgap gap --benchmark xau.csv --fx usdcny.csv --funding shibor.csv \
//!     --contract AU2412.SHF.csv --format table
//! aurgap ttest results/
//! aurgap expiry AU2412 GCZ23E
//! aurgap sql "SELECT * FROM vw_significant_fields"
//! ```

use std::path::PathBuf;

use aurgap_core::{ExpiryModelKind, MonthCodePolicy, QuoteConvention};
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};

/// Gold futures against their interest-rate-parity fair value.
#[derive(Debug, Parser)]
#[command(
    name = "aurgap",
    author,
    version,
    about = "Gold futures vs. parity fair-value gap analysis",
    long_about = "aurgap converts a foreign gold benchmark into the domestic per-gram unit, \
projects it to each contract's expiry at the domestic funding rate and tests whether the \
traded price deviates from that parity forward.\n\
\n\
Use 'aurgap <command> --help' for command-specific help."
)]
pub struct Cli {
    /// Output format for results.
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,

    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    /// Treat warnings and errors as failures (exit code 5).
    #[arg(long, global = true, default_value_t = false)]
    pub strict: bool,

    /// Raise log verbosity on stderr (-v info, -vv debug, -vvv trace).
    ///
    /// `RUST_LOG` takes precedence when set.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Metadata lines followed by text grids.
    Table,
    /// Single JSON object output.
    Json,
    /// Newline-delimited JSON.
    Ndjson,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run a full batch described by a YAML configuration.
    ///
    /// Writes one gap file per contract and one significance report per
    /// contract family into the configured output directory.
    ///
    /// # Examples
    ///
    ///   aurgap run --config batch.yaml
    ///   aurgap run --config batch.yaml --db results.duckdb
    Run(RunArgs),

    /// Compute gap series for contract files against the reference series.
    Gap(GapArgs),

    /// Test the mean of every price_gaps_*.csv in a directory against zero.
    Ttest(TtestArgs),

    /// Resolve contract symbols to their family and expiry instant.
    ///
    /// # Examples
    ///
    ///   aurgap expiry AU2412 GCZ23E.CMX
    Expiry(ExpiryArgs),

    /// Run read-only SQL against the DuckDB warehouse.
    ///
    /// Queries run with a row limit and a timeout.
    ///
    /// # Examples
    ///
    ///   aurgap sql "SELECT * FROM vw_gap_daily WHERE contract = 'AU2412'"
    Sql(SqlArgs),
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Batch configuration file.
    #[arg(long)]
    pub config: PathBuf,

    /// Persist results to this warehouse file, regardless of the configuration.
    #[arg(long)]
    pub db: Option<PathBuf>,

    /// Process contracts one after another.
    #[arg(long, default_value_t = false)]
    pub sequential: bool,
}

#[derive(Debug, Args)]
pub struct GapArgs {
    /// Benchmark spot bars (per troy ounce, foreign currency).
    #[arg(long)]
    pub benchmark: PathBuf,

    /// Daily FX rates (domestic per foreign).
    #[arg(long)]
    pub fx: PathBuf,

    /// Daily domestic funding rates, in percent.
    #[arg(long)]
    pub funding: PathBuf,

    /// One or more contract bar files; the contract code comes from the file name.
    #[arg(long, required = true, num_args = 1..)]
    pub contract: Vec<PathBuf>,

    /// Write gap files and reports into this directory.
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Time-to-expiry model: contract or year_end.
    #[arg(long, default_value = "contract")]
    pub expiry_model: ExpiryModelKind,

    /// Contract quote unit: auto, per_gram or per_ounce.
    #[arg(long, default_value = "auto")]
    pub quote_convention: QuoteConvention,

    /// Unknown month letters: lenient (January) or strict (reject).
    #[arg(long, default_value = "lenient")]
    pub month_codes: MonthCodePolicy,
}

#[derive(Debug, Args)]
pub struct TtestArgs {
    /// Directory holding price_gaps_*.csv files.
    pub dir: PathBuf,

    /// Write the family reports into this directory.
    #[arg(long)]
    pub output_dir: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct ExpiryArgs {
    /// One or more contract codes (e.g., AU2412, GCZ23E.CMX).
    #[arg(required = true, num_args = 1..)]
    pub symbols: Vec<String>,

    /// Unknown month letters: lenient (January) or strict (reject).
    #[arg(long, default_value = "lenient")]
    pub month_codes: MonthCodePolicy,
}

#[derive(Debug, Args)]
pub struct SqlArgs {
    /// SQL query to execute.
    pub query: String,

    /// Warehouse file; defaults to `$AURGAP_HOME/warehouse.duckdb`.
    #[arg(long)]
    pub db: Option<PathBuf>,

    /// Maximum number of rows to return.
    #[arg(long, default_value_t = 10_000)]
    pub max_rows: usize,

    /// Query timeout in milliseconds.
    #[arg(long, default_value_t = 5_000)]
    pub query_timeout_ms: u64,
}
