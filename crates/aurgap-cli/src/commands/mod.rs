mod batch;
mod expiry;
mod gap;
mod run;
mod sql;
mod ttest;

use std::time::Instant;

use aurgap_core::{Envelope, EnvelopeError, EnvelopeMeta};
use serde_json::Value;
use uuid::Uuid;

use crate::cli::{Cli, Command};
use crate::error::CliError;

pub struct CommandResult {
    pub data: Value,
    pub warnings: Vec<String>,
    pub errors: Vec<EnvelopeError>,
    /// Text grids shown in table mode instead of the JSON data.
    pub tables: Vec<String>,
}

impl CommandResult {
    pub fn ok(data: Value) -> Self {
        Self {
            data,
            warnings: Vec::new(),
            errors: Vec::new(),
            tables: Vec::new(),
        }
    }

    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warnings.push(warning.into());
        self
    }

    pub fn with_warnings(mut self, warnings: impl IntoIterator<Item = String>) -> Self {
        self.warnings.extend(warnings);
        self
    }

    pub fn with_errors(mut self, errors: Vec<EnvelopeError>) -> Self {
        self.errors.extend(errors);
        self
    }

    pub fn with_tables(mut self, tables: Vec<String>) -> Self {
        self.tables.extend(tables);
        self
    }
}

/// The rendered envelope plus the grids for table output.
pub struct CommandOutcome {
    pub envelope: Envelope<Value>,
    pub tables: Vec<String>,
}

pub fn run(cli: &Cli) -> Result<CommandOutcome, CliError> {
    let started = Instant::now();

    let command_result = match &cli.command {
        Command::Run(args) => run::run(args)?,
        Command::Gap(args) => gap::run(args)?,
        Command::Ttest(args) => ttest::run(args)?,
        Command::Expiry(args) => expiry::run(args)?,
        Command::Sql(args) => sql::run(args)?,
    };

    let CommandResult {
        data,
        warnings,
        errors,
        tables,
    } = command_result;

    let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    let mut meta = EnvelopeMeta::new(Uuid::new_v4().hyphenated().to_string(), latency_ms)?;
    for warning in warnings {
        meta.push_warning(warning);
    }

    let envelope = Envelope::with_errors(meta, data, errors)?;
    Ok(CommandOutcome { envelope, tables })
}
