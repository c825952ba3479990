use aurgap_warehouse::{QueryGuardrails, Warehouse, WarehouseConfig};

use crate::cli::SqlArgs;
use crate::error::CliError;

use super::CommandResult;

pub fn run(args: &SqlArgs) -> Result<CommandResult, CliError> {
    let query = args.query.trim();
    if query.is_empty() {
        return Err(CliError::Command(String::from("query must not be empty")));
    }

    let config = args
        .db
        .clone()
        .map_or_else(WarehouseConfig::default, WarehouseConfig::at_path);
    let warehouse = Warehouse::open(config)?;

    let guardrails = QueryGuardrails {
        max_rows: args.max_rows,
        query_timeout_ms: args.query_timeout_ms,
    };
    let result = warehouse.execute_query(query, guardrails)?;

    let mut command_result = CommandResult::ok(serde_json::to_value(&result)?);
    if result.truncated {
        command_result = command_result.with_warning(format!(
            "result truncated at {} rows (use --max-rows to increase limit)",
            result.row_count
        ));
    }

    Ok(command_result)
}
