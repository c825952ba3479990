use aurgap_core::calendar;
use aurgap_core::{ContractSpec, ContractSymbol, EnvelopeError};

use crate::cli::ExpiryArgs;
use crate::error::CliError;

use super::CommandResult;

/// Resolve every symbol; failures become contract-scoped errors.
pub fn run(args: &ExpiryArgs) -> Result<CommandResult, CliError> {
    let mut specs: Vec<ContractSpec> = Vec::with_capacity(args.symbols.len());
    let mut errors = Vec::new();

    for raw in &args.symbols {
        let resolved = ContractSymbol::parse(raw)
            .and_then(|symbol| calendar::resolve(&symbol, args.month_codes));
        match resolved {
            Ok(spec) => specs.push(spec),
            Err(error) => {
                let error = EnvelopeError::new("invalid_symbol", error.to_string())?;
                errors.push(error.with_contract(raw.as_str()));
            }
        }
    }

    Ok(CommandResult::ok(serde_json::to_value(&specs)?).with_errors(errors))
}
