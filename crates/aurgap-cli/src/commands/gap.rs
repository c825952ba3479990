use aurgap_core::{ContractInput, Execution, GapPipeline, ReferenceSeries};

use crate::cli::GapArgs;
use crate::error::CliError;

use super::{batch, CommandResult};

pub fn run(args: &GapArgs) -> Result<CommandResult, CliError> {
    let refs = ReferenceSeries::load(&args.benchmark, &args.fx, &args.funding)?;
    let inputs: Vec<ContractInput> = args
        .contract
        .iter()
        .map(|path| ContractInput::from_path(path))
        .collect();

    let pipeline = GapPipeline {
        expiry_model: args.expiry_model,
        quote_convention: args.quote_convention,
        month_code_policy: args.month_codes,
        execution: Execution::Parallel,
    };
    let report = pipeline.run_batch(&refs, &inputs);

    let files = match &args.output_dir {
        Some(dir) => report.write_outputs(dir)?,
        None => Vec::new(),
    };

    batch::summarize(&report, files, None, refs.warnings)
}
