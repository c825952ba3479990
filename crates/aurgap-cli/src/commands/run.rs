use aurgap_core::{BatchConfig, Execution, ReferenceSeries};
use aurgap_warehouse::{Warehouse, WarehouseConfig};

use crate::cli::RunArgs;
use crate::error::CliError;

use super::{batch, CommandResult};

pub fn run(args: &RunArgs) -> Result<CommandResult, CliError> {
    let mut config = BatchConfig::load(&args.config)?;
    if args.sequential {
        config.execution = Execution::Sequential;
    }

    let refs = ReferenceSeries::load(&config.benchmark, &config.fx, &config.funding)?;
    let inputs = config.load_contracts();
    let report = config.pipeline().run_batch(&refs, &inputs);
    let files = report.write_outputs(&config.output_dir)?;

    let warehouse_config = match (&args.db, &config.warehouse) {
        (Some(path), _) => Some(WarehouseConfig::at_path(path.clone())),
        (None, options) if options.enabled => Some(
            options
                .db_path
                .clone()
                .map_or_else(WarehouseConfig::default, WarehouseConfig::at_path),
        ),
        (None, _) => None,
    };
    let persisted = warehouse_config
        .map(|warehouse_config| -> Result<_, CliError> {
            let warehouse = Warehouse::open(warehouse_config)?;
            batch::persist(&warehouse, &report)
        })
        .transpose()?;

    batch::summarize(&report, files, persisted, refs.warnings)
}
