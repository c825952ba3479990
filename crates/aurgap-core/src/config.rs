//! YAML description of a batch run.
//!
//! ```yaml
//! benchmark: data/SPTAUUSDOZ.IDC.csv
//! fx: data/USDCNY.EX.csv
//! funding: data/OpeningPrice.csv
//! output_dir: results
//! expiry_model: contract
//! contracts:
//!   - path: data/AU2412.csv
//!   - path: data/GC_transformed.csv
//!     symbol: GCZ23E
//! ```
//!
//! Relative paths are resolved against the directory holding the file.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::calendar::{ExpiryModelKind, MonthCodePolicy};
use crate::fair_value::QuoteConvention;
use crate::pipeline::{ContractInput, Execution, GapPipeline};
use crate::{ContractSymbol, CoreError, ValidationError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BatchConfig {
    pub benchmark: PathBuf,
    pub fx: PathBuf,
    pub funding: PathBuf,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    pub contracts: Vec<ContractEntry>,
    #[serde(default)]
    pub expiry_model: ExpiryModelKind,
    #[serde(default)]
    pub quote_convention: QuoteConvention,
    #[serde(default)]
    pub month_code_policy: MonthCodePolicy,
    #[serde(default)]
    pub execution: Execution,
    #[serde(default)]
    pub warehouse: WarehouseOptions,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ContractEntry {
    pub path: PathBuf,
    /// Overrides the code derived from the file name.
    #[serde(default)]
    pub symbol: Option<String>,
}

/// Persistence of run results into the DuckDB warehouse.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WarehouseOptions {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub db_path: Option<PathBuf>,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("results")
}

impl BatchConfig {
    pub fn load(path: &Path) -> Result<Self, CoreError> {
        let text = fs::read_to_string(path).map_err(|source| CoreError::io(path, source))?;
        let base = path.parent().unwrap_or_else(|| Path::new(""));
        Self::from_yaml(&text, base)
    }

    /// Parse and validate, resolving relative paths against `base`.
    pub fn from_yaml(text: &str, base: &Path) -> Result<Self, CoreError> {
        let mut config: Self = serde_yaml::from_str(text)?;
        config.resolve_paths(base);
        config.validate()?;
        Ok(config)
    }

    fn resolve_paths(&mut self, base: &Path) {
        for path in [
            &mut self.benchmark,
            &mut self.fx,
            &mut self.funding,
            &mut self.output_dir,
        ] {
            *path = rebase(base, path);
        }
        for entry in &mut self.contracts {
            entry.path = rebase(base, &entry.path);
        }
        if let Some(db_path) = self.warehouse.db_path.as_mut() {
            *db_path = rebase(base, db_path);
        }
    }

    fn validate(&self) -> Result<(), ValidationError> {
        if self.contracts.is_empty() {
            return Err(ValidationError::InvalidConfig(
                "at least one contract is required".to_owned(),
            ));
        }
        Ok(())
    }

    pub fn pipeline(&self) -> GapPipeline {
        GapPipeline {
            expiry_model: self.expiry_model,
            quote_convention: self.quote_convention,
            month_code_policy: self.month_code_policy,
            execution: self.execution,
        }
    }

    /// Load every contract file, in configuration order.
    ///
    /// Entries whose code does not parse are kept as invalid inputs.
    pub fn load_contracts(&self) -> Vec<ContractInput> {
        self.contracts.iter().map(ContractEntry::load).collect()
    }
}

impl ContractEntry {
    pub fn symbol(&self) -> Result<ContractSymbol, ValidationError> {
        match &self.symbol {
            Some(symbol) => ContractSymbol::parse(symbol),
            None => ContractSymbol::from_path(&self.path),
        }
    }

    pub fn load(&self) -> ContractInput {
        match &self.symbol {
            Some(raw) => match ContractSymbol::parse(raw) {
                Ok(symbol) => ContractInput::load(&self.path, symbol),
                Err(error) => ContractInput::invalid(ContractSymbol::unparsed(raw), &error),
            },
            None => ContractInput::from_path(&self.path),
        }
    }
}

fn rebase(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}
