use std::path::PathBuf;

use thiserror::Error;

/// Validation and contract errors exposed by `aurgap-core`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("invalid contract symbol '{symbol}': {reason}")]
    InvalidSymbol { symbol: String, reason: String },

    #[error("required column '{field}' missing from {series}")]
    MissingField { series: String, field: String },

    #[error("unrecognized timestamp '{value}'")]
    InvalidTimestamp { value: String },

    #[error("invalid {field} value '{value}'")]
    InvalidValue { field: &'static str, value: String },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl ValidationError {
    pub fn invalid_symbol(symbol: &str, reason: impl Into<String>) -> Self {
        Self::InvalidSymbol {
            symbol: symbol.to_owned(),
            reason: reason.into(),
        }
    }

    pub fn missing_field(series: impl Into<String>, field: impl Into<String>) -> Self {
        Self::MissingField {
            series: series.into(),
            field: field.into(),
        }
    }
}

/// Top-level error type for core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error("config parse error: {0}")]
    Config(#[from] serde_yaml::Error),
}

impl CoreError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
