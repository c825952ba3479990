use aurgap_core::{CoreError, ValidationError};
use aurgap_warehouse::WarehouseError;
use thiserror::Error;

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Warehouse(#[from] WarehouseError),

    #[error("command error: {0}")]
    Command(String),

    #[error("strict mode failed: warnings={warning_count}, errors={error_count}")]
    StrictModeViolation {
        warning_count: usize,
        error_count: usize,
    },

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Validation(_) | Self::Command(_) => 2,
            Self::Core(CoreError::Validation(_) | CoreError::Config(_)) => 2,
            Self::Core(CoreError::Io { .. } | CoreError::Csv(_)) => 10,
            Self::Warehouse(WarehouseError::QueryRejected(_)) => 2,
            Self::Warehouse(_) => 10,
            Self::StrictModeViolation { .. } => 5,
            Self::Serialization(_) => 4,
            Self::Io(_) => 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_follow_error_category() {
        let invalid = CliError::from(ValidationError::invalid_symbol("AU24", "too short"));
        assert_eq!(invalid.exit_code(), 2);

        let unreadable = CliError::from(CoreError::io(
            "missing.csv",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        ));
        assert_eq!(unreadable.exit_code(), 10);

        let rejected = CliError::from(WarehouseError::QueryRejected("DELETE".to_owned()));
        assert_eq!(rejected.exit_code(), 2);

        let strict = CliError::StrictModeViolation {
            warning_count: 1,
            error_count: 0,
        };
        assert_eq!(strict.exit_code(), 5);
    }
}
