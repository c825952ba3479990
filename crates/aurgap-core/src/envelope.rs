use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::ValidationError;

pub const SCHEMA_VERSION: &str = "v1.0.0";

/// Standard response envelope for all `aurgap` machine-readable outputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub meta: EnvelopeMeta,
    pub data: T,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<EnvelopeError>,
}

impl<T> Envelope<T> {
    pub fn success(meta: EnvelopeMeta, data: T) -> Self {
        Self {
            meta,
            data,
            errors: Vec::new(),
        }
    }

    pub fn with_errors(
        meta: EnvelopeMeta,
        data: T,
        errors: Vec<EnvelopeError>,
    ) -> Result<Self, ValidationError> {
        meta.validate()?;
        for error in &errors {
            error.validate()?;
        }

        Ok(Self { meta, data, errors })
    }
}

/// Metadata attached to every envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvelopeMeta {
    pub request_id: String,
    pub schema_version: String,
    /// RFC 3339 UTC instant the envelope was produced.
    pub generated_at: String,
    pub latency_ms: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl EnvelopeMeta {
    pub fn new(request_id: impl Into<String>, latency_ms: u64) -> Result<Self, ValidationError> {
        let generated_at = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .map_err(|error| ValidationError::InvalidValue {
                field: "generated_at",
                value: error.to_string(),
            })?;
        let meta = Self {
            request_id: request_id.into(),
            schema_version: SCHEMA_VERSION.to_owned(),
            generated_at,
            latency_ms,
            warnings: Vec::new(),
        };
        meta.validate()?;
        Ok(meta)
    }

    pub fn push_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.request_id.trim().len() < 8 {
            return Err(ValidationError::InvalidValue {
                field: "request_id",
                value: self.request_id.clone(),
            });
        }

        if !is_valid_schema_version(&self.schema_version) {
            return Err(ValidationError::InvalidValue {
                field: "schema_version",
                value: self.schema_version.clone(),
            });
        }

        Ok(())
    }
}

/// Structured error payload for partial or failed responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvelopeError {
    pub code: String,
    pub message: String,
    /// Contract the error belongs to, when it is confined to one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contract: Option<String>,
}

impl EnvelopeError {
    pub fn new(
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let error = Self {
            code: code.into(),
            message: message.into(),
            contract: None,
        };
        error.validate()?;
        Ok(error)
    }

    pub fn with_contract(mut self, contract: impl Into<String>) -> Self {
        self.contract = Some(contract.into());
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.code.trim().is_empty() {
            return Err(ValidationError::InvalidValue {
                field: "error_code",
                value: self.code.clone(),
            });
        }

        if self.message.trim().is_empty() {
            return Err(ValidationError::InvalidValue {
                field: "error_message",
                value: self.message.clone(),
            });
        }

        Ok(())
    }
}

fn is_valid_schema_version(value: &str) -> bool {
    let Some(version) = value.strip_prefix('v') else {
        return false;
    };

    let parts: Vec<&str> = version.split('.').collect();
    parts.len() == 3
        && parts
            .iter()
            .all(|part| !part.is_empty() && part.chars().all(|ch| ch.is_ascii_digit()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_valid_meta() {
        let meta = EnvelopeMeta::new("request-12345", 11).expect("meta should be valid");
        assert_eq!(meta.schema_version, SCHEMA_VERSION);
        assert!(meta.generated_at.ends_with('Z'));
    }

    #[test]
    fn rejects_short_request_id() {
        let err = EnvelopeMeta::new("req", 1).expect_err("must fail");
        assert!(matches!(
            err,
            ValidationError::InvalidValue {
                field: "request_id",
                ..
            }
        ));
    }

    #[test]
    fn rejects_empty_error_code() {
        let err = EnvelopeError::new("", "message").expect_err("must fail");
        assert!(matches!(err, ValidationError::InvalidValue { field: "error_code", .. }));
    }

    #[test]
    fn schema_version_shape() {
        assert!(is_valid_schema_version("v1.0.0"));
        assert!(!is_valid_schema_version("1.0.0"));
        assert!(!is_valid_schema_version("v1.0"));
    }

    #[test]
    fn empty_errors_are_omitted() {
        let meta = EnvelopeMeta::new("request-12345", 0).expect("meta");
        let value = serde_json::to_value(Envelope::success(meta, 1)).expect("json");
        assert!(value.get("errors").is_none());
        assert!(value["meta"].get("warnings").is_none());
    }
}
