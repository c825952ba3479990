use std::fmt::{Display, Formatter};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ValidationError;

const MAX_SYMBOL_LEN: usize = 15;
const GAP_FILE_PREFIX: &str = "price_gaps_";
const TRANSFORMED_SUFFIX: &str = "_transformed";
const UNNAMED: &str = "<unnamed>";

/// Normalized contract code, e.g. `AU2412` or `GCZ23E`.
///
/// Exchange suffixes such as `.SHF` or `.CMX` are dropped on parse.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContractSymbol(String);

impl ContractSymbol {
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let trimmed = input.trim();
        let code = trimmed.split('.').next().unwrap_or_default();
        if code.is_empty() {
            return Err(ValidationError::invalid_symbol(input, "symbol cannot be empty"));
        }

        let normalized = code.to_ascii_uppercase();
        let len = normalized.chars().count();
        if len > MAX_SYMBOL_LEN {
            return Err(ValidationError::invalid_symbol(
                input,
                format!("length {len} exceeds max {MAX_SYMBOL_LEN}"),
            ));
        }

        if let Some((index, ch)) = normalized
            .chars()
            .enumerate()
            .find(|(_, ch)| !ch.is_ascii_alphanumeric())
        {
            return Err(ValidationError::invalid_symbol(
                input,
                format!("invalid character '{ch}' at index {index}"),
            ));
        }

        Ok(Self(normalized))
    }

    /// Derive the contract code from a data or gap file name.
    ///
    /// `price_gaps_AU2412.csv`, `AU2412.SHF.csv` and `GCZ23E.CMX_transformed.csv`
    /// resolve to `AU2412`, `AU2412` and `GCZ23E`.
    pub fn from_path(path: &Path) -> Result<Self, ValidationError> {
        Self::parse(&file_stem(path))
    }

    /// Unvalidated label for a contract whose name is not a contract code.
    ///
    /// Such a contract never resolves, but its failure is still reported
    /// under the name the user gave it.
    pub fn unparsed(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            Self(UNNAMED.to_owned())
        } else {
            Self(trimmed.to_owned())
        }
    }

    /// Label for a file whose name does not parse, see [`Self::unparsed`].
    pub fn unparsed_from_path(path: &Path) -> Self {
        Self::unparsed(&file_stem(path))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn file_stem(path: &Path) -> String {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stem = file_name
        .strip_suffix(".csv")
        .or_else(|| file_name.strip_suffix(".CSV"))
        .unwrap_or(file_name.as_str());
    let stem = stem.strip_prefix(GAP_FILE_PREFIX).unwrap_or(stem);
    stem.strip_suffix(TRANSFORMED_SUFFIX).unwrap_or(stem).to_owned()
}

impl Display for ContractSymbol {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for ContractSymbol {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl TryFrom<&str> for ContractSymbol {
    type Error = ValidationError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<ContractSymbol> for String {
    fn from(value: ContractSymbol) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_exchange_suffix_and_uppercases() {
        let parsed = ContractSymbol::parse(" au2412.shf ").expect("symbol should parse");
        assert_eq!(parsed.as_str(), "AU2412");
    }

    #[test]
    fn derives_symbol_from_file_names() {
        let cases = [
            ("results/price_gaps_AU2406.csv", "AU2406"),
            ("data/AU2412.csv", "AU2412"),
            ("data/GCM24E.CMX_transformed.csv", "GCM24E"),
        ];
        for (path, expected) in cases {
            let symbol = ContractSymbol::from_path(Path::new(path)).expect("symbol");
            assert_eq!(symbol.as_str(), expected);
        }
    }

    #[test]
    fn unparsed_labels_keep_the_raw_stem() {
        let path = Path::new("data/AU2406_1min.csv");
        assert!(ContractSymbol::from_path(path).is_err());
        assert_eq!(ContractSymbol::unparsed_from_path(path).as_str(), "AU2406_1min");
        assert_eq!(ContractSymbol::unparsed("  ").as_str(), "<unnamed>");
    }

    #[test]
    fn rejects_invalid_chars() {
        let err = ContractSymbol::parse("AU-2412").expect_err("must fail");
        assert!(matches!(err, ValidationError::InvalidSymbol { .. }));
    }
}
