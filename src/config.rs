//! Compiler configuration.
//!
//! ```toml
//! placeholder = "dollar"
//! normalize_whitespace = true
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::placeholder::Dialect;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompilerConfig {
    /// Placeholder dialect for compiled statements.
    pub placeholder: Dialect,
    /// Collapse whitespace runs and trim the statement.
    pub normalize_whitespace: bool,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            placeholder: Dialect::Question,
            normalize_whitespace: true,
        }
    }
}

impl CompilerConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Read a TOML config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CompilerConfig::from_toml_str("").unwrap();
        assert_eq!(config, CompilerConfig::default());
        assert_eq!(config.placeholder, Dialect::Question);
        assert!(config.normalize_whitespace);
    }

    #[test]
    fn test_parse() {
        let config = CompilerConfig::from_toml_str(
            r#"
            placeholder = "at_p"
            normalize_whitespace = false
            "#,
        )
        .unwrap();
        assert_eq!(config.placeholder, Dialect::AtP);
        assert!(!config.normalize_whitespace);
    }

    #[test]
    fn test_rejects_unknown_dialect() {
        let err = CompilerConfig::from_toml_str(r#"placeholder = "percent""#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_rejects_unknown_keys() {
        assert!(CompilerConfig::from_toml_str("dialect = \"dollar\"").is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let err = CompilerConfig::load("/nonexistent/sqltpl.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
