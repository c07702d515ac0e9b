//! Configuration types for rowgate.toml

use std::path::Path;

use rowgate_core::error::{Result, RowgateError};
use rowgate_core::loader::LoaderOptions;
use rowgate_types::Dialect;
use serde::{Deserialize, Serialize};

/// Loader batching configuration
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct LoaderConfig {
    /// Cooperative scheduling turns a batch stays open before it is flushed
    #[serde(default = "default_yield_turns")]
    pub yield_turns: usize,
    /// Seal a batch once it holds this many keys
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_batch_size: Option<usize>,
}

fn default_yield_turns() -> usize {
    1
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            yield_turns: default_yield_turns(),
            max_batch_size: None,
        }
    }
}

impl From<LoaderConfig> for LoaderOptions {
    fn from(config: LoaderConfig) -> Self {
        LoaderOptions {
            yield_turns: config.yield_turns,
            max_batch_size: config.max_batch_size,
        }
    }
}

/// Main configuration struct for rowgate.toml
///
/// ```
/// use rowgate::config::RowgateConfig;
/// use rowgate::Dialect;
///
/// let config = RowgateConfig::parse(
///     r#"
///     dialect = "postgresql"
///     soft_delete_column = "archived"
///
///     [loader]
///     max_batch_size = 500
///     "#,
/// )
/// .unwrap();
/// assert_eq!(config.dialect, Dialect::PostgreSQL);
/// assert_eq!(config.loader.yield_turns, 1);
/// assert_eq!(config.loader.max_batch_size, Some(500));
/// ```
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct RowgateConfig {
    /// Dialect the executors are expected to speak (sqlite, postgresql, mysql)
    #[serde(default)]
    pub dialect: Dialect,
    /// Flag column marking a row as soft-deleted. Tables without it have no
    /// soft-delete policy.
    #[serde(default = "default_soft_delete_column")]
    pub soft_delete_column: String,
    /// Loader batching
    #[serde(default)]
    pub loader: LoaderConfig,
}

fn default_soft_delete_column() -> String {
    "deleted".to_string()
}

impl Default for RowgateConfig {
    fn default() -> Self {
        Self {
            dialect: Dialect::default(),
            soft_delete_column: default_soft_delete_column(),
            loader: LoaderConfig::default(),
        }
    }
}

impl RowgateConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            RowgateError::Conversion(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::parse(&contents)
    }

    /// Parse configuration from a TOML string
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| RowgateError::Conversion(format!("invalid config: {e}")))
    }

    /// Render the configuration as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| RowgateError::Conversion(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_config_uses_defaults() {
        let config = RowgateConfig::parse("").unwrap();
        assert_eq!(config, RowgateConfig::default());
        assert_eq!(config.soft_delete_column, "deleted");
        assert_eq!(LoaderOptions::from(config.loader), LoaderOptions::default());
    }

    #[test]
    fn unknown_dialect_is_a_conversion_error() {
        let err = RowgateConfig::parse(r#"dialect = "oracle""#).unwrap_err();
        assert!(matches!(err, RowgateError::Conversion(_)));
    }

    #[test]
    fn round_trips_through_a_file() {
        let config = RowgateConfig {
            dialect: Dialect::MySQL,
            soft_delete_column: "removed".into(),
            loader: LoaderConfig {
                yield_turns: 3,
                max_batch_size: Some(100),
            },
        };

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(config.to_toml().unwrap().as_bytes()).unwrap();
        assert_eq!(RowgateConfig::from_file(file.path()).unwrap(), config);
    }

    #[test]
    fn missing_file_is_reported() {
        let err = RowgateConfig::from_file(Path::new("/nonexistent/rowgate.toml")).unwrap_err();
        assert!(err.to_string().contains("failed to read"));
    }
}
