//! Chart configuration: symbol, timeframe and the indicators to draw.
//!
//! Stored as TOML:
//!
//! ```toml
//! symbol = "SPY"
//! timeframe = "1d"
//!
//! [[indicators]]
//! kind = "cci"
//! params = { "Period" = 14.0 }
//! ```

use crate::fingerprint::IndicatorConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read chart config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("parse chart config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("serialize chart config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

fn default_symbol() -> String {
    "UNKNOWN".into()
}

fn default_timeframe() -> String {
    "1d".into()
}

/// The complete chart configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartConfig {
    #[serde(default = "default_symbol")]
    pub symbol: String,
    #[serde(default = "default_timeframe")]
    pub timeframe: String,
    #[serde(default)]
    pub indicators: Vec<IndicatorConfig>,
}

impl ChartConfig {
    /// Load a chart config from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse a chart config from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string(self)?)
    }

    /// One of each indicator kind with default options.
    pub fn default_chart(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            timeframe: default_timeframe(),
            indicators: ["vol", "cci", "dmi", "ma"]
                .into_iter()
                .map(IndicatorConfig::new)
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"
symbol = "SPY"
timeframe = "1h"

[[indicators]]
kind = "cci"
params = { "Period" = 14.0, "Alpha" = 0.015 }

[[indicators]]
kind = "vol"
"#;

    #[test]
    fn parse_sample() {
        let config = ChartConfig::from_toml(SAMPLE).unwrap();
        assert_eq!(config.symbol, "SPY");
        assert_eq!(config.timeframe, "1h");
        assert_eq!(config.indicators.len(), 2);
        assert_eq!(config.indicators[0].params["Period"], 14.0);
        assert!(config.indicators[1].params.is_empty());
    }

    #[test]
    fn defaults_apply() {
        let config = ChartConfig::from_toml("").unwrap();
        assert_eq!(config.symbol, "UNKNOWN");
        assert_eq!(config.timeframe, "1d");
        assert!(config.indicators.is_empty());
    }

    #[test]
    fn malformed_toml_is_parse_error() {
        let err = ChartConfig::from_toml("indicators = 3").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn roundtrip_through_file() {
        let config = ChartConfig::default_chart("QQQ");
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(config.to_toml().unwrap().as_bytes()).unwrap();
        let loaded = ChartConfig::from_file(file.path()).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn missing_file_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ChartConfig::from_file(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
