//! Indicator configuration fingerprinting.
//!
//! - `IndicatorConfig`: indicator kind + parameter overrides by option label.
//! - `kind_hash()`: structural identity (kind only, no parameter values).
//! - `full_hash()`: exact identity (kind + all parameter values).
//!
//! A chart uses `full_hash` to refuse adding the same indicator twice.

use crate::domain::ConfigHash;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One indicator entry of a chart configuration.
///
/// Uses `BTreeMap` for deterministic key ordering during serialization → hashing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndicatorConfig {
    pub kind: String,
    #[serde(default)]
    pub params: BTreeMap<String, f64>,
}

impl IndicatorConfig {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            params: BTreeMap::new(),
        }
    }

    /// Builder-style parameter override.
    pub fn with_param(mut self, label: impl Into<String>, value: f64) -> Self {
        self.params.insert(label.into(), value);
        self
    }

    /// Structural hash: kind only.
    pub fn kind_hash(&self) -> ConfigHash {
        ConfigHash::from_bytes(self.kind.to_ascii_lowercase().as_bytes())
    }

    /// Full hash: kind + all parameter values.
    ///
    /// Canonical form: lowercase kind, labels sorted by the `BTreeMap`,
    /// values as JSON numbers. `-0.0` is folded into `0.0`.
    pub fn full_hash(&self) -> ConfigHash {
        let params: BTreeMap<&str, f64> = self
            .params
            .iter()
            .map(|(label, value)| (label.as_str(), if *value == 0.0 { 0.0 } else { *value }))
            .collect();
        let canonical = serde_json::json!({
            "kind": self.kind.to_ascii_lowercase(),
            "params": params,
        });
        ConfigHash::from_bytes(canonical.to_string().as_bytes())
    }
}
