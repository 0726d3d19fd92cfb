//! Computable options: named numeric parameters consumed by functions.
//!
//! Identity is the numeric value alone. The label is display text, so
//! renaming "Period" to "Length" never splits the function cache.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Range a settings panel may offer for an option.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OptionBounds {
    pub min: f64,
    pub max: f64,
    pub step: f64,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum OptionError {
    #[error("option '{label}' must be finite, got {value}")]
    NotFinite { label: String, value: f64 },
    #[error("option '{label}' = {value} is outside {min}..={max}")]
    OutOfBounds {
        label: String,
        value: f64,
        min: f64,
        max: f64,
    },
}

/// Immutable `{label, value}` parameter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputableOption {
    label: String,
    value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    bounds: Option<OptionBounds>,
}

impl ComputableOption {
    pub fn new(label: impl Into<String>, value: f64) -> Self {
        Self {
            label: label.into(),
            value,
            bounds: None,
        }
    }

    pub fn with_bounds(mut self, min: f64, max: f64, step: f64) -> Self {
        self.bounds = Some(OptionBounds { min, max, step });
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn bounds(&self) -> Option<OptionBounds> {
        self.bounds
    }

    /// The value as a bar count (rounded, at least 1).
    pub fn period(&self) -> usize {
        if self.value.is_finite() && self.value >= 1.0 {
            self.value.round() as usize
        } else {
            1
        }
    }

    /// A copy carrying `value`, keeping label and bounds.
    pub fn with_value(&self, value: f64) -> Result<Self, OptionError> {
        if !value.is_finite() {
            return Err(OptionError::NotFinite {
                label: self.label.clone(),
                value,
            });
        }
        if let Some(b) = self.bounds {
            if value < b.min || value > b.max {
                return Err(OptionError::OutOfBounds {
                    label: self.label.clone(),
                    value,
                    min: b.min,
                    max: b.max,
                });
            }
        }
        Ok(Self {
            label: self.label.clone(),
            value,
            bounds: self.bounds,
        })
    }

    /// Canonical bit pattern of the value, for hashed cache keys.
    ///
    /// `-0.0` maps to `0.0` so the key agrees with numeric equality.
    pub fn key_bits(&self) -> u64 {
        if self.value == 0.0 {
            0.0f64.to_bits()
        } else {
            self.value.to_bits()
        }
    }
}

impl PartialEq for ComputableOption {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}
