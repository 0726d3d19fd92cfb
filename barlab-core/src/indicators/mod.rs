//! Indicators: named bundles of functions, output variables and presentation
//! metadata.
//!
//! An indicator never computes anything itself. It asks the `FunctionCache`
//! for the functions it needs (so two indicators wanting MA(20) of the close
//! share one), and exposes selected function outputs under display names.
//! Dropping an indicator drops its function handles; functions no other
//! indicator holds are then released by the cache.

mod cci;
mod dmi;
pub mod factory;
mod ma;
mod vol;

pub use factory::{create_indicator, resolve_options};

use crate::cache::FunctionCache;
use crate::domain::SessionId;
use crate::function::{Function, FunctionError};
use crate::option::{ComputableOption, OptionError};
use crate::series::{BaseSeries, IndexedSeries};
use chrono::NaiveDateTime;
use log::debug;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IndicatorError {
    #[error("unknown indicator kind: {0}")]
    UnknownKind(String),
    #[error("{kind} has no option labelled '{label}'")]
    UnknownOption { kind: IndicatorKind, label: String },
    #[error("{kind} requires option '{label}'")]
    MissingOption { kind: IndicatorKind, label: String },
    #[error(transparent)]
    Option(#[from] OptionError),
    #[error(transparent)]
    Function(#[from] FunctionError),
}

/// Indicator kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndicatorKind {
    /// Volume with two moving averages.
    Vol,
    /// Commodity Channel Index with its moving average.
    Cci,
    /// Directional Movement Index: +DI, -DI and ADX.
    Dmi,
    /// Three moving averages of the close, drawn over the price.
    Ma,
}

impl IndicatorKind {
    pub fn all() -> [IndicatorKind; 4] {
        [
            IndicatorKind::Vol,
            IndicatorKind::Cci,
            IndicatorKind::Dmi,
            IndicatorKind::Ma,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            IndicatorKind::Vol => "vol",
            IndicatorKind::Cci => "cci",
            IndicatorKind::Dmi => "dmi",
            IndicatorKind::Ma => "ma",
        }
    }

    pub fn meta(&self) -> IndicatorMeta {
        match self {
            IndicatorKind::Vol => vol::meta(),
            IndicatorKind::Cci => cci::meta(),
            IndicatorKind::Dmi => dmi::meta(),
            IndicatorKind::Ma => ma::meta(),
        }
    }

    /// Options with their default values, in declaration order.
    pub fn default_options(&self) -> Vec<ComputableOption> {
        match self {
            IndicatorKind::Vol => vol::default_options(),
            IndicatorKind::Cci => cci::default_options(),
            IndicatorKind::Dmi => dmi::default_options(),
            IndicatorKind::Ma => ma::default_options(),
        }
    }

    fn wire(
        &self,
        base: &Arc<BaseSeries>,
        options: &[ComputableOption],
        cache: &FunctionCache,
    ) -> Result<Wiring, IndicatorError> {
        match self {
            IndicatorKind::Vol => vol::wire(base, options, cache),
            IndicatorKind::Cci => cci::wire(base, options, cache),
            IndicatorKind::Dmi => dmi::wire(base, options, cache),
            IndicatorKind::Ma => ma::wire(base, options, cache),
        }
    }
}

impl fmt::Display for IndicatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for IndicatorKind {
    type Err = IndicatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        IndicatorKind::all()
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| IndicatorError::UnknownKind(s.to_string()))
    }
}

/// Static presentation metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicatorMeta {
    pub short_name: &'static str,
    pub long_name: &'static str,
    /// Horizontal reference lines.
    pub grids: Vec<f32>,
    /// Drawn over the price pane rather than in its own pane.
    pub overlay: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlotStyle {
    Line,
    Volume,
}

/// A named, read-only output of an indicator.
#[derive(Debug, Clone)]
pub struct OutputVar {
    name: &'static str,
    plot: PlotStyle,
    series: Arc<IndexedSeries>,
}

impl OutputVar {
    pub(crate) fn new(name: &'static str, plot: PlotStyle, series: Arc<IndexedSeries>) -> Self {
        Self { name, plot, series }
    }

    /// Output `output` of `function`, shown as `name`.
    pub(crate) fn of(
        name: &'static str,
        plot: PlotStyle,
        function: &Arc<Function>,
        output: &str,
    ) -> Result<Self, IndicatorError> {
        let series = function
            .output_by_name(output)
            .ok_or(FunctionError::Unbound(function.kind()))?;
        Ok(Self::new(name, plot, Arc::clone(series)))
    }

    pub fn name(&self) -> &str {
        self.name
    }

    pub fn plot(&self) -> PlotStyle {
        self.plot
    }

    pub fn series(&self) -> &Arc<IndexedSeries> {
        &self.series
    }
}

/// Functions and outputs produced by wiring one kind.
pub(crate) struct Wiring {
    pub functions: Vec<Arc<Function>>,
    pub outputs: Vec<OutputVar>,
}

/// Look up a required option by label.
pub(crate) fn require<'a>(
    kind: IndicatorKind,
    options: &'a [ComputableOption],
    label: &str,
) -> Result<&'a ComputableOption, IndicatorError> {
    options
        .iter()
        .find(|o| o.label() == label)
        .ok_or_else(|| IndicatorError::MissingOption {
            kind,
            label: label.to_string(),
        })
}

/// A bound indicator over one base series.
#[derive(Debug)]
pub struct Indicator {
    kind: IndicatorKind,
    meta: IndicatorMeta,
    options: Vec<ComputableOption>,
    base: Arc<BaseSeries>,
    functions: Vec<Arc<Function>>,
    outputs: Vec<OutputVar>,
}

impl Indicator {
    /// Bind `kind` over `base` with `options`, acquiring functions from `cache`.
    ///
    /// Every option label must be one the kind declares.
    pub fn new(
        kind: IndicatorKind,
        base: &Arc<BaseSeries>,
        options: Vec<ComputableOption>,
        cache: &FunctionCache,
    ) -> Result<Self, IndicatorError> {
        let declared = kind.default_options();
        if let Some(unknown) = options
            .iter()
            .find(|o| !declared.iter().any(|d| d.label() == o.label()))
        {
            return Err(IndicatorError::UnknownOption {
                kind,
                label: unknown.label().to_string(),
            });
        }
        let wiring = kind.wire(base, &options, cache)?;
        debug!(
            "bound indicator {kind} over {}/{} with {} functions",
            base.symbol(),
            base.timeframe(),
            wiring.functions.len()
        );
        Ok(Self {
            kind,
            meta: kind.meta(),
            options,
            base: Arc::clone(base),
            functions: wiring.functions,
            outputs: wiring.outputs,
        })
    }

    pub fn with_defaults(
        kind: IndicatorKind,
        base: &Arc<BaseSeries>,
        cache: &FunctionCache,
    ) -> Result<Self, IndicatorError> {
        Self::new(kind, base, kind.default_options(), cache)
    }

    pub fn kind(&self) -> IndicatorKind {
        self.kind
    }

    pub fn meta(&self) -> &IndicatorMeta {
        &self.meta
    }

    pub fn options(&self) -> &[ComputableOption] {
        &self.options
    }

    pub fn option(&self, label: &str) -> Option<&ComputableOption> {
        self.options.iter().find(|o| o.label() == label)
    }

    pub fn base(&self) -> &Arc<BaseSeries> {
        &self.base
    }

    pub fn functions(&self) -> &[Arc<Function>] {
        &self.functions
    }

    /// Output variables in display order. Reading never computes.
    pub fn outputs(&self) -> &[OutputVar] {
        &self.outputs
    }

    pub fn output(&self, name: &str) -> Option<&OutputVar> {
        self.outputs.iter().find(|o| o.name() == name)
    }

    /// Make every output valid through `idx` for `session`.
    pub fn compute_to(&self, session: SessionId, idx: usize) -> Result<(), IndicatorError> {
        for function in &self.functions {
            function.compute_to(session, idx)?;
        }
        Ok(())
    }

    /// Recompute everything from the first bar at or after `time` up to the
    /// frontier. A `time` past the last bar changes nothing.
    pub fn compute_from(
        &self,
        session: SessionId,
        time: NaiveDateTime,
    ) -> Result<(), IndicatorError> {
        let Some(idx) = self.base.index_of_time(time) else {
            return Ok(());
        };
        self.invalidate_from(idx);
        self.compute_to(session, self.base.len().saturating_sub(1))
    }

    pub fn invalidate_from(&self, idx: usize) {
        for function in &self.functions {
            function.invalidate_from(idx);
        }
    }

    /// The option list with `label` set to `value`, bounds checked.
    pub fn options_with(
        &self,
        label: &str,
        value: f64,
    ) -> Result<Vec<ComputableOption>, IndicatorError> {
        let mut options = self.options.clone();
        let slot = options
            .iter_mut()
            .find(|o| o.label() == label)
            .ok_or_else(|| IndicatorError::UnknownOption {
                kind: self.kind,
                label: label.to_string(),
            })?;
        *slot = slot.with_value(value)?;
        Ok(options)
    }

    /// Change one option and rebind through `cache`.
    ///
    /// Functions are rebuilt only for a parameter tuple the cache does not
    /// already hold. On error the indicator keeps its previous binding.
    pub fn rebind(
        &mut self,
        label: &str,
        value: f64,
        cache: &FunctionCache,
    ) -> Result<(), IndicatorError> {
        let options = self.options_with(label, value)?;
        let wiring = self.kind.wire(&self.base, &options, cache)?;
        debug!("rebound {} with {label} = {value}", self.kind);
        self.options = options;
        self.functions = wiring.functions;
        self.outputs = wiring.outputs;
        Ok(())
    }
}
