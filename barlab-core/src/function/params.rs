//! Strongly typed parameter sets, one per function kind.

use super::{Function, FunctionKind};
use crate::option::ComputableOption;
use crate::series::{BaseSeries, IndexedSeries, PriceField};
use std::sync::Arc;

/// Input column of a function: a raw quote column or another function's output.
///
/// When the column belongs to another function, that function becomes a
/// dependency and is computed first.
#[derive(Debug, Clone)]
pub struct Input {
    series: Arc<IndexedSeries>,
    source: Option<Arc<Function>>,
}

impl Input {
    /// A raw column of `base`.
    pub fn field(base: &BaseSeries, field: PriceField) -> Self {
        Self {
            series: Arc::clone(base.column(field)),
            source: None,
        }
    }

    /// Output `index` of `function`, or `None` if the function has no such output.
    pub fn output(function: &Arc<Function>, index: usize) -> Option<Self> {
        let series = function.output(index)?;
        Some(Self {
            series: Arc::clone(series),
            source: Some(Arc::clone(function)),
        })
    }

    pub fn series(&self) -> &Arc<IndexedSeries> {
        &self.series
    }

    pub fn source(&self) -> Option<&Arc<Function>> {
        self.source.as_ref()
    }
}

#[derive(Debug, Clone)]
pub struct MaParams {
    pub input: Input,
    pub period: ComputableOption,
}

#[derive(Debug, Clone)]
pub struct EmaParams {
    pub input: Input,
    pub period: ComputableOption,
}

#[derive(Debug, Clone)]
pub struct CciParams {
    pub period: ComputableOption,
    pub alpha: ComputableOption,
}

#[derive(Debug, Clone)]
pub struct DirectionalIndexParams {
    pub period: ComputableOption,
}

#[derive(Debug, Clone)]
pub struct DxParams {
    pub period: ComputableOption,
}

#[derive(Debug, Clone)]
pub struct AdxParams {
    pub period: ComputableOption,
}

/// Parameters for binding a function of a given kind.
#[derive(Debug, Clone)]
pub enum FunctionParams {
    Ma(MaParams),
    Ema(EmaParams),
    Cci(CciParams),
    DirectionalMovement,
    DirectionalIndex(DirectionalIndexParams),
    Dx(DxParams),
    Adx(AdxParams),
}

impl FunctionParams {
    pub fn ma(input: Input, period: ComputableOption) -> Self {
        FunctionParams::Ma(MaParams { input, period })
    }

    pub fn ema(input: Input, period: ComputableOption) -> Self {
        FunctionParams::Ema(EmaParams { input, period })
    }

    pub fn cci(period: ComputableOption, alpha: ComputableOption) -> Self {
        FunctionParams::Cci(CciParams { period, alpha })
    }

    pub fn directional_index(period: ComputableOption) -> Self {
        FunctionParams::DirectionalIndex(DirectionalIndexParams { period })
    }

    pub fn dx(period: ComputableOption) -> Self {
        FunctionParams::Dx(DxParams { period })
    }

    pub fn adx(period: ComputableOption) -> Self {
        FunctionParams::Adx(AdxParams { period })
    }

    pub fn kind(&self) -> FunctionKind {
        match self {
            FunctionParams::Ma(_) => FunctionKind::Ma,
            FunctionParams::Ema(_) => FunctionKind::Ema,
            FunctionParams::Cci(_) => FunctionKind::Cci,
            FunctionParams::DirectionalMovement => FunctionKind::DirectionalMovement,
            FunctionParams::DirectionalIndex(_) => FunctionKind::DirectionalIndex,
            FunctionParams::Dx(_) => FunctionKind::Dx,
            FunctionParams::Adx(_) => FunctionKind::Adx,
        }
    }

    /// Input columns, in declaration order.
    pub fn inputs(&self) -> Vec<&Input> {
        match self {
            FunctionParams::Ma(p) => vec![&p.input],
            FunctionParams::Ema(p) => vec![&p.input],
            _ => Vec::new(),
        }
    }

    /// Options, in declaration order.
    pub fn options(&self) -> Vec<&ComputableOption> {
        match self {
            FunctionParams::Ma(p) => vec![&p.period],
            FunctionParams::Ema(p) => vec![&p.period],
            FunctionParams::Cci(p) => vec![&p.period, &p.alpha],
            FunctionParams::DirectionalMovement => Vec::new(),
            FunctionParams::DirectionalIndex(p) => vec![&p.period],
            FunctionParams::Dx(p) => vec![&p.period],
            FunctionParams::Adx(p) => vec![&p.period],
        }
    }
}
