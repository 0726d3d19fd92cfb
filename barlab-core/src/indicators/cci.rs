//! CCI: Commodity Channel Index and a moving average of it.

use super::{require, IndicatorError, IndicatorKind, IndicatorMeta, OutputVar, PlotStyle, Wiring};
use crate::cache::FunctionCache;
use crate::function::{FunctionError, FunctionParams, Input};
use crate::option::ComputableOption;
use crate::series::BaseSeries;
use std::sync::Arc;

const ALPHA: &str = "Alpha";
const PERIOD: &str = "Period";
const PERIOD_MA: &str = "Period MA";

pub(super) fn meta() -> IndicatorMeta {
    IndicatorMeta {
        short_name: "CCI",
        long_name: "Commodity Channel Index",
        grids: vec![100.0, -100.0],
        overlay: false,
    }
}

pub(super) fn default_options() -> Vec<ComputableOption> {
    vec![
        ComputableOption::new(ALPHA, 0.015).with_bounds(0.001, 1.0, 0.001),
        ComputableOption::new(PERIOD, 20.0).with_bounds(2.0, 500.0, 1.0),
        ComputableOption::new(PERIOD_MA, 3.0).with_bounds(1.0, 500.0, 1.0),
    ]
}

pub(super) fn wire(
    base: &Arc<BaseSeries>,
    options: &[ComputableOption],
    cache: &FunctionCache,
) -> Result<Wiring, IndicatorError> {
    let alpha = require(IndicatorKind::Cci, options, ALPHA)?;
    let period = require(IndicatorKind::Cci, options, PERIOD)?;
    let period_ma = require(IndicatorKind::Cci, options, PERIOD_MA)?;

    let cci = cache.acquire(base, FunctionParams::cci(period.clone(), alpha.clone()))?;
    let cci_out = Input::output(&cci, 0).ok_or(FunctionError::Unbound(cci.kind()))?;
    let cci_ma = cache.acquire(base, FunctionParams::ma(cci_out, period_ma.clone()))?;

    let outputs = vec![
        OutputVar::of("CCI", PlotStyle::Line, &cci, "cci")?,
        OutputVar::of("MACCI", PlotStyle::Line, &cci_ma, "ma")?,
    ];
    Ok(Wiring {
        functions: vec![cci, cci_ma],
        outputs,
    })
}
