//! DMI: +DI, -DI and ADX over one period.

use super::{require, IndicatorError, IndicatorKind, IndicatorMeta, OutputVar, PlotStyle, Wiring};
use crate::cache::FunctionCache;
use crate::function::FunctionParams;
use crate::option::ComputableOption;
use crate::series::BaseSeries;
use std::sync::Arc;

const PERIOD: &str = "Period";

pub(super) fn meta() -> IndicatorMeta {
    IndicatorMeta {
        short_name: "DMI",
        long_name: "Directional Movement Index",
        grids: vec![25.0],
        overlay: false,
    }
}

pub(super) fn default_options() -> Vec<ComputableOption> {
    vec![ComputableOption::new(PERIOD, 14.0).with_bounds(1.0, 500.0, 1.0)]
}

pub(super) fn wire(
    base: &Arc<BaseSeries>,
    options: &[ComputableOption],
    cache: &FunctionCache,
) -> Result<Wiring, IndicatorError> {
    let period = require(IndicatorKind::Dmi, options, PERIOD)?;

    // ADX reaches the same directional index through DX, so both share it.
    let di = cache.acquire(base, FunctionParams::directional_index(period.clone()))?;
    let adx = cache.acquire(base, FunctionParams::adx(period.clone()))?;

    let outputs = vec![
        OutputVar::of("DI+", PlotStyle::Line, &di, "di_plus")?,
        OutputVar::of("DI-", PlotStyle::Line, &di, "di_minus")?,
        OutputVar::of("ADX", PlotStyle::Line, &adx, "adx")?,
    ];
    Ok(Wiring {
        functions: vec![di, adx],
        outputs,
    })
}
