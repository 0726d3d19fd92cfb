//! MA: three simple moving averages of the close, drawn over the price.

use super::{require, IndicatorError, IndicatorKind, IndicatorMeta, OutputVar, PlotStyle, Wiring};
use crate::cache::FunctionCache;
use crate::function::{FunctionParams, Input};
use crate::option::ComputableOption;
use crate::series::{BaseSeries, PriceField};
use std::sync::Arc;

const PERIODS: [(&str, &str, f64); 3] = [
    ("Period 1", "MA1", 5.0),
    ("Period 2", "MA2", 10.0),
    ("Period 3", "MA3", 20.0),
];

pub(super) fn meta() -> IndicatorMeta {
    IndicatorMeta {
        short_name: "MA",
        long_name: "Moving Average",
        grids: Vec::new(),
        overlay: true,
    }
}

pub(super) fn default_options() -> Vec<ComputableOption> {
    PERIODS
        .iter()
        .map(|(label, _, period)| ComputableOption::new(*label, *period).with_bounds(1.0, 500.0, 1.0))
        .collect()
}

pub(super) fn wire(
    base: &Arc<BaseSeries>,
    options: &[ComputableOption],
    cache: &FunctionCache,
) -> Result<Wiring, IndicatorError> {
    let close = Input::field(base, PriceField::Close);
    let mut functions = Vec::with_capacity(PERIODS.len());
    let mut outputs = Vec::with_capacity(PERIODS.len());
    for (label, name, _) in PERIODS {
        let period = require(IndicatorKind::Ma, options, label)?;
        let ma = cache.acquire(base, FunctionParams::ma(close.clone(), period.clone()))?;
        outputs.push(OutputVar::of(name, PlotStyle::Line, &ma, "ma")?);
        functions.push(ma);
    }
    Ok(Wiring { functions, outputs })
}
