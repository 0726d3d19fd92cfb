//! VOL: raw volume bars with a short and a mid moving average.

use super::{require, IndicatorError, IndicatorKind, IndicatorMeta, OutputVar, PlotStyle, Wiring};
use crate::cache::FunctionCache;
use crate::function::{FunctionParams, Input};
use crate::option::ComputableOption;
use crate::series::{BaseSeries, PriceField};
use std::sync::Arc;

const PERIOD_SHORT: &str = "Period Short";
const PERIOD_MID: &str = "Period Mid";

pub(super) fn meta() -> IndicatorMeta {
    IndicatorMeta {
        short_name: "VOL",
        long_name: "Volume",
        grids: Vec::new(),
        overlay: false,
    }
}

pub(super) fn default_options() -> Vec<ComputableOption> {
    vec![
        ComputableOption::new(PERIOD_SHORT, 5.0).with_bounds(1.0, 500.0, 1.0),
        ComputableOption::new(PERIOD_MID, 10.0).with_bounds(1.0, 500.0, 1.0),
    ]
}

pub(super) fn wire(
    base: &Arc<BaseSeries>,
    options: &[ComputableOption],
    cache: &FunctionCache,
) -> Result<Wiring, IndicatorError> {
    let short = require(IndicatorKind::Vol, options, PERIOD_SHORT)?;
    let mid = require(IndicatorKind::Vol, options, PERIOD_MID)?;
    let volume = Input::field(base, PriceField::Volume);

    let ma1 = cache.acquire(base, FunctionParams::ma(volume.clone(), short.clone()))?;
    let ma2 = cache.acquire(base, FunctionParams::ma(volume, mid.clone()))?;

    let outputs = vec![
        OutputVar::new("VOL", PlotStyle::Volume, Arc::clone(base.volume())),
        OutputVar::of("MA1", PlotStyle::Line, &ma1, "ma")?,
        OutputVar::of("MA2", PlotStyle::Line, &ma2, "ma")?,
    ];
    Ok(Wiring {
        functions: vec![ma1, ma2],
        outputs,
    })
}
