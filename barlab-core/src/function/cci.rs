//! Commodity Channel Index over the typical price `(high + low + close) / 3`.

use super::params::CciParams;
use super::{output_series, Computation, FunctionKind, Parts};
use crate::series::{BaseSeries, IndexedSeries, SENTINEL};
use std::sync::Arc;

pub(super) fn build(base: &Arc<BaseSeries>, params: &CciParams) -> Parts {
    let outputs = output_series(FunctionKind::Cci);
    let out = Arc::clone(&outputs[0]);
    let high = Arc::clone(base.high());
    let low = Arc::clone(base.low());
    let close = Arc::clone(base.close());
    let period = params.period.period();
    let alpha = params.alpha.value();

    Parts {
        outputs,
        dependencies: Vec::new(),
        computation: Computation::Spot(Box::new(move |i| {
            out.set(i, cci_at(&high, &low, &close, i, period, alpha))
        })),
    }
}

fn cci_at(
    high: &IndexedSeries,
    low: &IndexedSeries,
    close: &IndexedSeries,
    i: usize,
    period: usize,
    alpha: f64,
) -> f32 {
    if i + 1 < period {
        return SENTINEL;
    }
    let typical: Vec<f64> = (i + 1 - period..=i)
        .map(|j| (high.get(j) as f64 + low.get(j) as f64 + close.get(j) as f64) / 3.0)
        .collect();
    if typical.iter().any(|tp| tp.is_nan()) {
        return SENTINEL;
    }
    let n = period as f64;
    let mean = typical.iter().sum::<f64>() / n;
    let mean_dev = typical.iter().map(|tp| (tp - mean).abs()).sum::<f64>() / n;
    let denominator = alpha * mean_dev;
    if denominator == 0.0 {
        return 0.0;
    }
    ((typical[period - 1] - mean) / denominator) as f32
}
