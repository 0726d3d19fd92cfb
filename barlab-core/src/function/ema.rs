//! Exponential moving average, seeded with the simple mean of its first window.

use super::math::window_mean;
use super::params::EmaParams;
use super::{output_series, Computation, FunctionKind, Parts};
use crate::series::{is_sentinel, IndexedSeries, SENTINEL};
use std::sync::Arc;

pub(super) fn build(params: &EmaParams) -> Parts {
    let outputs = output_series(FunctionKind::Ema);
    let input = Arc::clone(params.input.series());
    let out = Arc::clone(&outputs[0]);
    let period = params.period.period();

    Parts {
        outputs,
        dependencies: params.input.source().cloned().into_iter().collect(),
        computation: Computation::Continuous(Box::new(move |beg, end| {
            for i in beg..end {
                out.set(i, ema_at(&input, &out, i, period))?;
            }
            Ok(())
        })),
    }
}

fn ema_at(input: &IndexedSeries, out: &IndexedSeries, i: usize, period: usize) -> f32 {
    if i + 1 < period {
        return SENTINEL;
    }
    let prev = out.get_back(i, 1);
    if is_sentinel(prev) {
        return window_mean(input, i, period);
    }
    let alpha = 2.0 / (period as f64 + 1.0);
    let x = input.get(i) as f64;
    let prev = prev as f64;
    (prev + alpha * (x - prev)) as f32
}
