//! Directional index `|+DI - -DI| / (+DI + -DI) * 100`.

use super::params::{DxParams, FunctionParams};
use super::{output_series, Computation, FunctionError, FunctionKind, Parts};
use crate::cache::FunctionCache;
use crate::series::{is_sentinel, BaseSeries, SENTINEL};
use std::sync::Arc;

pub(super) fn build(
    base: &Arc<BaseSeries>,
    params: &DxParams,
    cache: &FunctionCache,
) -> Result<Parts, FunctionError> {
    let di = cache.acquire(
        base,
        FunctionParams::directional_index(params.period.clone()),
    )?;
    let outputs = output_series(FunctionKind::Dx);
    let out = Arc::clone(&outputs[0]);
    let di_plus = Arc::clone(&di.outputs()[0]);
    let di_minus = Arc::clone(&di.outputs()[1]);
    let period = params.period.period();

    Ok(Parts {
        outputs,
        dependencies: vec![di],
        computation: Computation::Spot(Box::new(move |i| {
            let value = if i + 1 < period {
                SENTINEL
            } else {
                dx_of(di_plus.get(i), di_minus.get(i))
            };
            out.set(i, value)
        })),
    })
}

/// A zero sum (no directional movement at all) resolves to `0`.
fn dx_of(plus: f32, minus: f32) -> f32 {
    if is_sentinel(plus) || is_sentinel(minus) {
        return SENTINEL;
    }
    let sum = plus + minus;
    if sum == 0.0 {
        0.0
    } else {
        (plus - minus).abs() / sum * 100.0
    }
}
