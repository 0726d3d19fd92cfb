//! Directional movement and the smoothed directional indicators built on it.

use super::math::{ratio_or_zero, wilder_at};
use super::params::{DirectionalIndexParams, FunctionParams};
use super::{output_series, Computation, FunctionError, FunctionKind, Parts};
use crate::cache::FunctionCache;
use crate::series::{is_sentinel, BaseSeries, SENTINEL};
use std::sync::Arc;

/// `+DM`, `-DM` and true range for one bar. Undefined at bar 0.
pub(super) fn build_movement(base: &Arc<BaseSeries>) -> Parts {
    let outputs = output_series(FunctionKind::DirectionalMovement);
    let (dm_plus, dm_minus, tr) = (
        Arc::clone(&outputs[0]),
        Arc::clone(&outputs[1]),
        Arc::clone(&outputs[2]),
    );
    let high = Arc::clone(base.high());
    let low = Arc::clone(base.low());
    let close = Arc::clone(base.close());

    Parts {
        outputs,
        dependencies: Vec::new(),
        computation: Computation::Spot(Box::new(move |i| {
            let (plus, minus, range) = match i.checked_sub(1) {
                Some(prev) => movement(
                    [high.get(i), low.get(i)],
                    [high.get(prev), low.get(prev), close.get(prev)],
                ),
                None => (SENTINEL, SENTINEL, SENTINEL),
            };
            dm_plus.set(i, plus)?;
            dm_minus.set(i, minus)?;
            tr.set(i, range)
        })),
    }
}

fn movement([high, low]: [f32; 2], [prev_high, prev_low, prev_close]: [f32; 3]) -> (f32, f32, f32) {
    if [high, low, prev_high, prev_low, prev_close]
        .iter()
        .any(|v| is_sentinel(*v))
    {
        return (SENTINEL, SENTINEL, SENTINEL);
    }
    let up = high - prev_high;
    let down = prev_low - low;
    let plus = if up > down && up > 0.0 { up } else { 0.0 };
    let minus = if down > up && down > 0.0 { down } else { 0.0 };
    let range = (high - low)
        .max((high - prev_close).abs())
        .max((low - prev_close).abs());
    (plus, minus, range)
}

/// `+DI` and `-DI`: Wilder-smoothed movement over Wilder-smoothed true range,
/// scaled to 0..100. The smoothed columns are kept as outputs because each
/// bar reads its own previous value.
pub(super) fn build_index(
    base: &Arc<BaseSeries>,
    params: &DirectionalIndexParams,
    cache: &FunctionCache,
) -> Result<Parts, FunctionError> {
    let dm = cache.acquire(base, FunctionParams::DirectionalMovement)?;
    let outputs = output_series(FunctionKind::DirectionalIndex);
    let [di_plus, di_minus, sm_plus, sm_minus, sm_tr] =
        std::array::from_fn(|n| Arc::clone(&outputs[n]));
    let [dm_plus, dm_minus, tr] = std::array::from_fn(|n| Arc::clone(&dm.outputs()[n]));
    let period = params.period.period();

    Ok(Parts {
        outputs,
        dependencies: vec![dm],
        computation: Computation::Continuous(Box::new(move |beg, end| {
            for i in beg..end {
                let plus = wilder_at(&dm_plus, &sm_plus, i, period);
                let minus = wilder_at(&dm_minus, &sm_minus, i, period);
                let range = wilder_at(&tr, &sm_tr, i, period);
                sm_plus.set(i, plus)?;
                sm_minus.set(i, minus)?;
                sm_tr.set(i, range)?;
                di_plus.set(i, 100.0 * ratio_or_zero(plus, range))?;
                di_minus.set(i, 100.0 * ratio_or_zero(minus, range))?;
            }
            Ok(())
        })),
    })
}
