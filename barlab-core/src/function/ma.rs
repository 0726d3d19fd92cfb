//! Simple moving average over any input column.

use super::math::window_mean;
use super::params::MaParams;
use super::{output_series, Computation, FunctionKind, Parts};
use crate::series::{is_sentinel, IndexedSeries, SENTINEL};
use std::sync::Arc;

pub(super) fn build(params: &MaParams) -> Parts {
    let outputs = output_series(FunctionKind::Ma);
    let input = Arc::clone(params.input.series());
    let out = Arc::clone(&outputs[0]);
    let period = params.period.period();

    Parts {
        outputs,
        dependencies: params.input.source().cloned().into_iter().collect(),
        computation: Computation::Continuous(Box::new(move |beg, end| {
            for i in beg..end {
                out.set(i, ma_at(&input, &out, i, period))?;
            }
            Ok(())
        })),
    }
}

/// Rolling update from the previous average when it is known, otherwise the
/// full window mean.
///
/// Every index that is a multiple of `period` re-seeds from the window mean,
/// so f32 rounding in the stored average carries over at most one window.
/// The re-seed points depend only on `i`, never on where a call started.
fn ma_at(input: &IndexedSeries, out: &IndexedSeries, i: usize, period: usize) -> f32 {
    if i + 1 < period {
        return SENTINEL;
    }
    let prev = out.get_back(i, 1);
    if i >= period && i % period != 0 && !is_sentinel(prev) {
        let entering = input.get(i);
        let leaving = input.get(i - period);
        if !is_sentinel(entering) && !is_sentinel(leaving) {
            let next = prev as f64 + (entering as f64 - leaving as f64) / period as f64;
            return next as f32;
        }
    }
    window_mean(input, i, period)
}

#[cfg(test)]
mod tests {
    use super::super::math::window_mean;
    use super::super::testing::*;
    use super::super::{FunctionParams, Input};
    use crate::cache::FunctionCache;
    use crate::domain::SessionId;
    use crate::option::ComputableOption;
    use crate::series::{is_sentinel, PriceField};

    #[test]
    fn ma3_matches_window_means() {
        let closes = [10.0, 11.0, 12.0, 11.0, 10.0, 9.0, 10.0, 11.0, 12.0, 13.0];
        let base = make_base(&closes);
        let cache = FunctionCache::new();
        let f = cache
            .acquire(
                &base,
                FunctionParams::ma(
                    Input::field(&base, PriceField::Close),
                    ComputableOption::new("Period", 3.0),
                ),
            )
            .unwrap();
        f.compute_to(SessionId(1), 9).unwrap();
        let ma = f.output(0).unwrap();
        assert!(is_sentinel(ma.get(0)));
        assert!(is_sentinel(ma.get(1)));
        for i in 2..closes.len() {
            let expected = (closes[i - 2] + closes[i - 1] + closes[i]) / 3.0;
            assert_approx(ma.get(i), expected, EPSILON);
        }
        assert_approx(ma.get(2), 11.0, EPSILON);
        assert_approx(ma.get(9), 12.0, EPSILON);
    }

    #[test]
    fn long_history_stays_on_window_mean() {
        // Deterministic random walk around 1300.
        let mut state = 0x2545_f491_u32;
        let mut price = 1300.0_f32;
        let closes: Vec<f32> = (0..50_000)
            .map(|_| {
                state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
                price += ((state >> 8) as f32 / (1u32 << 24) as f32 - 0.5) * 2.0;
                price
            })
            .collect();
        let base = make_base(&closes);
        let cache = FunctionCache::new();
        let f = cache
            .acquire(
                &base,
                FunctionParams::ma(
                    Input::field(&base, PriceField::Close),
                    ComputableOption::new("Period", 20.0),
                ),
            )
            .unwrap();
        f.compute_to(SessionId(1), closes.len() - 1).unwrap();
        let ma = f.output(0).unwrap();
        let close = base.close();
        let worst = (19..closes.len())
            .map(|i| (ma.get(i) - window_mean(close, i, 20)).abs())
            .fold(0.0_f32, f32::max);
        assert!(worst < 2e-3, "max drift {worst}");
    }

    #[test]
    fn period_longer_than_history_is_all_sentinel() {
        let base = make_base(&[1.0, 2.0, 3.0]);
        let cache = FunctionCache::new();
        let f = cache
            .acquire(
                &base,
                FunctionParams::ma(
                    Input::field(&base, PriceField::Close),
                    ComputableOption::new("Period", 5.0),
                ),
            )
            .unwrap();
        f.compute_to(SessionId(1), 2).unwrap();
        assert_eq!(f.output(0).unwrap().size(), 3);
        assert!(f.output(0).unwrap().snapshot().iter().all(|v| is_sentinel(*v)));
    }
}
