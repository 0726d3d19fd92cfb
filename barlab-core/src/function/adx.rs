//! Average directional index: Wilder-smoothed DX.

use super::math::wilder_at;
use super::params::{AdxParams, FunctionParams};
use super::{output_series, Computation, FunctionError, FunctionKind, Parts};
use crate::cache::FunctionCache;
use crate::series::BaseSeries;
use std::sync::Arc;

pub(super) fn build(
    base: &Arc<BaseSeries>,
    params: &AdxParams,
    cache: &FunctionCache,
) -> Result<Parts, FunctionError> {
    let dx = cache.acquire(base, FunctionParams::dx(params.period.clone()))?;
    let outputs = output_series(FunctionKind::Adx);
    let out = Arc::clone(&outputs[0]);
    let input = Arc::clone(&dx.outputs()[0]);
    let period = params.period.period();

    Ok(Parts {
        outputs,
        dependencies: vec![dx],
        computation: Computation::Continuous(Box::new(move |beg, end| {
            for i in beg..end {
                out.set(i, wilder_at(&input, &out, i, period))?;
            }
            Ok(())
        })),
    })
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::super::{FunctionKind, FunctionParams};
    use crate::cache::FunctionCache;
    use crate::domain::SessionId;
    use crate::option::ComputableOption;
    use crate::series::is_sentinel;

    #[test]
    fn adx_chain_in_range() {
        let closes: Vec<f32> = (0..40)
            .map(|i| 100.0 + (i as f32 * 0.7).sin() * 5.0 + i as f32 * 0.3)
            .collect();
        let base = make_base(&closes);
        let cache = FunctionCache::new();
        let adx = cache
            .acquire(&base, FunctionParams::adx(ComputableOption::new("Period", 5.0)))
            .unwrap();
        adx.compute_to(SessionId(1), 39).unwrap();

        // adx -> dx -> di -> dm, all shared through the cache.
        assert_eq!(cache.live_count(), 4);
        assert_eq!(adx.dependencies()[0].kind(), FunctionKind::Dx);

        let out = adx.output(0).unwrap().snapshot();
        assert_eq!(out.len(), 40);
        let first = out.iter().position(|v| !is_sentinel(*v)).unwrap();
        // dm from 1, di from 5, dx from 5, adx from 9.
        assert_eq!(first, 9);
        assert!(out[first..].iter().all(|v| (0.0..=100.0).contains(v)));
    }
}
