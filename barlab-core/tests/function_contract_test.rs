//! Function contract tests: session semantics, sentinel gaps, cache identity
//! and the degenerate-denominator conventions, driven through the public API.

use barlab_core::cache::FunctionCache;
use barlab_core::domain::{Bar, SessionId};
use barlab_core::function::{FunctionError, FunctionKind, FunctionParams, Input};
use barlab_core::option::ComputableOption;
use barlab_core::series::{is_sentinel, BaseSeries, IndexedSeries, PriceField, SeriesError};
use barlab_core::session::SessionClock;
use chrono::{NaiveDate, NaiveDateTime};
use std::sync::Arc;

fn day(n: usize) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
        + chrono::Duration::days(n as i64)
}

fn base_from_closes(closes: &[f32]) -> Arc<BaseSeries> {
    let base = BaseSeries::new("E2E", "1d");
    for (i, &c) in closes.iter().enumerate() {
        base.append(&Bar::new(day(i), c, c + 0.5, c - 0.5, c, 100.0))
            .unwrap();
    }
    Arc::new(base)
}

fn ma_params(base: &BaseSeries, period: f64) -> FunctionParams {
    FunctionParams::ma(
        Input::field(base, PriceField::Close),
        ComputableOption::new("Period", period),
    )
}

const CLOSES: [f32; 10] = [10.0, 11.0, 12.0, 11.0, 10.0, 9.0, 10.0, 11.0, 12.0, 13.0];

#[test]
fn end_to_end_ma3() {
    let base = base_from_closes(&CLOSES);
    let cache = FunctionCache::new();
    let clock = SessionClock::new();
    let ma = cache.acquire(&base, ma_params(&base, 3.0)).unwrap();

    ma.compute_to(clock.begin(), 9).unwrap();
    let out = ma.output_by_name("ma").unwrap();
    assert!(is_sentinel(out.get(0)));
    assert!(is_sentinel(out.get(1)));
    assert!((out.get(2) - 11.0).abs() < 1e-4);
    assert!((out.get(9) - 12.0).abs() < 1e-4);
}

#[test]
fn idempotent_within_session() {
    let base = base_from_closes(&CLOSES);
    let cache = FunctionCache::new();
    let adx = cache
        .acquire(&base, FunctionParams::adx(ComputableOption::new("Period", 3.0)))
        .unwrap();
    let session = SessionId(7);
    adx.compute_to(session, 9).unwrap();
    let first = adx.output(0).unwrap().snapshot();
    adx.compute_to(session, 9).unwrap();
    adx.compute_to(session, 4).unwrap();
    let second = adx.output(0).unwrap().snapshot();
    assert_eq!(first.len(), second.len());
    for (a, b) in first.iter().zip(&second) {
        assert!(a == b || (a.is_nan() && b.is_nan()));
    }
    assert_eq!(adx.computed(), Some(9));
}

#[test]
fn monotonic_coverage() {
    let base = base_from_closes(&CLOSES);
    let cache = FunctionCache::new();
    let dx = cache
        .acquire(&base, FunctionParams::dx(ComputableOption::new("Period", 2.0)))
        .unwrap();
    let clock = SessionClock::new();
    let session = clock.begin();
    for k in 0..CLOSES.len() {
        dx.compute_to(session, k).unwrap();
        assert_eq!(dx.computed(), Some(k));
        assert!(dx.output(0).unwrap().size() > k);
    }
}

#[test]
fn insufficient_history_is_sentinel_not_zero() {
    let base = base_from_closes(&CLOSES[..4]);
    let cache = FunctionCache::new();
    for params in [
        ma_params(&base, 5.0),
        FunctionParams::ema(
            Input::field(&base, PriceField::Close),
            ComputableOption::new("Period", 5.0),
        ),
        FunctionParams::cci(
            ComputableOption::new("Period", 5.0),
            ComputableOption::new("Alpha", 0.015),
        ),
        FunctionParams::dx(ComputableOption::new("Period", 5.0)),
    ] {
        let kind = params.kind();
        let f = cache.acquire(&base, params).unwrap();
        f.compute_to(SessionId(1), 3).unwrap();
        let values = f.output(0).unwrap().snapshot();
        assert_eq!(values.len(), 4, "{kind}");
        assert!(values.iter().all(|v| is_sentinel(*v)), "{kind}: {values:?}");
    }
}

#[test]
fn cache_shares_identical_requests() {
    let base = base_from_closes(&CLOSES);
    let cache = FunctionCache::new();
    let a = cache.acquire(&base, ma_params(&base, 20.0)).unwrap();
    let b = cache.acquire(&base, ma_params(&base, 20.0)).unwrap();
    assert!(Arc::ptr_eq(&a, &b));
    assert!(b.id_equals(&base, &ma_params(&base, 20.0)));

    let ema = cache
        .acquire(
            &base,
            FunctionParams::ema(
                Input::field(&base, PriceField::Close),
                ComputableOption::new("Period", 20.0),
            ),
        )
        .unwrap();
    assert!(!Arc::ptr_eq(&a, &ema));
    assert_eq!(a.kind(), FunctionKind::Ma);
    assert_eq!(ema.kind(), FunctionKind::Ema);
}

#[test]
fn dx_zero_denominator_on_flat_bars() {
    let base = BaseSeries::new("FLAT", "1d");
    for i in 0..10 {
        base.append(&Bar::new(day(i), 50.0, 50.0, 50.0, 50.0, 10.0))
            .unwrap();
    }
    let base = Arc::new(base);
    let cache = FunctionCache::new();
    let dx = cache
        .acquire(&base, FunctionParams::dx(ComputableOption::new("Period", 3.0)))
        .unwrap();
    dx.compute_to(SessionId(1), 9).unwrap();
    let out = dx.output(0).unwrap();
    for i in 3..10 {
        assert_eq!(out.get(i), 0.0, "dx[{i}] must be 0, not NaN");
    }
}

#[test]
fn storage_is_append_only() {
    let series = IndexedSeries::from_values("x", vec![1.0, 2.0, 3.0]);
    assert!(matches!(
        series.set(5, 9.0),
        Err(SeriesError::IndexOutOfBounds { index: 5, size: 3, .. })
    ));
    assert_eq!(series.size(), 3);
    series.set(3, 4.0).unwrap();
    series.set(0, 0.5).unwrap();
    assert_eq!(series.snapshot(), vec![0.5, 2.0, 3.0, 4.0]);
    assert!(is_sentinel(series.get(4)));
}

#[test]
fn rebinding_differently_is_a_configuration_error() {
    let base = base_from_closes(&CLOSES);
    let cache = FunctionCache::new();
    let ma = cache.acquire(&base, ma_params(&base, 3.0)).unwrap();
    let err = ma.bind(&base, ma_params(&base, 4.0), &cache).unwrap_err();
    assert!(matches!(err, FunctionError::AlreadyBound { .. }));
    // The failed bind leaves the function untouched.
    ma.compute_to(SessionId(1), 9).unwrap();
    assert!((ma.output(0).unwrap().get(2) - 11.0).abs() < 1e-4);
}

#[test]
fn new_session_recomputes_frontier() {
    let base = base_from_closes(&CLOSES[..5]);
    let cache = FunctionCache::new();
    let cci = cache
        .acquire(
            &base,
            FunctionParams::cci(
                ComputableOption::new("Period", 3.0),
                ComputableOption::new("Alpha", 0.015),
            ),
        )
        .unwrap();
    let clock = SessionClock::new();
    cci.compute_to(clock.begin(), 4).unwrap();
    let before = cci.output(0).unwrap().get(4);

    // Revise the frontier bar without invalidating anything.
    base.update_last(&Bar::new(day(4), 10.0, 30.0, 5.0, 30.0, 100.0))
        .unwrap();
    cci.compute_to(clock.begin(), 4).unwrap();
    assert_ne!(cci.output(0).unwrap().get(4), before);
}
