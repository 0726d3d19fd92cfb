//! Sentinel-propagating numeric helpers shared by the function kinds.

use crate::series::{is_sentinel, IndexedSeries, SENTINEL};

/// Mean of the `len` values ending at `end` (inclusive).
///
/// Sentinel when the window starts before bar 0, reaches past the frontier,
/// or contains a sentinel.
pub(crate) fn window_mean(series: &IndexedSeries, end: usize, len: usize) -> f32 {
    if len == 0 || end + 1 < len {
        return SENTINEL;
    }
    series.read(|values| {
        if end >= values.len() {
            return SENTINEL;
        }
        let sum: f64 = values[end + 1 - len..=end].iter().map(|&v| v as f64).sum();
        (sum / len as f64) as f32
    })
}

/// Wilder smoothing at `i`: `prev + (x - prev) / period`.
///
/// Seeds (or re-seeds after a gap) from the plain window mean when the
/// previous smoothed value is unknown.
pub(crate) fn wilder_at(
    input: &IndexedSeries,
    smoothed: &IndexedSeries,
    i: usize,
    period: usize,
) -> f32 {
    let prev = smoothed.get_back(i, 1);
    if is_sentinel(prev) {
        return window_mean(input, i, period);
    }
    let x = input.get(i) as f64;
    let prev = prev as f64;
    (prev + (x - prev) / period as f64) as f32
}

/// `num / den`, with a zero denominator resolving to `0`.
pub(crate) fn ratio_or_zero(num: f32, den: f32) -> f32 {
    if is_sentinel(num) || is_sentinel(den) {
        SENTINEL
    } else if den == 0.0 {
        0.0
    } else {
        num / den
    }
}
