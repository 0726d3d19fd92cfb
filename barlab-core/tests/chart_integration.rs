//! Chart-level integration: TOML config to refreshed outputs, sharing across
//! indicators, release on teardown, and independent charts on worker threads.

use barlab_core::chart::{Chart, ChartError};
use barlab_core::config::ChartConfig;
use barlab_core::domain::Bar;
use barlab_core::fingerprint::IndicatorConfig;
use barlab_core::indicators::{IndicatorError, PlotStyle};
use barlab_core::series::is_sentinel;
use chrono::NaiveDate;
use std::sync::Arc;

fn make_test_bars(n: usize, drift: f32) -> Vec<Bar> {
    let start = NaiveDate::from_ymd_opt(2023, 6, 1)
        .unwrap()
        .and_hms_opt(9, 30, 0)
        .unwrap();
    (0..n)
        .map(|i| {
            let close = 100.0 + drift * i as f32 + (i as f32 * 0.4).sin() * 3.0;
            let open = close - 0.4;
            Bar::new(
                start + chrono::Duration::hours(i as i64),
                open,
                close.max(open) + 1.0,
                close.min(open) - 1.0,
                close,
                5000.0 + (i % 10) as f32 * 100.0,
            )
        })
        .collect()
}

const CONFIG: &str = r#"
symbol = "SPY"
timeframe = "1h"

[[indicators]]
kind = "cci"
params = { "Period" = 14.0, "Period MA" = 3.0 }

[[indicators]]
kind = "cci"
params = { "Period" = 14.0, "Period MA" = 5.0 }

[[indicators]]
kind = "dmi"

[[indicators]]
kind = "vol"
"#;

#[test]
fn toml_config_to_refreshed_outputs() {
    let config = ChartConfig::from_toml(CONFIG).unwrap();
    let chart = Chart::from_config(&config).unwrap();
    for bar in make_test_bars(120, 0.2) {
        chart.append(&bar).unwrap();
    }
    chart.refresh().unwrap();

    assert_eq!(chart.indicator_count(), 4);
    for indicator in chart.indicators() {
        for output in indicator.outputs() {
            let values = output.series().snapshot();
            assert_eq!(values.len(), 120, "{}/{}", indicator.kind(), output.name());
            assert!(
                !is_sentinel(values[119]),
                "{}/{} undefined at the frontier",
                indicator.kind(),
                output.name()
            );
        }
    }
    let vol = chart.indicator(3).unwrap();
    assert_eq!(vol.output("VOL").unwrap().plot(), PlotStyle::Volume);
    assert_eq!(vol.meta().short_name, "VOL");
}

#[test]
fn indicators_share_one_cci() {
    let config = ChartConfig::from_toml(CONFIG).unwrap();
    let chart = Chart::from_config(&config).unwrap();
    let first = chart.indicator(0).unwrap();
    let second = chart.indicator(1).unwrap();
    assert!(Arc::ptr_eq(&first.functions()[0], &second.functions()[0]));
    assert!(!Arc::ptr_eq(&first.functions()[1], &second.functions()[1]));
    // cci + two MAs, dm + di + dx + adx, two volume MAs
    assert_eq!(chart.cache().live_count(), 3 + 4 + 2);
}

#[test]
fn removing_indicators_releases_functions() {
    let config = ChartConfig::from_toml(CONFIG).unwrap();
    let mut chart = Chart::from_config(&config).unwrap();
    while chart.indicator_count() > 0 {
        chart.remove_indicator(0).unwrap();
    }
    assert!(chart.cache().is_empty());
    // Each removal purged its predecessors; only the two volume MAs remain.
    assert_eq!(chart.purge(), 2);
    assert_eq!(chart.purge(), 0);
}

#[test]
fn config_errors_surface() {
    let mut chart = Chart::new("SPY", "1d");
    let err = chart
        .add_indicator(&IndicatorConfig::new("cci").with_param("Colour", 1.0))
        .unwrap_err();
    assert!(matches!(
        err,
        ChartError::Indicator(IndicatorError::UnknownOption { .. })
    ));
    let err = chart
        .add_indicator(&IndicatorConfig::new("ichimoku"))
        .unwrap_err();
    assert!(matches!(
        err,
        ChartError::Indicator(IndicatorError::UnknownKind(_))
    ));
    assert_eq!(chart.indicator_count(), 0);
}

#[test]
fn live_bar_revisions() {
    let mut chart = Chart::new("SPY", "1h");
    chart
        .add_indicator(&IndicatorConfig::new("ma").with_param("Period 1", 3.0))
        .unwrap();
    let bars = make_test_bars(30, 0.0);
    for bar in &bars {
        chart.append(bar).unwrap();
        chart.refresh().unwrap();
    }

    // Three intraday revisions of the last bar.
    let mut last = bars[29];
    for close in [90.0, 95.0, 110.0] {
        last.close = close;
        last.high = last.high.max(close);
        last.low = last.low.min(close);
        chart.update_last(&last).unwrap();
        chart.refresh().unwrap();
        let ma = chart.indicator(0).unwrap().output("MA1").unwrap().series();
        let expected = (bars[27].close + bars[28].close + close) / 3.0;
        assert!((ma.get(29) - expected).abs() < 1e-3, "{} vs {expected}", ma.get(29));
    }
}

#[test]
fn independent_charts_on_worker_threads() {
    let results: Vec<f32> = std::thread::scope(|scope| {
        let handles: Vec<_> = [0.1f32, -0.1, 0.3]
            .into_iter()
            .map(|drift| {
                scope.spawn(move || {
                    let mut chart = Chart::new("SYM", "1h");
                    chart.add_indicator(&IndicatorConfig::new("dmi")).unwrap();
                    for bar in make_test_bars(80, drift) {
                        chart.append(&bar).unwrap();
                    }
                    chart.refresh().unwrap();
                    chart
                        .indicator(0)
                        .unwrap()
                        .output("ADX")
                        .unwrap()
                        .series()
                        .get(79)
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });
    assert_eq!(results.len(), 3);
    assert!(results.iter().all(|v| (0.0..=100.0).contains(v)));
}
