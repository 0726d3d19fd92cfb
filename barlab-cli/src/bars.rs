//! CSV bar loading.
//!
//! Expected header: `time,open,high,low,close,volume`. Times may be a date
//! (`2024-01-02`), a date and time (`2024-01-02 09:30:00`) or ISO 8601 with a
//! `T` separator. Void bars (any missing price) are skipped with a warning.

use anyhow::{bail, Context, Result};
use barlab_core::domain::Bar;
use chrono::{NaiveDate, NaiveDateTime};
use log::warn;
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct CsvRow {
    time: String,
    open: Option<f32>,
    high: Option<f32>,
    low: Option<f32>,
    close: Option<f32>,
    #[serde(default)]
    volume: Option<f32>,
}

pub fn parse_time(s: &str) -> Result<NaiveDateTime> {
    let s = s.trim();
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(t) = NaiveDateTime::parse_from_str(s, format) {
            return Ok(t);
        }
    }
    let date = NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .with_context(|| format!("unrecognised time '{s}'"))?;
    date.and_hms_opt(0, 0, 0)
        .with_context(|| format!("invalid time '{s}'"))
}

/// Load bars from a CSV reader, in file order.
pub fn read_bars<R: std::io::Read>(reader: R) -> Result<Vec<Bar>> {
    let mut csv = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut bars = Vec::new();
    for (line, row) in csv.deserialize::<CsvRow>().enumerate() {
        let row = row.with_context(|| format!("row {}", line + 2))?;
        let time = parse_time(&row.time).with_context(|| format!("row {}", line + 2))?;
        let bar = Bar::new(
            time,
            row.open.unwrap_or(f32::NAN),
            row.high.unwrap_or(f32::NAN),
            row.low.unwrap_or(f32::NAN),
            row.close.unwrap_or(f32::NAN),
            row.volume.unwrap_or(0.0),
        );
        if bar.is_void() {
            warn!("skipping void bar at {time}");
            continue;
        }
        if !bar.is_sane() {
            warn!("bar at {time} has inconsistent OHLC values");
        }
        bars.push(bar);
    }
    if bars.is_empty() {
        bail!("no bars found");
    }
    Ok(bars)
}

pub fn load_bars(path: &Path) -> Result<Vec<Bar>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("open bars file {}", path.display()))?;
    read_bars(file).with_context(|| format!("read bars from {}", path.display()))
}
