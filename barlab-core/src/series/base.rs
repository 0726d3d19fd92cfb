//! Quote bundle: the base series every function binds to.

use super::IndexedSeries;
use crate::domain::{Bar, BarError, SeriesId};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

/// Raw column of a quote bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceField {
    Open,
    High,
    Low,
    Close,
    Volume,
}

impl PriceField {
    pub fn label(&self) -> &'static str {
        match self {
            PriceField::Open => "Open",
            PriceField::High => "High",
            PriceField::Low => "Low",
            PriceField::Close => "Close",
            PriceField::Volume => "Volume",
        }
    }
}

/// OHLCV columns for one (symbol, timeframe), plus their bar times.
///
/// All columns always have the same length. `len()` is taken from the time
/// column, which is extended last, so a reader never sees a bar whose
/// price columns are not written yet.
#[derive(Debug)]
pub struct BaseSeries {
    id: SeriesId,
    symbol: String,
    timeframe: String,
    times: RwLock<Vec<NaiveDateTime>>,
    open: Arc<IndexedSeries>,
    high: Arc<IndexedSeries>,
    low: Arc<IndexedSeries>,
    close: Arc<IndexedSeries>,
    volume: Arc<IndexedSeries>,
    generation: AtomicU64,
    writer: Mutex<()>,
}

impl BaseSeries {
    pub fn new(symbol: impl Into<String>, timeframe: impl Into<String>) -> Self {
        let column = |field: PriceField| Arc::new(IndexedSeries::new(field.label()));
        Self {
            id: SeriesId::next(),
            symbol: symbol.into(),
            timeframe: timeframe.into(),
            times: RwLock::new(Vec::new()),
            open: column(PriceField::Open),
            high: column(PriceField::High),
            low: column(PriceField::Low),
            close: column(PriceField::Close),
            volume: column(PriceField::Volume),
            generation: AtomicU64::new(0),
            writer: Mutex::new(()),
        }
    }

    /// Build a bundle from bars in time order.
    pub fn from_bars(
        symbol: impl Into<String>,
        timeframe: impl Into<String>,
        bars: &[Bar],
    ) -> Result<Self, BarError> {
        let base = Self::new(symbol, timeframe);
        for bar in bars {
            base.append(bar)?;
        }
        Ok(base)
    }

    pub fn id(&self) -> SeriesId {
        self.id
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn timeframe(&self) -> &str {
        &self.timeframe
    }

    /// Number of bars (the item size).
    pub fn len(&self) -> usize {
        self.times.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bumped on every `reset`; bound functions compare it to drop stale output.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    pub fn column(&self, field: PriceField) -> &Arc<IndexedSeries> {
        match field {
            PriceField::Open => &self.open,
            PriceField::High => &self.high,
            PriceField::Low => &self.low,
            PriceField::Close => &self.close,
            PriceField::Volume => &self.volume,
        }
    }

    pub fn open(&self) -> &Arc<IndexedSeries> {
        &self.open
    }

    pub fn high(&self) -> &Arc<IndexedSeries> {
        &self.high
    }

    pub fn low(&self) -> &Arc<IndexedSeries> {
        &self.low
    }

    pub fn close(&self) -> &Arc<IndexedSeries> {
        &self.close
    }

    pub fn volume(&self) -> &Arc<IndexedSeries> {
        &self.volume
    }

    pub fn time_at(&self, index: usize) -> Option<NaiveDateTime> {
        self.times
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(index)
            .copied()
    }

    pub fn last_time(&self) -> Option<NaiveDateTime> {
        self.times
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .copied()
    }

    /// Index of the first bar at or after `time`, if any.
    pub fn index_of_time(&self, time: NaiveDateTime) -> Option<usize> {
        let times = self.times.read().unwrap_or_else(PoisonError::into_inner);
        let idx = times.partition_point(|t| *t < time);
        (idx < times.len()).then_some(idx)
    }

    /// Reassemble the bar at `index`.
    pub fn bar_at(&self, index: usize) -> Option<Bar> {
        let time = self.time_at(index)?;
        Some(Bar::new(
            time,
            self.open.get(index),
            self.high.get(index),
            self.low.get(index),
            self.close.get(index),
            self.volume.get(index),
        ))
    }

    /// Append a bar at the frontier. Returns its index.
    pub fn append(&self, bar: &Bar) -> Result<usize, BarError> {
        let _writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(last) = self.last_time() {
            if bar.time <= last {
                return Err(BarError::NonMonotonicTime {
                    time: bar.time,
                    last,
                });
            }
        }
        self.open.append(bar.open);
        self.high.append(bar.high);
        self.low.append(bar.low);
        self.close.append(bar.close);
        self.volume.append(bar.volume);

        let mut times = self.times.write().unwrap_or_else(PoisonError::into_inner);
        times.push(bar.time);
        Ok(times.len() - 1)
    }

    /// Overwrite the frontier bar in place (an intraday revision).
    ///
    /// The bar's time must equal the last bar's time. Returns its index.
    pub fn update_last(&self, bar: &Bar) -> Result<usize, BarError> {
        let _writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let last = self.last_time().ok_or(BarError::Empty)?;
        if bar.time != last {
            return Err(BarError::TimeMismatch {
                time: bar.time,
                last,
            });
        }
        let idx = self.len() - 1;
        self.open.set(idx, bar.open)?;
        self.high.set(idx, bar.high)?;
        self.low.set(idx, bar.low)?;
        self.close.set(idx, bar.close)?;
        self.volume.set(idx, bar.volume)?;
        Ok(idx)
    }

    /// Drop every bar and start a new generation.
    pub fn reset(&self) {
        let _writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        self.times
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        for field in [
            PriceField::Open,
            PriceField::High,
            PriceField::Low,
            PriceField::Close,
            PriceField::Volume,
        ] {
            self.column(field).reset();
        }
        self.generation.fetch_add(1, Ordering::AcqRel);
    }
}
