//! Indexed series storage.
//!
//! An `IndexedSeries` is a dense, zero-based column of `f32` values keyed by
//! bar index. Unknown values are the NaN sentinel: reading at or past the
//! frontier yields the sentinel, never an error. Writes may overwrite an
//! existing slot or extend the series by exactly one slot; a write that would
//! leave a gap is rejected.

pub mod base;

pub use base::{BaseSeries, PriceField};

use crate::domain::SeriesId;
use std::cmp::Ordering;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use thiserror::Error;

/// In-band marker for "value undefined at this index".
pub const SENTINEL: f32 = f32::NAN;

/// Returns true if `value` is the undefined-value sentinel.
pub fn is_sentinel(value: f32) -> bool {
    value.is_nan()
}

/// Storage invariant violations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SeriesError {
    #[error("index {index} would leave a gap in series '{name}' (size {size})")]
    IndexOutOfBounds {
        name: String,
        index: usize,
        size: usize,
    },
}

/// Append-only, randomly indexable column of values.
///
/// Values sit behind a `RwLock`: readers share the lock, a write holds it
/// exclusively only for the single slot it touches.
#[derive(Debug)]
pub struct IndexedSeries {
    id: SeriesId,
    name: String,
    values: RwLock<Vec<f32>>,
}

impl IndexedSeries {
    pub fn new(name: impl Into<String>) -> Self {
        Self::from_values(name, Vec::new())
    }

    /// Create a series pre-filled with `values` (index 0 first).
    pub fn from_values(name: impl Into<String>, values: Vec<f32>) -> Self {
        Self {
            id: SeriesId::next(),
            name: name.into(),
            values: RwLock::new(values),
        }
    }

    pub fn id(&self) -> SeriesId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of contiguous values stored (the frontier index).
    pub fn size(&self) -> usize {
        self.read_guard().len()
    }

    pub fn len(&self) -> usize {
        self.size()
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Value at `index`, or the sentinel when `index >= size()`.
    pub fn get(&self, index: usize) -> f32 {
        self.read_guard().get(index).copied().unwrap_or(SENTINEL)
    }

    /// Value `back` bars before `index`, or the sentinel when that would be
    /// before the first bar.
    pub fn get_back(&self, index: usize, back: usize) -> f32 {
        match index.checked_sub(back) {
            Some(i) => self.get(i),
            None => SENTINEL,
        }
    }

    /// Write `value` at `index`.
    ///
    /// `index == size()` extends the series by one, `index < size()`
    /// overwrites in place, anything beyond the frontier is an error.
    pub fn set(&self, index: usize, value: f32) -> Result<(), SeriesError> {
        let mut values = self.write_guard();
        let size = values.len();
        match index.cmp(&size) {
            Ordering::Less => values[index] = value,
            Ordering::Equal => values.push(value),
            Ordering::Greater => {
                return Err(SeriesError::IndexOutOfBounds {
                    name: self.name.clone(),
                    index,
                    size,
                })
            }
        }
        Ok(())
    }

    /// Append at the frontier and return the new value's index.
    pub fn append(&self, value: f32) -> usize {
        let mut values = self.write_guard();
        values.push(value);
        values.len() - 1
    }

    /// Drop every value (symbol or timeframe change).
    pub fn reset(&self) {
        self.write_guard().clear();
    }

    /// Copy of all values, for renderers and tests.
    pub fn snapshot(&self) -> Vec<f32> {
        self.read_guard().clone()
    }

    /// Run `f` over the stored values under a single read lock.
    pub fn read<R>(&self, f: impl FnOnce(&[f32]) -> R) -> R {
        f(&self.read_guard())
    }

    // Values are plain floats, so a writer that panicked cannot leave them
    // logically inconsistent; recover the guard instead of propagating poison.
    fn read_guard(&self) -> RwLockReadGuard<'_, Vec<f32>> {
        self.values.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_guard(&self) -> RwLockWriteGuard<'_, Vec<f32>> {
        self.values.write().unwrap_or_else(PoisonError::into_inner)
    }
}
