//! Function contract: the unit of incremental computation.
//!
//! A `Function` is bound once to a base series and a typed parameter set. It
//! owns its output series and remembers, per session, how far it computed.
//! Each kind computes in one of two ways:
//!
//! - **Spot**: a closed-form value per bar, evaluated for every index in the
//!   requested range.
//! - **Continuous**: handed the first index and the frontier, it walks the
//!   range itself because each bar reads its own previous output.
//!
//! Dependencies (functions whose outputs this one reads) are acquired from the
//! `FunctionCache` while binding, and are always computed first.

mod adx;
mod cci;
mod directional;
mod dx;
mod ema;
mod ma;
pub(crate) mod math;
pub mod params;

pub use params::{
    AdxParams, CciParams, DirectionalIndexParams, DxParams, EmaParams, FunctionParams, Input,
    MaParams,
};

use crate::cache::FunctionCache;
use crate::domain::{SeriesId, SessionId};
use crate::series::{BaseSeries, IndexedSeries, SeriesError};
use crate::session::SessionProgress;
use log::{debug, trace};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use thiserror::Error;

/// Kinds of function. Part of every cache key, so MA(20) and EMA(20) over the
/// same series never collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FunctionKind {
    Ma,
    Ema,
    Cci,
    DirectionalMovement,
    DirectionalIndex,
    Dx,
    Adx,
}

impl FunctionKind {
    pub fn name(&self) -> &'static str {
        match self {
            FunctionKind::Ma => "ma",
            FunctionKind::Ema => "ema",
            FunctionKind::Cci => "cci",
            FunctionKind::DirectionalMovement => "dm",
            FunctionKind::DirectionalIndex => "di",
            FunctionKind::Dx => "dx",
            FunctionKind::Adx => "adx",
        }
    }

    pub fn strategy(&self) -> Strategy {
        match self {
            FunctionKind::Cci | FunctionKind::DirectionalMovement | FunctionKind::Dx => {
                Strategy::Spot
            }
            FunctionKind::Ma
            | FunctionKind::Ema
            | FunctionKind::DirectionalIndex
            | FunctionKind::Adx => Strategy::Continuous,
        }
    }

    /// Names of the output series, in output-index order.
    pub fn output_names(&self) -> &'static [&'static str] {
        match self {
            FunctionKind::Ma => &["ma"],
            FunctionKind::Ema => &["ema"],
            FunctionKind::Cci => &["cci"],
            FunctionKind::DirectionalMovement => &["dm_plus", "dm_minus", "tr"],
            FunctionKind::DirectionalIndex => &[
                "di_plus",
                "di_minus",
                "smoothed_dm_plus",
                "smoothed_dm_minus",
                "smoothed_tr",
            ],
            FunctionKind::Dx => &["dx"],
            FunctionKind::Adx => &["adx"],
        }
    }
}

impl fmt::Display for FunctionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Computation strategy tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Spot,
    Continuous,
}

/// Computes all outputs at one bar index.
pub type SpotFn = Box<dyn Fn(usize) -> Result<(), SeriesError> + Send + Sync>;

/// Computes all outputs from `beg` up to (excluding) the frontier `end`.
pub type ContFn = Box<dyn Fn(usize, usize) -> Result<(), SeriesError> + Send + Sync>;

/// The computation closure of a bound function, tagged by strategy.
pub enum Computation {
    Spot(SpotFn),
    Continuous(ContFn),
}

impl Computation {
    pub fn strategy(&self) -> Strategy {
        match self {
            Computation::Spot(_) => Strategy::Spot,
            Computation::Continuous(_) => Strategy::Continuous,
        }
    }
}

impl fmt::Debug for Computation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Computation::{:?}", self.strategy())
    }
}

/// Identity of a bound function: kind, base series, input series and the
/// ordered option values.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FunctionKey {
    pub kind: FunctionKind,
    pub base: SeriesId,
    pub inputs: Vec<SeriesId>,
    pub options: Vec<u64>,
}

impl FunctionKey {
    pub fn new(base: &BaseSeries, params: &FunctionParams) -> Self {
        Self {
            kind: params.kind(),
            base: base.id(),
            inputs: params.inputs().iter().map(|i| i.series().id()).collect(),
            options: params.options().iter().map(|o| o.key_bits()).collect(),
        }
    }

    /// Short stable hash, for log lines.
    pub fn fingerprint(&self) -> String {
        let canonical = self.to_string();
        let hash = blake3::hash(canonical.as_bytes()).to_hex();
        hash[..12].to_string()
    }
}

impl fmt::Display for FunctionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({}", self.kind, self.base)?;
        for input in &self.inputs {
            write!(f, ", {input}")?;
        }
        for bits in &self.options {
            write!(f, ", {}", f64::from_bits(*bits))?;
        }
        f.write_str(")")
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum FunctionError {
    #[error("{kind} function is already bound as {bound}, cannot rebind as {requested}")]
    AlreadyBound {
        kind: FunctionKind,
        bound: String,
        requested: String,
    },
    #[error("{expected} function cannot bind {found} parameters")]
    KindMismatch {
        expected: FunctionKind,
        found: FunctionKind,
    },
    #[error("{0} function is not bound")]
    Unbound(FunctionKind),
    #[error(transparent)]
    Storage(#[from] SeriesError),
}

/// What a kind's builder produces at bind time.
pub(crate) struct Parts {
    pub outputs: Vec<Arc<IndexedSeries>>,
    pub dependencies: Vec<Arc<Function>>,
    pub computation: Computation,
}

fn output_series(kind: FunctionKind) -> Vec<Arc<IndexedSeries>> {
    kind.output_names()
        .iter()
        .map(|name| Arc::new(IndexedSeries::new(*name)))
        .collect()
}

#[derive(Debug)]
struct Binding {
    key: FunctionKey,
    base: Arc<BaseSeries>,
    outputs: Vec<Arc<IndexedSeries>>,
    dependencies: Vec<Arc<Function>>,
    computation: Computation,
}

/// A memoized, dependency-aware computation over one base series.
///
/// Lifecycle: `Unbound` until `bind` succeeds, then `Idle` between calls and
/// `Computing` while `compute_to` holds the progress lock.
pub struct Function {
    kind: FunctionKind,
    binding: OnceLock<Binding>,
    progress: Mutex<SessionProgress>,
}

impl Function {
    /// A new, unbound function of `kind`.
    pub fn new(kind: FunctionKind) -> Self {
        Self {
            kind,
            binding: OnceLock::new(),
            progress: Mutex::new(SessionProgress::new()),
        }
    }

    pub fn kind(&self) -> FunctionKind {
        self.kind
    }

    pub fn is_bound(&self) -> bool {
        self.binding.get().is_some()
    }

    pub fn key(&self) -> Option<&FunctionKey> {
        self.binding.get().map(|b| &b.key)
    }

    pub fn base(&self) -> Option<&Arc<BaseSeries>> {
        self.binding.get().map(|b| &b.base)
    }

    /// Output series, empty while unbound.
    pub fn outputs(&self) -> &[Arc<IndexedSeries>] {
        self.binding
            .get()
            .map(|b| b.outputs.as_slice())
            .unwrap_or(&[])
    }

    pub fn output(&self, index: usize) -> Option<&Arc<IndexedSeries>> {
        self.outputs().get(index)
    }

    pub fn output_by_name(&self, name: &str) -> Option<&Arc<IndexedSeries>> {
        let index = self.kind.output_names().iter().position(|n| *n == name)?;
        self.output(index)
    }

    pub fn dependencies(&self) -> &[Arc<Function>] {
        self.binding
            .get()
            .map(|b| b.dependencies.as_slice())
            .unwrap_or(&[])
    }

    /// Last index computed, if any.
    pub fn computed(&self) -> Option<usize> {
        self.lock_progress().computed()
    }

    /// Bind to `base` with `params`.
    ///
    /// Binding is one-time: repeating it with an identical key is a no-op,
    /// anything else is `AlreadyBound`. Dependencies are acquired from `cache`
    /// before this function records itself as bound.
    pub fn bind(
        &self,
        base: &Arc<BaseSeries>,
        params: FunctionParams,
        cache: &FunctionCache,
    ) -> Result<(), FunctionError> {
        if params.kind() != self.kind {
            return Err(FunctionError::KindMismatch {
                expected: self.kind,
                found: params.kind(),
            });
        }
        let key = FunctionKey::new(base, &params);
        if self.is_bound() {
            return self.ensure_key(&key);
        }

        let parts = match &params {
            FunctionParams::Ma(p) => ma::build(p),
            FunctionParams::Ema(p) => ema::build(p),
            FunctionParams::Cci(p) => cci::build(base, p),
            FunctionParams::DirectionalMovement => directional::build_movement(base),
            FunctionParams::DirectionalIndex(p) => directional::build_index(base, p, cache)?,
            FunctionParams::Dx(p) => dx::build(base, p, cache)?,
            FunctionParams::Adx(p) => adx::build(base, p, cache)?,
        };
        debug_assert_eq!(parts.outputs.len(), self.kind.output_names().len());

        let binding = Binding {
            key: key.clone(),
            base: Arc::clone(base),
            outputs: parts.outputs,
            dependencies: parts.dependencies,
            computation: parts.computation,
        };
        if self.binding.set(binding).is_err() {
            // Bound concurrently; fine only if it was the same key.
            return self.ensure_key(&key);
        }
        debug!("bound {key} [{}]", key.fingerprint());
        Ok(())
    }

    /// True iff bound to exactly this base series and parameter tuple.
    pub fn id_equals(&self, base: &BaseSeries, params: &FunctionParams) -> bool {
        self.key()
            .is_some_and(|key| *key == FunctionKey::new(base, params))
    }

    /// Compute every output through `idx` for `session`.
    ///
    /// `idx` is clamped to the last available bar. Inside one session a call
    /// that is already covered does nothing; otherwise computation resumes at
    /// `min(computed + 1, idx)`.
    pub fn compute_to(&self, session: SessionId, idx: usize) -> Result<(), FunctionError> {
        let binding = self.binding.get().ok_or(FunctionError::Unbound(self.kind))?;
        let mut progress = self.lock_progress();

        if progress.sync_generation(binding.base.generation()) {
            for output in &binding.outputs {
                output.reset();
            }
        }

        let size = binding.base.len();
        let Some(last) = size.checked_sub(1) else {
            return Ok(());
        };
        let idx = idx.min(last);
        let Some(from) = progress.plan(session, idx) else {
            return Ok(());
        };
        let target = match binding.computation.strategy() {
            Strategy::Spot => idx,
            Strategy::Continuous => last,
        };

        for dependency in &binding.dependencies {
            dependency.compute_to(session, target)?;
        }

        trace!("{} computing {from}..={target} in {session}", binding.key);
        match &binding.computation {
            Computation::Spot(spot) => {
                for i in from..=target {
                    spot(i)?;
                }
            }
            Computation::Continuous(cont) => cont(from, size)?,
        }
        progress.finish(target);
        Ok(())
    }

    /// Compute through `idx`, then read output `output` at `idx`.
    pub fn value_at(
        &self,
        session: SessionId,
        output: usize,
        idx: usize,
    ) -> Result<f32, FunctionError> {
        self.compute_to(session, idx)?;
        Ok(self
            .output(output)
            .map(|series| series.get(idx))
            .unwrap_or(crate::series::SENTINEL))
    }

    /// Force recomputation from `idx` onward, here and in every dependency.
    pub fn invalidate_from(&self, idx: usize) {
        self.lock_progress().invalidate_from(idx);
        for dependency in self.dependencies() {
            dependency.invalidate_from(idx);
        }
    }

    fn ensure_key(&self, requested: &FunctionKey) -> Result<(), FunctionError> {
        match self.key() {
            Some(bound) if bound == requested => Ok(()),
            Some(bound) => Err(FunctionError::AlreadyBound {
                kind: self.kind,
                bound: bound.to_string(),
                requested: requested.to_string(),
            }),
            None => Err(FunctionError::Unbound(self.kind)),
        }
    }

    fn lock_progress(&self) -> std::sync::MutexGuard<'_, SessionProgress> {
        self.progress.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("kind", &self.kind)
            .field("key", &self.key())
            .finish_non_exhaustive()
    }
}

/// Test fixtures shared by the function and indicator unit tests.
#[cfg(test)]
pub(crate) mod testing {
    use crate::domain::Bar;
    use crate::series::BaseSeries;
    use chrono::{NaiveDate, NaiveDateTime};
    use std::sync::Arc;

    pub const EPSILON: f32 = 1e-4;

    pub fn day(n: usize) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
            + chrono::Duration::days(n as i64)
    }

    /// Bars from close prices: open = previous close, high/low = +/- 1 around
    /// the body, volume = 1000 + 10 * index.
    pub fn make_bars(closes: &[f32]) -> Vec<Bar> {
        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| {
                let open = if i == 0 { close } else { closes[i - 1] };
                Bar::new(
                    day(i),
                    open,
                    open.max(close) + 1.0,
                    open.min(close) - 1.0,
                    close,
                    1000.0 + 10.0 * i as f32,
                )
            })
            .collect()
    }

    pub fn make_base(closes: &[f32]) -> Arc<BaseSeries> {
        Arc::new(BaseSeries::from_bars("TEST", "1d", &make_bars(closes)).unwrap())
    }

    /// Bars from (high, low, close) triples.
    pub fn make_hlc_base(data: &[(f32, f32, f32)]) -> Arc<BaseSeries> {
        let bars: Vec<Bar> = data
            .iter()
            .enumerate()
            .map(|(i, &(high, low, close))| Bar::new(day(i), close, high, low, close, 1000.0))
            .collect();
        Arc::new(BaseSeries::from_bars("TEST", "1d", &bars).unwrap())
    }

    pub fn assert_approx(actual: f32, expected: f32, epsilon: f32) {
        assert!(
            (actual - expected).abs() < epsilon,
            "assert_approx failed: actual={actual}, expected={expected}, epsilon={epsilon}"
        );
    }
}
