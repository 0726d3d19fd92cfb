//! Chart: the session-scoped driver.
//!
//! A chart owns one base series, a private function cache, a session clock
//! and an ordered list of indicators. Every refresh begins a new session and
//! walks the indicators in declaration order; each function computes its
//! dependencies before itself, so the order in which indicators share
//! functions does not matter.

use crate::cache::FunctionCache;
use crate::config::ChartConfig;
use crate::domain::{Bar, BarError, ConfigHash, SessionId};
use crate::fingerprint::IndicatorConfig;
use crate::indicators::{resolve_options, Indicator, IndicatorError, IndicatorKind};
use crate::option::ComputableOption;
use crate::series::BaseSeries;
use crate::session::SessionClock;
use chrono::NaiveDateTime;
use log::{debug, trace, warn};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChartError {
    #[error(transparent)]
    Bar(#[from] BarError),
    #[error(transparent)]
    Indicator(#[from] IndicatorError),
    #[error("indicator {0} is already on the chart")]
    Duplicate(String),
    #[error("no indicator at position {0}")]
    NoSuchIndicator(usize),
}

#[derive(Debug)]
struct Slot {
    hash: ConfigHash,
    indicator: Indicator,
}

/// Canonical identity of an indicator: kind plus every resolved option value.
fn canonical_hash(kind: IndicatorKind, options: &[ComputableOption]) -> ConfigHash {
    let config = options.iter().fold(IndicatorConfig::new(kind.name()), |c, o| {
        c.with_param(o.label(), o.value())
    });
    config.full_hash()
}

#[derive(Debug)]
pub struct Chart {
    base: Arc<BaseSeries>,
    cache: FunctionCache,
    clock: SessionClock,
    slots: Vec<Slot>,
}

impl Chart {
    pub fn new(symbol: impl Into<String>, timeframe: impl Into<String>) -> Self {
        Self::with_base(Arc::new(BaseSeries::new(symbol, timeframe)))
    }

    pub fn with_base(base: Arc<BaseSeries>) -> Self {
        Self {
            base,
            cache: FunctionCache::new(),
            clock: SessionClock::new(),
            slots: Vec::new(),
        }
    }

    /// An empty chart carrying every indicator of `config`.
    pub fn from_config(config: &ChartConfig) -> Result<Self, ChartError> {
        let mut chart = Self::new(config.symbol.clone(), config.timeframe.clone());
        for indicator in &config.indicators {
            chart.add_indicator(indicator)?;
        }
        Ok(chart)
    }

    pub fn base(&self) -> &Arc<BaseSeries> {
        &self.base
    }

    pub fn cache(&self) -> &FunctionCache {
        &self.cache
    }

    pub fn len(&self) -> usize {
        self.base.len()
    }

    pub fn is_empty(&self) -> bool {
        self.base.is_empty()
    }

    pub fn indicators(&self) -> impl Iterator<Item = &Indicator> {
        self.slots.iter().map(|s| &s.indicator)
    }

    pub fn indicator(&self, index: usize) -> Option<&Indicator> {
        self.slots.get(index).map(|s| &s.indicator)
    }

    pub fn indicator_count(&self) -> usize {
        self.slots.len()
    }

    /// Append a bar at the frontier. Computation waits for the next refresh.
    pub fn append(&self, bar: &Bar) -> Result<usize, ChartError> {
        self.base.append(bar).map_err(|e| {
            warn!("{}: rejected bar: {e}", self.base.symbol());
            ChartError::from(e)
        })
    }

    /// Revise the frontier bar and invalidate every window that reads it.
    pub fn update_last(&self, bar: &Bar) -> Result<usize, ChartError> {
        let idx = self.base.update_last(bar).map_err(|e| {
            warn!("{}: rejected revision: {e}", self.base.symbol());
            ChartError::from(e)
        })?;
        for slot in &self.slots {
            slot.indicator.invalidate_from(idx);
        }
        Ok(idx)
    }

    /// Drop every bar (symbol or timeframe change). Outputs follow on the
    /// next refresh.
    pub fn reset(&self) {
        debug!("{}: reset", self.base.symbol());
        self.base.reset();
    }

    /// Compute every indicator through the frontier.
    pub fn refresh(&self) -> Result<SessionId, ChartError> {
        self.refresh_to(usize::MAX)
    }

    /// Compute every indicator through `idx` (clamped to the frontier) in a
    /// new session.
    pub fn refresh_to(&self, idx: usize) -> Result<SessionId, ChartError> {
        let session = self.clock.begin();
        trace!("{}: {session} to {idx}", self.base.symbol());
        for slot in &self.slots {
            slot.indicator.compute_to(session, idx)?;
        }
        Ok(session)
    }

    /// Recompute every indicator from the first bar at or after `time`.
    pub fn refresh_from(&self, time: NaiveDateTime) -> Result<SessionId, ChartError> {
        let session = self.clock.begin();
        trace!("{}: {session} from {time}", self.base.symbol());
        for slot in &self.slots {
            slot.indicator.compute_from(session, time)?;
        }
        Ok(session)
    }

    /// Add an indicator. The same kind with the same resolved options is
    /// refused. Returns its position.
    pub fn add_indicator(&mut self, config: &IndicatorConfig) -> Result<usize, ChartError> {
        let kind: IndicatorKind = config.kind.parse()?;
        let options = resolve_options(kind, &config.params)?;
        let hash = canonical_hash(kind, &options);
        if self.slots.iter().any(|s| s.hash == hash) {
            return Err(ChartError::Duplicate(format!("{kind} [{}]", hash.short())));
        }
        self.cache.purge();
        let indicator = Indicator::new(kind, &self.base, options, &self.cache)?;
        debug!("{}: added {kind} [{}]", self.base.symbol(), hash.short());
        self.slots.push(Slot { hash, indicator });
        Ok(self.slots.len() - 1)
    }

    /// Remove the indicator at `index`, releasing functions nothing else uses.
    pub fn remove_indicator(&mut self, index: usize) -> Result<Indicator, ChartError> {
        if index >= self.slots.len() {
            return Err(ChartError::NoSuchIndicator(index));
        }
        let Slot { indicator, .. } = self.slots.remove(index);
        debug!("{}: removed {}", self.base.symbol(), indicator.kind());
        // Functions of the returned indicator go on the next purge.
        self.cache.purge();
        Ok(indicator)
    }

    /// Change one option of the indicator at `index`.
    pub fn set_option(&mut self, index: usize, label: &str, value: f64) -> Result<(), ChartError> {
        let slot = self
            .slots
            .get(index)
            .ok_or(ChartError::NoSuchIndicator(index))?;
        let kind = slot.indicator.kind();
        let hash = canonical_hash(kind, &slot.indicator.options_with(label, value)?);
        let taken = self
            .slots
            .iter()
            .enumerate()
            .any(|(i, s)| i != index && s.hash == hash);
        if taken {
            return Err(ChartError::Duplicate(format!("{kind} [{}]", hash.short())));
        }
        let slot = &mut self.slots[index];
        slot.indicator.rebind(label, value, &self.cache)?;
        slot.hash = hash;
        self.cache.purge();
        Ok(())
    }

    /// Forget cache entries whose functions have been released.
    pub fn purge(&self) -> usize {
        self.cache.purge()
    }
}
