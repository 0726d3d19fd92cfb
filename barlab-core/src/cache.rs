//! Function identity cache.
//!
//! Deduplicates bound functions by `FunctionKey` (kind, base series, inputs,
//! ordered option values). Entries are weak: the cache never keeps a function
//! alive, so once the last indicator holding it is dropped the function and
//! its output series are freed and the next request builds a fresh one.

use crate::function::{Function, FunctionError, FunctionKey, FunctionParams};
use crate::series::BaseSeries;
use log::debug;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

#[derive(Debug, Default)]
pub struct FunctionCache {
    entries: Mutex<HashMap<FunctionKey, Weak<Function>>>,
}

impl FunctionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the live function for `(base, params)`, binding a new one on a miss.
    ///
    /// The entry lock is not held while binding: binding acquires the new
    /// function's own dependencies through this same cache.
    pub fn acquire(
        &self,
        base: &Arc<BaseSeries>,
        params: FunctionParams,
    ) -> Result<Arc<Function>, FunctionError> {
        let key = FunctionKey::new(base, &params);
        if let Some(function) = self.lookup(&key) {
            debug!("cache hit {key}");
            return Ok(function);
        }

        debug!("cache miss {key}");
        let function = Arc::new(Function::new(params.kind()));
        function.bind(base, params, self)?;

        let mut entries = self.entries();
        if let Some(existing) = entries.get(&key).and_then(Weak::upgrade) {
            // Lost a race with another thread binding the same key.
            return Ok(existing);
        }
        entries.insert(key, Arc::downgrade(&function));
        Ok(function)
    }

    /// The live function with exactly this key, if any.
    pub fn lookup(&self, key: &FunctionKey) -> Option<Arc<Function>> {
        self.entries().get(key).and_then(Weak::upgrade)
    }

    /// The live function bound to `(base, params)`, without creating one.
    pub fn find(&self, base: &BaseSeries, params: &FunctionParams) -> Option<Arc<Function>> {
        self.lookup(&FunctionKey::new(base, params))
    }

    /// Number of functions still referenced from outside the cache.
    pub fn live_count(&self) -> usize {
        self.entries()
            .values()
            .filter(|entry| entry.strong_count() > 0)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.live_count() == 0
    }

    /// Drop dead entries. Returns how many were removed.
    pub fn purge(&self) -> usize {
        let mut entries = self.entries();
        let before = entries.len();
        entries.retain(|_, entry| entry.strong_count() > 0);
        let removed = before - entries.len();
        if removed > 0 {
            debug!("purged {removed} released functions");
        }
        removed
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<FunctionKey, Weak<Function>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
