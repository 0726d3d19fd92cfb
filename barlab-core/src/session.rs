//! Compute sessions and per-function progress bookkeeping.
//!
//! A session is one logical compute pass (one chart refresh). Each function
//! remembers the last session it served and how far it computed in it, so a
//! repeated `compute_to` inside the same session is free, while a new session
//! always recomputes at least the requested index (the frontier bar may have
//! been revised in between).

use crate::domain::SessionId;
use std::sync::atomic::{AtomicU64, Ordering};

/// Hands out monotonically increasing session ids.
#[derive(Debug)]
pub struct SessionClock {
    next: AtomicU64,
}

impl SessionClock {
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    /// Start a new compute pass.
    pub fn begin(&self) -> SessionId {
        SessionId(self.next.fetch_add(1, Ordering::Relaxed))
    }

    /// The most recently started session, if any.
    pub fn last(&self) -> Option<SessionId> {
        match self.next.load(Ordering::Relaxed) {
            1 => None,
            n => Some(SessionId(n - 1)),
        }
    }
}

impl Default for SessionClock {
    fn default() -> Self {
        Self::new()
    }
}

/// How far a function has computed, and for which session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionProgress {
    session: Option<SessionId>,
    computed: Option<usize>,
    generation: u64,
}

impl SessionProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session(&self) -> Option<SessionId> {
        self.session
    }

    /// Last index known to be computed, if any.
    pub fn computed(&self) -> Option<usize> {
        self.computed
    }

    /// Plan a `compute_to(session, idx)` call.
    ///
    /// Returns the first index to compute, or `None` when the session has
    /// already covered `idx`.
    pub fn plan(&mut self, session: SessionId, idx: usize) -> Option<usize> {
        if self.session == Some(session) && self.computed.is_some_and(|c| idx <= c) {
            return None;
        }
        self.session = Some(session);
        Some(match self.computed {
            Some(c) => (c + 1).min(idx),
            None => 0,
        })
    }

    /// Record that everything through `idx` is now valid.
    pub fn finish(&mut self, idx: usize) {
        self.computed = Some(idx);
    }

    /// Forget everything from `idx` onward.
    pub fn invalidate_from(&mut self, idx: usize) {
        self.computed = match (self.computed, idx.checked_sub(1)) {
            (Some(c), Some(prev)) => Some(c.min(prev)),
            _ => None,
        };
        self.session = None;
    }

    /// Adopt the base series generation. Returns true, with progress cleared,
    /// when the base was reset since the last call.
    pub fn sync_generation(&mut self, generation: u64) -> bool {
        if self.generation == generation {
            return false;
        }
        self.generation = generation;
        self.computed = None;
        self.session = None;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_is_monotonic() {
        let clock = SessionClock::new();
        assert_eq!(clock.last(), None);
        let a = clock.begin();
        let b = clock.begin();
        assert!(b > a);
        assert_eq!(clock.last(), Some(b));
    }

    #[test]
    fn first_plan_starts_at_zero() {
        let mut p = SessionProgress::new();
        assert_eq!(p.plan(SessionId(1), 5), Some(0));
    }

    #[test]
    fn same_session_covered_index_is_noop() {
        let mut p = SessionProgress::new();
        p.plan(SessionId(1), 5);
        p.finish(5);
        assert_eq!(p.plan(SessionId(1), 5), None);
        assert_eq!(p.plan(SessionId(1), 3), None);
        assert_eq!(p.plan(SessionId(1), 7), Some(6));
    }

    #[test]
    fn new_session_recomputes_requested_index() {
        let mut p = SessionProgress::new();
        p.plan(SessionId(1), 5);
        p.finish(5);
        // Frontier revision: the new session must redo bar 5 at least.
        assert_eq!(p.plan(SessionId(2), 5), Some(5));
        assert_eq!(p.plan(SessionId(3), 9), Some(6));
    }

    #[test]
    fn invalidate_from_rewinds() {
        let mut p = SessionProgress::new();
        p.plan(SessionId(1), 9);
        p.finish(9);
        p.invalidate_from(4);
        assert_eq!(p.computed(), Some(3));
        assert_eq!(p.plan(SessionId(1), 9), Some(4));

        p.finish(9);
        p.invalidate_from(0);
        assert_eq!(p.computed(), None);
    }

    #[test]
    fn generation_change_clears_progress() {
        let mut p = SessionProgress::new();
        assert!(!p.sync_generation(0));
        p.plan(SessionId(1), 3);
        p.finish(3);
        assert!(p.sync_generation(1));
        assert_eq!(p.computed(), None);
        assert_eq!(p.plan(SessionId(1), 3), Some(0));
    }
}
