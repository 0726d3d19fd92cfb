use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_SERIES_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of an indexed series or a quote bundle.
///
/// Function cache keys are built from these ids, never from pointers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SeriesId(pub u64);

impl SeriesId {
    /// Allocate the next id from the process-wide counter.
    pub fn next() -> Self {
        Self(NEXT_SERIES_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for SeriesId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ser#{}", self.0)
    }
}

/// Identifier of one compute pass (e.g. one chart refresh).
///
/// Assigned monotonically by `session::SessionClock`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session#{}", self.0)
    }
}

/// Deterministic content hash of an indicator configuration (BLAKE3, hex).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConfigHash(pub String);

impl ConfigHash {
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(blake3::hash(bytes).to_hex().to_string())
    }

    /// First 12 hex digits, for log lines and tables.
    pub fn short(&self) -> &str {
        &self.0[..self.0.len().min(12)]
    }
}

impl fmt::Display for ConfigHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn series_ids_are_unique_and_increasing() {
        let a = SeriesId::next();
        let b = SeriesId::next();
        assert_ne!(a, b);
        assert!(b > a);
    }

    #[test]
    fn display_formats() {
        assert_eq!(SeriesId(7).to_string(), "ser#7");
        assert_eq!(SessionId(3).to_string(), "session#3");
    }

    #[test]
    fn config_hash_is_deterministic() {
        let a = ConfigHash::from_bytes(b"cci");
        let b = ConfigHash::from_bytes(b"cci");
        assert_eq!(a, b);
        assert_eq!(a.0.len(), 64);
        assert_eq!(a.short().len(), 12);
        assert_ne!(a, ConfigHash::from_bytes(b"dmi"));
    }
}
