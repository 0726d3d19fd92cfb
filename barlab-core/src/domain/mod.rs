//! Domain types for BarLab

pub mod bar;
pub mod ids;

pub use bar::{Bar, BarError};
pub use ids::{ConfigHash, SeriesId, SessionId};
