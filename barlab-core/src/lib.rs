//! BarLab Core: incremental indicator engine.
//!
//! This crate contains the computation core behind a charting front end:
//! - Indexed series storage and the OHLCV base series
//! - Computable options (named numeric parameters)
//! - The function contract: spot and continuous incremental computation
//! - The function identity cache, shared by every indicator of a chart
//! - Session bookkeeping and the chart-level refresh driver
//! - Indicators (VOL, CCI, DMI, MA) and their TOML configuration

pub mod cache;
pub mod chart;
pub mod config;
pub mod domain;
pub mod fingerprint;
pub mod function;
pub mod indicators;
pub mod option;
pub mod series;
pub mod session;

pub use cache::FunctionCache;
pub use chart::{Chart, ChartError};
pub use config::{ChartConfig, ConfigError};
pub use function::{Function, FunctionError, FunctionKind, FunctionParams};
pub use indicators::{Indicator, IndicatorError, IndicatorKind};
pub use option::ComputableOption;
pub use series::{BaseSeries, IndexedSeries};
