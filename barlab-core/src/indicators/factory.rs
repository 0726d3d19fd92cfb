//! Factory: converts an `IndicatorConfig` into a bound `Indicator`.

use super::{Indicator, IndicatorError, IndicatorKind};
use crate::cache::FunctionCache;
use crate::fingerprint::IndicatorConfig;
use crate::option::ComputableOption;
use crate::series::BaseSeries;
use std::collections::BTreeMap;
use std::sync::Arc;

/// The kind's default options with `params` applied by label.
///
/// Labels match case-insensitively; a label the kind does not declare is an
/// error, as is a value outside the option's bounds.
pub fn resolve_options(
    kind: IndicatorKind,
    params: &BTreeMap<String, f64>,
) -> Result<Vec<ComputableOption>, IndicatorError> {
    let mut options = kind.default_options();
    for (label, value) in params {
        let slot = options
            .iter_mut()
            .find(|o| o.label().eq_ignore_ascii_case(label.trim()))
            .ok_or_else(|| IndicatorError::UnknownOption {
                kind,
                label: label.clone(),
            })?;
        *slot = slot.with_value(*value)?;
    }
    Ok(options)
}

/// Create an indicator from a config entry over `base`.
pub fn create_indicator(
    config: &IndicatorConfig,
    base: &Arc<BaseSeries>,
    cache: &FunctionCache,
) -> Result<Indicator, IndicatorError> {
    let kind: IndicatorKind = config.kind.parse()?;
    let options = resolve_options(kind, &config.params)?;
    Indicator::new(kind, base, options, cache)
}
