//! Value-axis range computation

use std::ops::Range;

use serde_json::Value;

use crate::chart::ChartSpecification;
use crate::{Error, Result};

/// Round a data extent outward to tidy bounds.
///
/// Extents too wide to round keep their raw ends.
pub fn nice_bounds(min: f64, max: f64) -> (f64, f64) {
    if !min.is_finite() || !max.is_finite() {
        return (0.0, 1.0);
    }

    let range = max - min;
    if range == 0.0 {
        return (min - 0.5, min + 0.5);
    }
    if !range.is_finite() {
        return (min, max);
    }

    let step = 10_f64.powf(range.log10().floor());
    let (lo, hi) = ((min / step).floor() * step, (max / step).ceil() * step);
    if lo.is_finite() && hi.is_finite() {
        (lo, hi)
    } else {
        (min, max)
    }
}

/// Min/max over an iterator of values, ignoring non-finite ones
pub fn extent(values: impl IntoIterator<Item = f64>) -> Option<(f64, f64)> {
    values
        .into_iter()
        .filter(|v| v.is_finite())
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

/// Resolve the range of axis `axis` (`"x"` or `"y"`) for the given data extent,
/// applying `options.scales.<axis>.{min,max,beginAtZero}`.
///
/// Fails when the result has no finite, positive span to map pixels onto.
pub fn axis_range(
    spec: &ChartSpecification,
    axis: &str,
    data: Option<(f64, f64)>,
    include_zero: bool,
) -> Result<Range<f64>> {
    let opt = |key: &str| spec.option(&["scales", axis, key]);
    let begin_at_zero = include_zero || opt("beginAtZero").and_then(Value::as_bool).unwrap_or(false);

    let (mut lo, mut hi) = data.unwrap_or((0.0, 1.0));
    if begin_at_zero {
        lo = lo.min(0.0);
        hi = hi.max(0.0);
    }
    let (mut lo, mut hi) = nice_bounds(lo, hi);

    if let Some(min) = opt("min").and_then(Value::as_f64).filter(|v| v.is_finite()) {
        lo = min;
    }
    if let Some(max) = opt("max").and_then(Value::as_f64).filter(|v| v.is_finite()) {
        hi = max;
    }
    if hi <= lo {
        hi = lo + 1.0;
    }
    if hi <= lo || !(hi - lo).is_finite() {
        return Err(Error::RenderError(format!(
            "{axis} axis range {lo:e}..{hi:e} is too large to plot"
        )));
    }
    Ok(lo..hi)
}
