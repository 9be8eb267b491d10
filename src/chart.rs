//! Chart specification model
//!
//! A [`ChartSpecification`] is a typed view over the caller's JSON object. The
//! raw object is kept untouched so that every top-level key (including ones
//! this crate knows nothing about) survives into markup output verbatim.
//! Typed accessors only look at the handful of fields the engine needs.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::validate::{validate, ValidationOutcome};
use crate::{Error, Result};

/// The fixed set of chart kinds understood by the renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ChartKind {
    Bar,
    Line,
    Scatter,
    Bubble,
    Pie,
    Doughnut,
    PolarArea,
    Radar,
}

impl ChartKind {
    /// Every supported kind, in the order they are advertised to callers.
    pub const ALL: [ChartKind; 8] = [
        ChartKind::Bar,
        ChartKind::Line,
        ChartKind::Scatter,
        ChartKind::Bubble,
        ChartKind::Pie,
        ChartKind::Doughnut,
        ChartKind::PolarArea,
        ChartKind::Radar,
    ];

    /// Wire name of the kind, as it appears in the `type` field
    pub fn as_str(self) -> &'static str {
        match self {
            ChartKind::Bar => "bar",
            ChartKind::Line => "line",
            ChartKind::Scatter => "scatter",
            ChartKind::Bubble => "bubble",
            ChartKind::Pie => "pie",
            ChartKind::Doughnut => "doughnut",
            ChartKind::PolarArea => "polarArea",
            ChartKind::Radar => "radar",
        }
    }

    /// Comma separated list of all wire names, used in error messages.
    pub fn supported_list() -> String {
        Self::ALL
            .iter()
            .map(|k| k.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Whether the kind is drawn on an x/y grid
    pub fn is_cartesian(self) -> bool {
        matches!(
            self,
            ChartKind::Bar | ChartKind::Line | ChartKind::Scatter | ChartKind::Bubble
        )
    }
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChartKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| {
                Error::InvalidConfig(format!(
                    "Invalid chart configuration: type must be one of: {}",
                    Self::supported_list()
                ))
            })
    }
}

/// A structurally valid chart specification.
///
/// Only constructed through [`ChartSpecification::from_value`], which runs the
/// structural validator first, so `kind` and `datasets` are always present.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSpecification {
    kind: ChartKind,
    raw: Map<String, Value>,
}

impl ChartSpecification {
    /// Validate an untrusted value and wrap it.
    pub fn from_value(value: Value) -> Result<Self> {
        if let ValidationOutcome::Invalid(reason) = validate(&value) {
            return Err(Error::InvalidConfig(reason));
        }
        let Value::Object(raw) = value else {
            return Err(Error::InvalidConfig(
                "Invalid chart configuration: expected an object".into(),
            ));
        };
        let kind = raw
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .parse()?;
        Ok(Self { kind, raw })
    }

    pub fn kind(&self) -> ChartKind {
        self.kind
    }

    /// The caller's object, untouched
    pub fn raw(&self) -> &Map<String, Value> {
        &self.raw
    }

    /// Serialize the full specification back to JSON text
    pub fn to_json(&self) -> String {
        // A map of serde_json values always serializes.
        serde_json::to_string(&self.raw).unwrap_or_else(|_| "{}".to_string())
    }

    fn data(&self) -> Option<&Map<String, Value>> {
        self.raw.get("data").and_then(Value::as_object)
    }

    /// Category labels; non-string entries are stringified
    pub fn labels(&self) -> Vec<String> {
        self.data()
            .and_then(|d| d.get("labels"))
            .and_then(Value::as_array)
            .map(|labels| {
                labels
                    .iter()
                    .map(|l| match l {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Raw dataset values, in order. Shape is checked by the engine.
    pub fn datasets(&self) -> &[Value] {
        self.data()
            .and_then(|d| d.get("datasets"))
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Rendering options (`Value::Null` when absent)
    pub fn options(&self) -> &Value {
        self.raw.get("options").unwrap_or(&Value::Null)
    }

    /// Look up a nested option by path, e.g. `["plugins", "title", "text"]`
    pub fn option(&self, path: &[&str]) -> Option<&Value> {
        path.iter()
            .try_fold(self.options(), |node, key| node.get(*key))
    }

    /// Chart title from `options.plugins.title.text`, if one is set
    pub fn title(&self) -> Option<String> {
        match self.option(&["plugins", "title", "text"])? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Array(lines) => Some(
                lines
                    .iter()
                    .filter_map(Value::as_str)
                    .collect::<Vec<_>>()
                    .join(" "),
            ),
            _ => None,
        }
    }
}

/// A single point inside a dataset's `data` array
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DataPoint {
    /// Missing value (`null`), drawn as a gap
    Gap,
    Scalar(f64),
    Xy { x: f64, y: f64 },
    Bubble { x: f64, y: f64, r: f64 },
}

impl DataPoint {
    /// The value used on the value axis, if the point has one
    pub fn value(&self) -> Option<f64> {
        match *self {
            DataPoint::Gap => None,
            DataPoint::Scalar(v) => Some(v),
            DataPoint::Xy { y, .. } | DataPoint::Bubble { y, .. } => Some(y),
        }
    }
}

/// A borrowed view of one entry of `data.datasets`
#[derive(Debug, Clone, Copy)]
pub struct Dataset<'a> {
    index: usize,
    raw: &'a Map<String, Value>,
}

impl<'a> Dataset<'a> {
    /// Wrap the dataset at `index`, failing if it is not an object with a
    /// `data` array.
    pub fn from_value(index: usize, value: &'a Value) -> Result<Self> {
        let raw = value.as_object().ok_or_else(|| {
            Error::RenderError(format!("dataset {index} must be an object"))
        })?;
        match raw.get("data") {
            Some(Value::Array(_)) => Ok(Self { index, raw }),
            Some(_) => Err(Error::RenderError(format!(
                "dataset {index}: data must be an array"
            ))),
            None => Err(Error::RenderError(format!(
                "dataset {index} is missing its data array"
            ))),
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn label(&self) -> Option<&'a str> {
        self.raw.get("label").and_then(Value::as_str)
    }

    /// Any other dataset property (`backgroundColor`, `fill`, ...)
    pub fn get(&self, key: &str) -> Option<&'a Value> {
        self.raw.get(key)
    }

    fn values(&self) -> &'a [Value] {
        self.raw
            .get("data")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.values().len()
    }

    pub fn is_empty(&self) -> bool {
        self.values().is_empty()
    }

    /// Points for category charts: numbers, `null`, or objects with a `y`.
    pub fn category_points(&self) -> Result<Vec<DataPoint>> {
        self.values()
            .iter()
            .enumerate()
            .map(|(i, v)| match v {
                Value::Null => Ok(DataPoint::Gap),
                Value::Number(_) => finite(v).map(DataPoint::Scalar).ok_or_else(|| {
                    self.point_error(i, "expected a finite number")
                }),
                Value::Object(obj) => obj
                    .get("y")
                    .and_then(finite)
                    .map(DataPoint::Scalar)
                    .ok_or_else(|| self.point_error(i, "expected an object with a numeric y")),
                _ => Err(self.point_error(i, "expected a number, null, or {y} object")),
            })
            .collect()
    }

    /// Points for scatter charts: `{x, y}` objects only.
    pub fn xy_points(&self) -> Result<Vec<DataPoint>> {
        self.values()
            .iter()
            .enumerate()
            .map(|(i, v)| match v {
                Value::Null => Ok(DataPoint::Gap),
                Value::Object(obj) => match (obj.get("x").and_then(finite), obj.get("y").and_then(finite)) {
                    (Some(x), Some(y)) => Ok(DataPoint::Xy { x, y }),
                    _ => Err(self.point_error(i, "scatter points need numeric x and y")),
                },
                _ => Err(self.point_error(i, "scatter charts need {x, y} objects")),
            })
            .collect()
    }

    /// Points for bubble charts: `{x, y, r}` objects only.
    pub fn bubble_points(&self) -> Result<Vec<DataPoint>> {
        self.values()
            .iter()
            .enumerate()
            .map(|(i, v)| match v {
                Value::Null => Ok(DataPoint::Gap),
                Value::Object(obj) => {
                    let coord = |k: &str| obj.get(k).and_then(finite);
                    match (coord("x"), coord("y"), coord("r")) {
                        (Some(x), Some(y), Some(r)) => Ok(DataPoint::Bubble { x, y, r }),
                        _ => Err(self.point_error(i, "bubble points need numeric x, y and r")),
                    }
                }
                _ => Err(self.point_error(i, "bubble charts need {x, y, r} objects")),
            })
            .collect()
    }

    /// Slice sizes for proportional charts: non-negative numbers, `null` as 0.
    pub fn proportion_values(&self) -> Result<Vec<f64>> {
        self.values()
            .iter()
            .enumerate()
            .map(|(i, v)| match v {
                Value::Null => Ok(0.0),
                Value::Number(_) => match finite(v) {
                    Some(n) if n >= 0.0 => Ok(n),
                    Some(_) => Err(self.point_error(i, "values cannot be negative")),
                    None => Err(self.point_error(i, "expected a finite number")),
                },
                _ => Err(self.point_error(i, "expected a number")),
            })
            .collect()
    }

    fn point_error(&self, point: usize, what: &str) -> Error {
        match self.label() {
            Some(label) => Error::RenderError(format!(
                "dataset {} ('{}'), point {}: {}",
                self.index, label, point, what
            )),
            None => Error::RenderError(format!(
                "dataset {}, point {}: {}",
                self.index, point, what
            )),
        }
    }
}

fn finite(v: &Value) -> Option<f64> {
    v.as_f64().filter(|n| n.is_finite())
}
