//! Structural validation of untrusted chart configurations
//!
//! Only the top-level shape is checked here: an object with a supported
//! `type` and a non-empty `data.datasets` array. Per-kind point shapes are the
//! rendering engine's business. Checks run in a fixed order and stop at the
//! first violation.

use serde_json::Value;

use crate::chart::ChartKind;

/// Outcome of [`validate`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    Valid,
    /// Human-readable reason for the first failed check
    Invalid(String),
}

impl ValidationOutcome {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationOutcome::Valid)
    }
}

fn invalid(reason: impl AsRef<str>) -> ValidationOutcome {
    ValidationOutcome::Invalid(format!("Invalid chart configuration: {}", reason.as_ref()))
}

/// Check the minimal structure the renderer relies on.
pub fn validate(raw: &Value) -> ValidationOutcome {
    let Some(obj) = raw.as_object() else {
        return invalid("chart configuration must be a non-null object");
    };

    match obj.get("type") {
        None | Some(Value::Null) => {
            return invalid(format!(
                "type is required and must be one of: {}",
                ChartKind::supported_list()
            ));
        }
        Some(Value::String(s)) if ChartKind::ALL.iter().any(|k| k.as_str() == s) => {}
        Some(other) => {
            return invalid(format!(
                "unsupported chart type {other}; type must be one of: {}",
                ChartKind::supported_list()
            ));
        }
    }

    let Some(data) = obj.get("data").and_then(Value::as_object) else {
        return invalid("data is required and must be an object containing a datasets array");
    };

    let Some(datasets) = data.get("datasets").and_then(Value::as_array) else {
        return invalid("data.datasets is required and must be an array");
    };

    if datasets.is_empty() {
        return invalid("at least one dataset is required");
    }

    ValidationOutcome::Valid
}
