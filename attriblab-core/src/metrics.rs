//! Attribution metrics and safe extraction.
//!
//! Every number that enters the attribution pipeline passes through
//! `safe_metric`, which coerces NaN/infinity/non-numeric garbage to 0.0.
//! Downstream code (deltas, Shapley averages) can therefore assume finite
//! arithmetic everywhere.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The two performance metrics the attribution engine decomposes.
///
/// Always finite: construct via [`AttributionMetrics::from_values`] or from
/// already-safe numbers.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AttributionMetrics {
    pub total_return: f64,
    pub sharpe_ratio: f64,
}

impl AttributionMetrics {
    pub fn new(total_return: f64, sharpe_ratio: f64) -> Self {
        Self {
            total_return: finite_or_zero(total_return),
            sharpe_ratio: finite_or_zero(sharpe_ratio),
        }
    }

    /// Extract both metrics from raw metric-like values.
    pub fn from_values(total_return: &Value, sharpe_ratio: &Value) -> Self {
        Self {
            total_return: safe_metric(total_return),
            sharpe_ratio: safe_metric(sharpe_ratio),
        }
    }
}

/// Normalize an arbitrary metric-like value to a finite f64.
///
/// Accepted shapes:
/// - a plain number (finite → itself, NaN/±inf → 0.0)
/// - an array of numbers (mean of the finite elements — the vector-proxy
///   reduction; empty or all-garbage arrays → 0.0)
/// - an object with a numeric `"mean"` field (pre-reduced series)
///
/// Anything else → 0.0. Never fails.
pub fn safe_metric(value: &Value) -> f64 {
    match value {
        Value::Number(n) => finite_or_zero(n.as_f64().unwrap_or(0.0)),
        Value::Array(items) => {
            let finite: Vec<f64> = items
                .iter()
                .filter_map(|v| v.as_f64())
                .filter(|v| v.is_finite())
                .collect();
            if finite.is_empty() {
                0.0
            } else {
                finite.iter().sum::<f64>() / finite.len() as f64
            }
        }
        Value::Object(map) => map
            .get("mean")
            .and_then(|v| v.as_f64())
            .map(finite_or_zero)
            .unwrap_or(0.0),
        _ => 0.0,
    }
}

fn finite_or_zero(v: f64) -> f64 {
    if v.is_finite() {
        v
    } else {
        0.0
    }
}
