//! Top-N selection.
//!
//! Ranks ok-status LOO outcomes by a normalized impact score and picks a
//! bounded player set for the Shapley phase.
//!
//! Score: |delta| of each metric is min–max scaled across the ok signals
//! (so neither metric dominates purely by numeric range), then the two
//! scaled components combine by `max`. A degenerate range (all magnitudes
//! equal) scales to 0.0 for that metric. Ties keep first-discovered order
//! via stable sort.

use serde::Serialize;

use crate::loo::{LooOutcome, LooRecord};

/// Result of Top-N selection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopNSelection {
    /// `min(configured_top_n, count of ok-status signals)`.
    pub top_n_effective: usize,
    /// Exactly `top_n_effective` ids, descending score.
    pub selected_signal_ids: Vec<String>,
}

/// Select the most impactful signals from the LOO records.
pub fn select_top_n(records: &[LooRecord], configured_top_n: usize) -> TopNSelection {
    let ok: Vec<(&str, f64, f64)> = records
        .iter()
        .filter_map(|record| match &record.outcome {
            LooOutcome::Ok {
                delta_total_return,
                delta_sharpe_ratio,
            } => Some((
                record.target.signal_id.as_str(),
                delta_total_return.abs(),
                delta_sharpe_ratio.abs(),
            )),
            LooOutcome::Error { .. } => None,
        })
        .collect();

    let top_n_effective = configured_top_n.min(ok.len());
    if top_n_effective == 0 {
        return TopNSelection {
            top_n_effective: 0,
            selected_signal_ids: Vec::new(),
        };
    }

    let return_scale = min_max(ok.iter().map(|(_, r, _)| *r));
    let sharpe_scale = min_max(ok.iter().map(|(_, _, s)| *s));

    let mut scored: Vec<(&str, f64)> = ok
        .iter()
        .map(|(id, ret, sharpe)| {
            let score = return_scale.apply(*ret).max(sharpe_scale.apply(*sharpe));
            (*id, score)
        })
        .collect();

    // Stable sort: equal scores keep discovery order.
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    TopNSelection {
        top_n_effective,
        selected_signal_ids: scored
            .into_iter()
            .take(top_n_effective)
            .map(|(id, _)| id.to_string())
            .collect(),
    }
}

/// Min–max scaling parameters for one metric.
#[derive(Debug, Clone, Copy)]
struct MinMax {
    min: f64,
    range: f64,
}

impl MinMax {
    fn apply(&self, v: f64) -> f64 {
        if self.range > 0.0 {
            (v - self.min) / self.range
        } else {
            0.0
        }
    }
}

fn min_max(values: impl Iterator<Item = f64>) -> MinMax {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for v in values {
        min = min.min(v);
        max = max.max(v);
    }
    MinMax {
        min,
        range: max - min,
    }
}
