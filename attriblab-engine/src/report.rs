//! Attribution report — the one document a run produces.
//!
//! Composed only of plain numbers/strings/booleans/nested mappings/lists so
//! an enclosing HTTP layer can serialize it directly; this crate owns no
//! wire format beyond that. Entries in `signals` are keyed by `signal_id`
//! and emitted in enumeration order — consumers should look up by id, not
//! rely on array position.

use serde::Serialize;

use attriblab_core::AttributionMetrics;

/// Full result of one attribution run.
#[derive(Debug, Clone, Serialize)]
pub struct AttributionReport {
    /// Baseline metrics every delta is relative to.
    pub baseline: AttributionMetrics,
    /// Per-signal results, one entry per enumerated target.
    pub signals: Vec<SignalReport>,
    pub top_n_selection: TopNReport,
    pub shapley: ShapleySummary,
}

/// Per-signal attribution entry.
#[derive(Debug, Clone, Serialize)]
pub struct SignalReport {
    pub signal_id: String,
    pub loo: LooResult,
    pub shapley: ShapleyResult,
}

/// LOO outcome for one signal. Positive deltas mean the signal's presence
/// improves the metric.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LooResult {
    Ok {
        delta_total_return: f64,
        delta_sharpe_ratio: f64,
    },
    Error,
}

/// Shapley outcome for one signal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ShapleyResult {
    Ok { total_return: f64, sharpe_ratio: f64 },
    Error,
    /// Signal was not selected for the Shapley phase (or the phase never
    /// ran).
    Skipped,
}

/// How the Top-N selection resolved.
#[derive(Debug, Clone, Serialize)]
pub struct TopNReport {
    pub top_n_effective: usize,
    pub selected_signal_ids: Vec<String>,
}

/// Which Shapley algorithm ran, and what it cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ShapleyMethod {
    Exact,
    Permutation,
    Error,
}

/// Phase-level Shapley accounting.
#[derive(Debug, Clone, Serialize)]
pub struct ShapleySummary {
    /// `None` when the phase was skipped (no selected signals).
    pub method: Option<ShapleyMethod>,
    /// Subsets enumerated (exact) or permutations requested (Monte-Carlo).
    pub sample_size: usize,
    /// Actual evaluator calls made, after coalition dedup.
    pub evaluations: usize,
}
