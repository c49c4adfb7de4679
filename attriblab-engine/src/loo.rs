//! Leave-One-Out pass.
//!
//! For every enumerated target, evaluates the baseline configuration with
//! exactly that signal forced off and records baseline-minus-variant deltas.
//! A positive delta means the signal's presence improves the metric.
//!
//! Failure isolation is per signal: one failed variant records
//! `status: error` for that signal only and the pass continues. The runtime
//! cache returned by each evaluation is threaded into the next, amortizing
//! expensive shared loading across the whole pass.

use attriblab_core::{
    force_signal_disabled, AttributionMetrics, Evaluator, SignalTarget, StrategyRuntimeCache,
};
use serde_json::Value;

use crate::engine::{AttributionError, CancelFn};
use crate::report::LooResult;

/// Outcome of one LOO variant.
#[derive(Debug, Clone, PartialEq)]
pub enum LooOutcome {
    Ok {
        delta_total_return: f64,
        delta_sharpe_ratio: f64,
    },
    /// The evaluator failed for this variant; message kept for diagnostics,
    /// not emitted in the report.
    Error { message: String },
}

impl LooOutcome {
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok { .. })
    }

    pub fn to_report(&self) -> LooResult {
        match self {
            Self::Ok {
                delta_total_return,
                delta_sharpe_ratio,
            } => LooResult::Ok {
                delta_total_return: *delta_total_return,
                delta_sharpe_ratio: *delta_sharpe_ratio,
            },
            Self::Error { .. } => LooResult::Error,
        }
    }
}

/// One target plus its LOO outcome, in enumeration order.
#[derive(Debug, Clone)]
pub struct LooRecord {
    pub target: SignalTarget,
    pub outcome: LooOutcome,
}

/// Run the LOO pass over every target.
///
/// `cache` is taken before each evaluation and replaced with whatever the
/// evaluator returns. A failed evaluation leaves the cache empty, so the
/// next variant performs a full reload rather than trusting half-written
/// loader state.
///
/// `on_progress(done)` fires after each completed variant. Cancellation is
/// polled before each evaluation; an in-flight evaluation is never
/// preempted.
pub fn run_loo_pass(
    baseline_payload: &Value,
    baseline: AttributionMetrics,
    targets: &[SignalTarget],
    evaluator: &mut dyn Evaluator,
    cache: &mut Option<StrategyRuntimeCache>,
    cancel: Option<CancelFn>,
    mut on_progress: impl FnMut(usize),
) -> Result<Vec<LooRecord>, AttributionError> {
    let mut records = Vec::with_capacity(targets.len());

    for (index, target) in targets.iter().enumerate() {
        if cancel.is_some_and(|probe| probe()) {
            return Err(AttributionError::Cancelled);
        }

        let mut variant = baseline_payload.clone();
        force_signal_disabled(&mut variant, &target.param_key);

        let outcome = match evaluator.evaluate(&variant, cache.take()) {
            Ok((metrics, next_cache)) => {
                *cache = Some(next_cache);
                LooOutcome::Ok {
                    delta_total_return: baseline.total_return - metrics.total_return,
                    delta_sharpe_ratio: baseline.sharpe_ratio - metrics.sharpe_ratio,
                }
            }
            Err(err) => LooOutcome::Error {
                message: err.to_string(),
            },
        };

        records.push(LooRecord {
            target: target.clone(),
            outcome,
        });
        on_progress(index + 1);
    }

    Ok(records)
}
