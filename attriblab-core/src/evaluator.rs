//! Evaluation adapter — the seam between the attribution engine and the
//! external portfolio-simulation backend.
//!
//! Two implementations of [`Evaluator`], chosen once at construction time:
//! - [`FnEvaluator`]: wraps a closure; the deterministic test stand-in.
//! - [`BacktestEvaluator`]: the production adapter. Builds a strategy from
//!   the payload, primes its loaders from the runtime cache, runs a
//!   two-stage allocation-optimized simulation, extracts metrics through
//!   safe extraction, and reads back the loader state as the new cache.

use std::collections::HashMap;

use anyhow::Result;
use serde_json::{Map, Value};

use crate::cache::StrategyRuntimeCache;
use crate::metrics::{safe_metric, AttributionMetrics};

/// Per-symbol portfolio weights produced by the allocation optimizer.
pub type Allocation = HashMap<String, f64>;

/// Evaluate one configuration variant.
///
/// Takes the run's cache by value and returns the cache the evaluation left
/// behind; the caller threads it into the next call. `None` means nothing is
/// cached yet and a full from-scratch load is required.
pub trait Evaluator {
    fn evaluate(
        &mut self,
        params: &Value,
        cache: Option<StrategyRuntimeCache>,
    ) -> Result<(AttributionMetrics, StrategyRuntimeCache)>;
}

/// Closure-backed evaluator, used for deterministic test doubles and for
/// hosts that already own an evaluation pipeline.
pub struct FnEvaluator<F>(F);

impl<F> FnEvaluator<F>
where
    F: FnMut(&Value, Option<StrategyRuntimeCache>) -> Result<(AttributionMetrics, StrategyRuntimeCache)>,
{
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F> Evaluator for FnEvaluator<F>
where
    F: FnMut(&Value, Option<StrategyRuntimeCache>) -> Result<(AttributionMetrics, StrategyRuntimeCache)>,
{
    fn evaluate(
        &mut self,
        params: &Value,
        cache: Option<StrategyRuntimeCache>,
    ) -> Result<(AttributionMetrics, StrategyRuntimeCache)> {
        (self.0)(params, cache)
    }
}

/// Raw outcome of one simulation pass, as handed back by the backend.
#[derive(Debug, Clone, Default)]
pub struct SimulationReport {
    /// Metric-like values keyed by name; read through `safe_metric`.
    pub metrics: Map<String, Value>,
    /// Allocation the equal-weight pass found optimal, if the backend
    /// computed one. Absent means the final pass is the initial pass.
    pub optimal_allocation: Option<Allocation>,
}

/// Boundary trait for the external portfolio-simulation engine.
///
/// The attribution core never decides how a backtest is simulated; it only
/// drives this surface.
pub trait StrategyBackend {
    type Strategy;

    /// Build a concrete strategy object (and its shared settings) from a
    /// configuration payload.
    fn build(&self, params: &Value) -> Result<Self::Strategy>;

    /// Prime the strategy's internal loaders from previously-cached
    /// artifacts so redundant loading/derivation is skipped.
    fn prime(&self, strategy: &mut Self::Strategy, cache: &StrategyRuntimeCache);

    /// Run one simulation pass. `None` allocation means equal weight.
    fn simulate(
        &self,
        strategy: &mut Self::Strategy,
        allocation: Option<&Allocation>,
    ) -> Result<SimulationReport>;

    /// Read back whatever the strategy's loaders now hold.
    fn snapshot(&self, strategy: &Self::Strategy) -> StrategyRuntimeCache;
}

/// Production evaluator: two-stage allocation-optimized backtest over a
/// [`StrategyBackend`].
pub struct BacktestEvaluator<B: StrategyBackend> {
    backend: B,
}

impl<B: StrategyBackend> BacktestEvaluator<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }
}

impl<B: StrategyBackend> Evaluator for BacktestEvaluator<B> {
    fn evaluate(
        &mut self,
        params: &Value,
        cache: Option<StrategyRuntimeCache>,
    ) -> Result<(AttributionMetrics, StrategyRuntimeCache)> {
        let mut strategy = self.backend.build(params)?;

        if let Some(cache) = cache.as_ref().filter(|c| !c.is_empty()) {
            self.backend.prime(&mut strategy, cache);
        }

        // Stage one: equal-weight pass. It both measures and, when the
        // backend supports it, proposes an optimal allocation.
        let initial = self.backend.simulate(&mut strategy, None)?;

        // Stage two: re-run under the proposed allocation.
        let final_report = match initial.optimal_allocation.as_ref() {
            Some(allocation) => self.backend.simulate(&mut strategy, Some(allocation))?,
            None => initial,
        };

        let metrics = AttributionMetrics {
            total_return: final_report
                .metrics
                .get("total_return")
                .map(safe_metric)
                .unwrap_or(0.0),
            sharpe_ratio: final_report
                .metrics
                .get("sharpe_ratio")
                .map(safe_metric)
                .unwrap_or(0.0),
        };

        Ok((metrics, self.backend.snapshot(&strategy)))
    }
}
