//! Strategy runtime cache — expensive precomputed artifacts reused across
//! repeated evaluator calls.
//!
//! Ownership model: the orchestrator owns exactly one cache per run. Each
//! evaluation takes the cache by value and returns a (possibly new) cache;
//! the orchestrator threads it into the next call and never mutates it
//! itself. `None` for a whole cache means "nothing cached yet" — the
//! evaluator must perform a full from-scratch load.

use std::collections::HashMap;

/// Multi-asset price panels, keyed by symbol.
pub type PricePanels = HashMap<String, Vec<f64>>;

/// A single aligned numeric series (benchmark, relative, execution).
pub type Series = Vec<f64>;

/// Bag of expensive precomputed artifacts.
///
/// Each field is independently optional: an evaluator fills in whatever its
/// loaders derived, and primes a fresh strategy from whatever is present.
#[derive(Debug, Clone, Default)]
pub struct StrategyRuntimeCache {
    /// Multi-asset price panels.
    pub panels: Option<PricePanels>,
    /// Benchmark series.
    pub benchmark: Option<Series>,
    /// Derived relative-to-benchmark series.
    pub relative: Option<Series>,
    /// Execution-aligned series.
    pub execution: Option<Series>,
}

impl StrategyRuntimeCache {
    /// True when no artifact has been loaded yet.
    pub fn is_empty(&self) -> bool {
        self.panels.is_none()
            && self.benchmark.is_none()
            && self.relative.is_none()
            && self.execution.is_none()
    }
}
