//! AttribLab Core — domain types and seams for signal attribution.
//!
//! This crate contains everything the attribution passes build on:
//! - Safe metric extraction (finite-number normalization)
//! - Strategy runtime cache (artifact threading across evaluator calls)
//! - Configuration payload model (tagged signal-node parse, lenient path writer)
//! - Signal definition registry with scope restrictions
//! - Signal target enumeration (parent gating, exit_disabled)
//! - Evaluator seam with the production two-stage backtest adapter
//! - Configuration source seam (injected loader or runner collaborator)

pub mod cache;
pub mod evaluator;
pub mod metrics;
pub mod payload;
pub mod registry;
pub mod source;
pub mod targets;

pub use cache::{PricePanels, Series, StrategyRuntimeCache};
pub use evaluator::{
    Allocation, BacktestEvaluator, Evaluator, FnEvaluator, SimulationReport, StrategyBackend,
};
pub use metrics::{safe_metric, AttributionMetrics};
pub use payload::{
    force_signal_disabled, parse_section, SignalNode, ENTRY_SECTION, EXIT_SECTION,
};
pub use registry::{default_registry, SignalDef, SignalRegistry};
pub use source::{ConfigRunner, ConfigSource, FnConfigSource, RunnerConfigSource};
pub use targets::{enumerate_targets, Scope, SignalTarget};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn metrics_are_send_sync() {
        assert_send::<AttributionMetrics>();
        assert_sync::<AttributionMetrics>();
    }

    #[test]
    fn cache_is_send_sync() {
        assert_send::<StrategyRuntimeCache>();
        assert_sync::<StrategyRuntimeCache>();
    }

    #[test]
    fn signal_model_is_send_sync() {
        assert_send::<SignalNode>();
        assert_sync::<SignalNode>();
        assert_send::<SignalTarget>();
        assert_sync::<SignalTarget>();
        assert_send::<Scope>();
        assert_sync::<Scope>();
    }

    #[test]
    fn registry_is_send_sync() {
        assert_send::<SignalRegistry>();
        assert_sync::<SignalRegistry>();
        assert_send::<SignalDef>();
        assert_sync::<SignalDef>();
    }

    #[test]
    fn simulation_report_is_send_sync() {
        assert_send::<SimulationReport>();
        assert_sync::<SimulationReport>();
    }
}
