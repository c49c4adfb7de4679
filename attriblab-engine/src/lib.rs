//! AttribLab Engine — per-signal attribution of strategy performance.
//!
//! Builds on `attriblab-core` to provide:
//! - Leave-One-Out pass with per-signal failure isolation
//! - Top-N impact selection with cross-metric normalization
//! - Shapley decomposition (exact subsets or seeded Monte-Carlo permutations)
//! - Orchestrator with progress callbacks and cooperative cancellation
//! - Serializable attribution report

pub mod engine;
pub mod loo;
pub mod report;
pub mod selection;
pub mod shapley;

pub use engine::{AttributionConfig, AttributionEngine, AttributionError, CancelFn, ProgressFn};
pub use loo::{run_loo_pass, LooOutcome, LooRecord};
pub use report::{
    AttributionReport, LooResult, ShapleyMethod, ShapleyResult, ShapleySummary, SignalReport,
    TopNReport,
};
pub use selection::{select_top_n, TopNSelection};
pub use shapley::{run_shapley_pass, ShapleyPhase, ShapleySettings};
