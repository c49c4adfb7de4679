//! Attribution orchestrator.
//!
//! Runs the phases in order — baseline evaluation, LOO pass, Top-N
//! selection, Shapley pass — and assembles the final report. The phase
//! sequence is `INIT → BASELINE → LOO → TOP_N → SHAPLEY(optional) →
//! ASSEMBLE → DONE`.
//!
//! Progress is reported through a `(message, progress ∈ [0,1])` callback:
//! at minimum once after the baseline and once at completion with 1.0, plus
//! incrementally per LOO variant and per Shapley unit. Cancellation is a
//! cooperative probe polled between evaluator calls; when it fires, the run
//! aborts with [`AttributionError::Cancelled`], which callers must surface
//! as a cancelled outcome, never a failed one.

use thiserror::Error;

use attriblab_core::{
    enumerate_targets, ConfigSource, Evaluator, SignalRegistry, StrategyRuntimeCache,
};

use crate::loo::run_loo_pass;
use crate::report::{AttributionReport, ShapleySummary, SignalReport, TopNReport};
use crate::selection::select_top_n;
use crate::shapley::{run_shapley_pass, ShapleyPhase, ShapleySettings};

/// Progress callback: human-readable message plus overall fraction in [0, 1].
pub type ProgressFn<'a> = &'a dyn Fn(&str, f64);

/// Cancellation probe: polled between evaluator calls.
pub type CancelFn<'a> = &'a dyn Fn() -> bool;

// Phase boundaries on the overall progress scale.
const BASELINE_DONE: f64 = 0.05;
const LOO_DONE: f64 = 0.60;
const TOP_N_DONE: f64 = 0.65;
const SHAPLEY_DONE: f64 = 0.95;

/// Errors that abort a whole attribution run.
///
/// Per-signal and per-phase failures never surface here — they are isolated
/// into the report (`loo.status = error`, `shapley.method = error`).
#[derive(Debug, Error)]
pub enum AttributionError {
    /// The cancellation probe fired. Not an ordinary failure.
    #[error("attribution run cancelled")]
    Cancelled,
    /// The baseline configuration could not be loaded.
    #[error("failed to load baseline configuration: {0}")]
    Config(anyhow::Error),
    /// The baseline evaluation failed; no deltas can be computed without it.
    #[error("baseline evaluation failed: {0}")]
    Baseline(anyhow::Error),
}

/// Engine options.
#[derive(Debug, Clone)]
pub struct AttributionConfig {
    /// Maximum number of signals promoted to the Shapley phase.
    pub top_n: usize,
    /// Permutations drawn in Monte-Carlo mode. Zero skips the Shapley phase.
    pub permutation_samples: usize,
    /// Player counts up to this run exact subset enumeration.
    pub exact_player_threshold: usize,
    /// Optional RNG seed; when set, permutation mode is bit-for-bit
    /// reproducible.
    pub seed: Option<u64>,
}

impl Default for AttributionConfig {
    fn default() -> Self {
        Self {
            top_n: 5,
            permutation_samples: 200,
            exact_player_threshold: 2,
            seed: None,
        }
    }
}

/// Signal attribution engine.
///
/// Owns its collaborators for the lifetime of the engine; every `run()`
/// rebuilds all per-run state (targets, cache, report) from scratch.
pub struct AttributionEngine<S: ConfigSource, E: Evaluator> {
    source: S,
    evaluator: E,
    registry: SignalRegistry,
    config: AttributionConfig,
}

impl<S: ConfigSource, E: Evaluator> AttributionEngine<S, E> {
    pub fn new(source: S, evaluator: E) -> Self {
        Self {
            source,
            evaluator,
            registry: attriblab_core::default_registry(),
            config: AttributionConfig::default(),
        }
    }

    pub fn with_registry(mut self, registry: SignalRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_config(mut self, config: AttributionConfig) -> Self {
        self.config = config;
        self
    }

    /// Run the full attribution analysis.
    pub fn run(
        &mut self,
        progress: Option<ProgressFn>,
        cancel: Option<CancelFn>,
    ) -> Result<AttributionReport, AttributionError> {
        let report = |msg: &str, fraction: f64| {
            if let Some(cb) = progress {
                cb(msg, fraction);
            }
        };
        let cancelled = || cancel.is_some_and(|probe| probe());

        // BASELINE
        let payload = self.source.load().map_err(AttributionError::Config)?;
        let targets = enumerate_targets(&payload, &self.registry);

        let mut cache: Option<StrategyRuntimeCache> = None;
        let (baseline, primed) = self
            .evaluator
            .evaluate(&payload, cache.take())
            .map_err(AttributionError::Baseline)?;
        cache = Some(primed);
        report("baseline evaluated", BASELINE_DONE);

        if cancelled() {
            return Err(AttributionError::Cancelled);
        }

        // LOO
        let total = targets.len();
        let records = run_loo_pass(
            &payload,
            baseline,
            &targets,
            &mut self.evaluator,
            &mut cache,
            cancel,
            |done| {
                let span = LOO_DONE - BASELINE_DONE;
                let fraction = BASELINE_DONE + span * done as f64 / total.max(1) as f64;
                report(&format!("loo {done}/{total}"), fraction);
            },
        )?;

        // TOP_N
        let selection = select_top_n(&records, self.config.top_n);
        report(
            &format!("top-{} selected", selection.top_n_effective),
            TOP_N_DONE,
        );

        // SHAPLEY (skipped entirely when nothing was selected)
        let phase = if selection.selected_signal_ids.is_empty() {
            ShapleyPhase::Skipped
        } else {
            let players: Vec<_> = selection
                .selected_signal_ids
                .iter()
                .filter_map(|id| targets.iter().find(|t| &t.signal_id == id))
                .cloned()
                .collect();
            let settings = ShapleySettings {
                permutation_samples: self.config.permutation_samples,
                exact_player_threshold: self.config.exact_player_threshold,
                seed: self.config.seed,
            };
            run_shapley_pass(
                &payload,
                &players,
                &mut self.evaluator,
                &mut cache,
                &settings,
                cancel,
                |done, units| {
                    let span = SHAPLEY_DONE - TOP_N_DONE;
                    let fraction = TOP_N_DONE + span * done as f64 / units.max(1) as f64;
                    report(&format!("shapley {done}/{units}"), fraction);
                },
            )?
        };

        // ASSEMBLE
        let signals: Vec<SignalReport> = records
            .iter()
            .map(|record| SignalReport {
                signal_id: record.target.signal_id.clone(),
                loo: record.outcome.to_report(),
                shapley: phase.result_for(&record.target.signal_id),
            })
            .collect();

        let report_doc = AttributionReport {
            baseline,
            signals,
            top_n_selection: TopNReport {
                top_n_effective: selection.top_n_effective,
                selected_signal_ids: selection.selected_signal_ids,
            },
            shapley: ShapleySummary {
                method: phase.method(),
                sample_size: phase.sample_size(),
                evaluations: phase.evaluations(),
            },
        };

        report("attribution complete", 1.0);
        Ok(report_doc)
    }
}
