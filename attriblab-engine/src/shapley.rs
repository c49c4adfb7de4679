//! Shapley decomposition over the Top-N selected signals.
//!
//! Players are the selected signal ids only; every non-selected signal stays
//! at its baseline state in every coalition evaluation.
//!
//! Two modes with a principled switchover:
//! - exact subset enumeration for small player counts (every subset of the
//!   player set evaluated exactly once, standard weighted-marginal formula);
//! - seeded Monte-Carlo permutation sampling otherwise (coalitions grown
//!   incrementally, marginal contributions averaged across orderings).
//!
//! Coalition evaluations are deduplicated within a run through a
//! content-addressed cache (blake3 over the serialized variant payload), so
//! `evaluations` in the report counts actual evaluator calls while
//! `sample_size` counts permutations requested.
//!
//! Failure isolation is whole-phase: one failed coalition marks the phase
//! (and every selected signal) as error; LOO results computed earlier are
//! unaffected. Cancellation is polled at subset/permutation boundaries and
//! aborts the entire run.

use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde_json::Value;

use attriblab_core::{
    force_signal_disabled, AttributionMetrics, Evaluator, SignalTarget, StrategyRuntimeCache,
};

use crate::engine::{AttributionError, CancelFn};
use crate::report::{ShapleyMethod, ShapleyResult};

/// Knobs for the Shapley pass.
#[derive(Debug, Clone)]
pub struct ShapleySettings {
    /// Permutations drawn in Monte-Carlo mode. Zero skips the phase.
    pub permutation_samples: usize,
    /// Player counts up to this use exact subset enumeration.
    pub exact_player_threshold: usize,
    /// Optional RNG seed for reproducible permutation sampling.
    pub seed: Option<u64>,
}

/// Outcome of the Shapley phase.
#[derive(Debug, Clone)]
pub enum ShapleyPhase {
    /// No players were selected; the phase never ran.
    Skipped,
    Ok {
        method: ShapleyMethod,
        sample_size: usize,
        evaluations: usize,
        /// Per-player Shapley values, keyed by signal id.
        values: HashMap<String, AttributionMetrics>,
    },
    /// A coalition evaluation failed; every selected signal is marked error.
    Failed {
        sample_size: usize,
        evaluations: usize,
        player_ids: Vec<String>,
    },
}

impl ShapleyPhase {
    pub fn method(&self) -> Option<ShapleyMethod> {
        match self {
            Self::Skipped => None,
            Self::Ok { method, .. } => Some(*method),
            Self::Failed { .. } => Some(ShapleyMethod::Error),
        }
    }

    pub fn sample_size(&self) -> usize {
        match self {
            Self::Skipped => 0,
            Self::Ok { sample_size, .. } | Self::Failed { sample_size, .. } => *sample_size,
        }
    }

    pub fn evaluations(&self) -> usize {
        match self {
            Self::Skipped => 0,
            Self::Ok { evaluations, .. } | Self::Failed { evaluations, .. } => *evaluations,
        }
    }

    /// Per-signal report entry: ok for computed players, error for players
    /// of a failed phase, skipped for everything else.
    pub fn result_for(&self, signal_id: &str) -> ShapleyResult {
        match self {
            Self::Skipped => ShapleyResult::Skipped,
            Self::Ok { values, .. } => match values.get(signal_id) {
                Some(v) => ShapleyResult::Ok {
                    total_return: v.total_return,
                    sharpe_ratio: v.sharpe_ratio,
                },
                None => ShapleyResult::Skipped,
            },
            Self::Failed { player_ids, .. } => {
                if player_ids.iter().any(|id| id == signal_id) {
                    ShapleyResult::Error
                } else {
                    ShapleyResult::Skipped
                }
            }
        }
    }
}

/// Run the Shapley pass over the selected players.
pub fn run_shapley_pass(
    baseline_payload: &Value,
    players: &[SignalTarget],
    evaluator: &mut dyn Evaluator,
    cache: &mut Option<StrategyRuntimeCache>,
    settings: &ShapleySettings,
    cancel: Option<CancelFn>,
    on_progress: impl FnMut(usize, usize),
) -> Result<ShapleyPhase, AttributionError> {
    if players.is_empty() {
        return Ok(ShapleyPhase::Skipped);
    }

    let mut coalitions = CoalitionEvaluator {
        baseline: baseline_payload,
        players,
        evaluator,
        cache,
        memo: HashMap::new(),
        evaluations: 0,
    };

    if players.len() <= settings.exact_player_threshold.min(EXACT_PLAYER_CAP) {
        run_exact(&mut coalitions, cancel, on_progress)
    } else {
        run_permutation(&mut coalitions, settings, cancel, on_progress)
    }
}

/// Hard ceiling on exact enumeration regardless of `exact_player_threshold`;
/// subset count doubles per player, so past this point the permutation
/// sampler is always used.
const EXACT_PLAYER_CAP: usize = 20;

// ─── Coalition evaluation with content-addressed dedup ───────────────

struct CoalitionEvaluator<'a> {
    baseline: &'a Value,
    players: &'a [SignalTarget],
    evaluator: &'a mut dyn Evaluator,
    cache: &'a mut Option<StrategyRuntimeCache>,
    /// blake3 of the serialized variant payload → metrics.
    memo: HashMap<String, AttributionMetrics>,
    evaluations: usize,
}

impl CoalitionEvaluator<'_> {
    fn player_ids(&self) -> Vec<String> {
        self.players.iter().map(|p| p.signal_id.clone()).collect()
    }

    /// Value of the coalition whose membership flags are set in `members`
    /// (indexed like `players`).
    ///
    /// The evaluated configuration is the baseline with every selected
    /// player *not* in the coalition forced disabled; non-selected signals
    /// are untouched.
    fn value_of(&mut self, members: &[bool]) -> anyhow::Result<AttributionMetrics> {
        let mut variant = self.baseline.clone();
        for (player, &in_coalition) in self.players.iter().zip(members) {
            if !in_coalition {
                force_signal_disabled(&mut variant, &player.param_key);
            }
        }

        let key = blake3::hash(variant.to_string().as_bytes())
            .to_hex()
            .to_string();
        if let Some(metrics) = self.memo.get(&key) {
            return Ok(*metrics);
        }

        let (metrics, next_cache) = self.evaluator.evaluate(&variant, self.cache.take())?;
        *self.cache = Some(next_cache);
        self.evaluations += 1;
        self.memo.insert(key, metrics);
        Ok(metrics)
    }
}

// ─── Exact mode ──────────────────────────────────────────────────────

fn run_exact(
    coalitions: &mut CoalitionEvaluator<'_>,
    cancel: Option<CancelFn>,
    mut on_progress: impl FnMut(usize, usize),
) -> Result<ShapleyPhase, AttributionError> {
    let n = coalitions.players.len();
    // n is capped at EXACT_PLAYER_CAP, so the shift cannot overflow.
    let subset_count: usize = 1 << n;
    let sample_size = subset_count;

    // One evaluation per subset, reused for both metrics.
    let mut subset_values = Vec::with_capacity(sample_size);
    for mask in 0..subset_count {
        if cancel.is_some_and(|probe| probe()) {
            return Err(AttributionError::Cancelled);
        }
        let members: Vec<bool> = (0..n).map(|index| mask & (1 << index) != 0).collect();
        match coalitions.value_of(&members) {
            Ok(metrics) => subset_values.push(metrics),
            Err(_) => {
                return Ok(ShapleyPhase::Failed {
                    sample_size,
                    evaluations: coalitions.evaluations,
                    player_ids: coalitions.player_ids(),
                })
            }
        }
        on_progress(mask + 1, sample_size);
    }

    // Standard weighted marginal-contribution formula:
    //   phi_i = sum over S not containing i of
    //           |S|! (n-1-|S|)! / n! * (v(S ∪ {i}) − v(S))
    let n_factorial = factorial(n);
    let mut values = HashMap::new();
    for (index, player) in coalitions.players.iter().enumerate() {
        let bit = 1usize << index;
        let mut total_return = 0.0;
        let mut sharpe_ratio = 0.0;
        for mask in 0..subset_count {
            if mask & bit != 0 {
                continue;
            }
            let s = mask.count_ones() as usize;
            let weight = factorial(s) * factorial(n - 1 - s) / n_factorial;
            let without = subset_values[mask];
            let with = subset_values[mask | bit];
            total_return += weight * (with.total_return - without.total_return);
            sharpe_ratio += weight * (with.sharpe_ratio - without.sharpe_ratio);
        }
        values.insert(
            player.signal_id.clone(),
            AttributionMetrics::new(total_return, sharpe_ratio),
        );
    }

    Ok(ShapleyPhase::Ok {
        method: ShapleyMethod::Exact,
        sample_size,
        evaluations: coalitions.evaluations,
        values,
    })
}

fn factorial(n: usize) -> f64 {
    (1..=n).fold(1.0, |acc, k| acc * k as f64)
}

// ─── Permutation (Monte-Carlo) mode ──────────────────────────────────

fn run_permutation(
    coalitions: &mut CoalitionEvaluator<'_>,
    settings: &ShapleySettings,
    cancel: Option<CancelFn>,
    mut on_progress: impl FnMut(usize, usize),
) -> Result<ShapleyPhase, AttributionError> {
    let n = coalitions.players.len();
    let sample_size = settings.permutation_samples;
    if sample_size == 0 {
        return Ok(ShapleyPhase::Skipped);
    }

    let mut rng = match settings.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let mut order: Vec<usize> = (0..n).collect();
    let mut members = vec![false; n];
    let mut running = vec![(0.0f64, 0.0f64); n];

    let failed = |coalitions: &CoalitionEvaluator<'_>| ShapleyPhase::Failed {
        sample_size,
        evaluations: coalitions.evaluations,
        player_ids: coalitions.player_ids(),
    };

    for sample in 0..sample_size {
        if cancel.is_some_and(|probe| probe()) {
            return Err(AttributionError::Cancelled);
        }
        order.shuffle(&mut rng);

        // Grow the coalition from empty to full, crediting each player with
        // its marginal contribution at the point it joins.
        members.fill(false);
        let mut previous = match coalitions.value_of(&members) {
            Ok(metrics) => metrics,
            Err(_) => return Ok(failed(coalitions)),
        };
        for &index in &order {
            members[index] = true;
            let current = match coalitions.value_of(&members) {
                Ok(metrics) => metrics,
                Err(_) => return Ok(failed(coalitions)),
            };
            running[index].0 += current.total_return - previous.total_return;
            running[index].1 += current.sharpe_ratio - previous.sharpe_ratio;
            previous = current;
        }
        on_progress(sample + 1, sample_size);
    }

    let values = coalitions
        .players
        .iter()
        .enumerate()
        .map(|(index, player)| {
            let (total_return, sharpe_ratio) = running[index];
            (
                player.signal_id.clone(),
                AttributionMetrics::new(
                    total_return / sample_size as f64,
                    sharpe_ratio / sample_size as f64,
                ),
            )
        })
        .collect();

    Ok(ShapleyPhase::Ok {
        method: ShapleyMethod::Permutation,
        sample_size,
        evaluations: coalitions.evaluations,
        values,
    })
}
