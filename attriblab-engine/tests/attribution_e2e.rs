//! End-to-end attribution runs against deterministic stand-in evaluators.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use anyhow::anyhow;
use serde_json::{json, Value};

use attriblab_core::{
    default_registry, enumerate_targets, AttributionMetrics, FnConfigSource, FnEvaluator,
    StrategyRuntimeCache,
};
use attriblab_engine::{
    AttributionConfig, AttributionEngine, AttributionError, LooResult, ShapleyMethod,
    ShapleyResult,
};

fn two_signal_payload() -> Value {
    json!({
        "shared": {"universe": ["AAA", "BBB", "CCC"]},
        "entry_signals": {
            "volume": {"enabled": true, "window": 20},
        },
        "exit_signals": {
            "volume": {"enabled": true, "window": 10},
        },
    })
}

/// Additive evaluator matching the worked example in the design docs:
/// `entry.volume` contributes +10 return / +1.0 sharpe, `exit.volume`
/// contributes −3 / −0.3, empty configuration is worth 0.
fn additive_eval(
    params: &Value,
    cache: Option<StrategyRuntimeCache>,
) -> anyhow::Result<(AttributionMetrics, StrategyRuntimeCache)> {
    let mut total = 0.0;
    let mut sharpe = 0.0;
    for target in enumerate_targets(params, &default_registry()) {
        let (t, s) = match target.signal_id.as_str() {
            "entry.volume" => (10.0, 1.0),
            "exit.volume" => (-3.0, -0.3),
            _ => (0.0, 0.0),
        };
        total += t;
        sharpe += s;
    }
    Ok((AttributionMetrics::new(total, sharpe), cache.unwrap_or_default()))
}

#[test]
fn additive_two_signal_scenario() {
    let mut engine = AttributionEngine::new(
        FnConfigSource::new(|| Ok(two_signal_payload())),
        FnEvaluator::new(additive_eval),
    );

    let report = engine.run(None, None).unwrap();

    // Baseline is the joint value.
    assert_eq!(report.baseline.total_return, 7.0);
    assert!((report.baseline.sharpe_ratio - 0.7).abs() < 1e-12);

    // LOO deltas equal the solo contributions exactly.
    assert_eq!(report.signals.len(), 2);
    let loo_of = |id: &str| {
        report
            .signals
            .iter()
            .find(|s| s.signal_id == id)
            .map(|s| s.loo)
            .unwrap()
    };
    // Deltas are exact: baseline minus variant, bit for bit. The variant
    // values are the solo contributions of the remaining signal.
    assert_eq!(
        loo_of("entry.volume"),
        LooResult::Ok {
            delta_total_return: 10.0,
            delta_sharpe_ratio: report.baseline.sharpe_ratio - (-0.3),
        }
    );
    assert_eq!(
        loo_of("exit.volume"),
        LooResult::Ok {
            delta_total_return: -3.0,
            delta_sharpe_ratio: report.baseline.sharpe_ratio - 1.0,
        }
    );

    // Both selected, exact mode, 2^2 subsets.
    assert_eq!(report.top_n_selection.top_n_effective, 2);
    assert_eq!(report.shapley.method, Some(ShapleyMethod::Exact));
    assert_eq!(report.shapley.sample_size, 4);

    // Exact Shapley reproduces the additive split.
    let shapley_of = |id: &str| {
        report
            .signals
            .iter()
            .find(|s| s.signal_id == id)
            .map(|s| s.shapley)
            .unwrap()
    };
    let ShapleyResult::Ok {
        total_return,
        sharpe_ratio,
    } = shapley_of("entry.volume")
    else {
        panic!("expected ok shapley");
    };
    assert_eq!(total_return, 10.0);
    assert!((sharpe_ratio - 1.0).abs() < 1e-12);

    let ShapleyResult::Ok { total_return, .. } = shapley_of("exit.volume") else {
        panic!("expected ok shapley");
    };
    assert_eq!(total_return, -3.0);
}

#[test]
fn zero_enabled_signals_short_circuits() {
    let payload = json!({
        "shared": {},
        "entry_signals": {"volume": {"enabled": false}},
        "exit_signals": {},
    });
    let mut engine = AttributionEngine::new(
        FnConfigSource::new(move || Ok(payload.clone())),
        FnEvaluator::new(additive_eval),
    );

    let last_progress = Rc::new(Cell::new(0.0));
    let seen = Rc::clone(&last_progress);
    let progress = move |_msg: &str, fraction: f64| seen.set(fraction);

    let report = engine.run(Some(&progress), None).unwrap();

    assert!(report.signals.is_empty());
    assert_eq!(report.top_n_selection.top_n_effective, 0);
    assert!(report.top_n_selection.selected_signal_ids.is_empty());
    assert!(report.shapley.method.is_none());
    assert_eq!(report.shapley.sample_size, 0);
    assert_eq!(last_progress.get(), 1.0);
}

#[test]
fn single_loo_failure_is_isolated_and_excluded_from_top_n() {
    let payload = json!({
        "entry_signals": {
            "volume": {"enabled": true},
            "momentum": {"enabled": true},
            "rsi": {"enabled": true},
        },
    });
    let evaluator = FnEvaluator::new(
        move |params: &Value, cache: Option<StrategyRuntimeCache>| {
            // Only the variant that disabled entry.momentum fails.
            if params["entry_signals"]["momentum"]["enabled"] == json!(false) {
                return Err(anyhow!("momentum variant crashed"));
            }
            additive_eval(params, cache)
        },
    );
    let source = {
        let payload = payload.clone();
        FnConfigSource::new(move || Ok(payload.clone()))
    };
    let mut engine = AttributionEngine::new(source, evaluator);

    let report = engine.run(None, None).unwrap();

    let status_of = |id: &str| {
        report
            .signals
            .iter()
            .find(|s| s.signal_id == id)
            .map(|s| s.loo)
            .unwrap()
    };
    assert_eq!(status_of("entry.momentum"), LooResult::Error);
    assert!(matches!(status_of("entry.volume"), LooResult::Ok { .. }));
    assert!(matches!(status_of("entry.rsi"), LooResult::Ok { .. }));

    assert_eq!(report.top_n_selection.top_n_effective, 2);
    assert!(!report
        .top_n_selection
        .selected_signal_ids
        .contains(&"entry.momentum".to_string()));
}

#[test]
fn shapley_failure_preserves_loo_results() {
    // Succeed through baseline + LOO (3 evaluator calls), then fail every
    // coalition evaluation.
    let calls = Rc::new(Cell::new(0usize));
    let counter = Rc::clone(&calls);
    let evaluator = FnEvaluator::new(
        move |params: &Value, cache: Option<StrategyRuntimeCache>| {
            counter.set(counter.get() + 1);
            if counter.get() > 3 {
                return Err(anyhow!("backend went away"));
            }
            additive_eval(params, cache)
        },
    );
    let mut engine = AttributionEngine::new(
        FnConfigSource::new(|| Ok(two_signal_payload())),
        evaluator,
    );

    let report = engine.run(None, None).unwrap();

    assert_eq!(report.shapley.method, Some(ShapleyMethod::Error));
    for signal in &report.signals {
        assert_eq!(signal.shapley, ShapleyResult::Error);
        assert!(matches!(signal.loo, LooResult::Ok { .. }));
    }
}

#[test]
fn cancellation_after_baseline_never_returns_a_report() {
    let evaluator_calls = Rc::new(Cell::new(0usize));
    let counter = Rc::clone(&evaluator_calls);
    let evaluator = FnEvaluator::new(
        move |params: &Value, cache: Option<StrategyRuntimeCache>| {
            counter.set(counter.get() + 1);
            additive_eval(params, cache)
        },
    );
    let mut engine = AttributionEngine::new(
        FnConfigSource::new(|| Ok(two_signal_payload())),
        evaluator,
    );

    let cancel = || true;
    let result = engine.run(None, Some(&cancel));

    assert!(matches!(result, Err(AttributionError::Cancelled)));
    // The baseline ran; no LOO variant did.
    assert_eq!(evaluator_calls.get(), 1);
}

#[test]
fn seeded_permutation_run_is_reproducible_end_to_end() {
    let payload = json!({
        "entry_signals": {
            "volume": {"enabled": true},
            "momentum": {"enabled": true},
            "rsi": {"enabled": true},
            "trend": {"enabled": true},
        },
    });
    let config = AttributionConfig {
        top_n: 4,
        permutation_samples: 40,
        exact_player_threshold: 2,
        seed: Some(99),
    };

    let run = || {
        let payload = payload.clone();
        let mut engine = AttributionEngine::new(
            FnConfigSource::new(move || Ok(payload.clone())),
            FnEvaluator::new(additive_eval),
        )
        .with_config(config.clone());
        serde_json::to_value(engine.run(None, None).unwrap()).unwrap()
    };

    let first = run();
    let second = run();
    assert_eq!(first, second);
    assert_eq!(first["shapley"]["method"], json!("permutation"));
    assert_eq!(first["shapley"]["sample_size"], json!(40));
}

#[test]
fn progress_is_monotonic_and_ends_at_one() {
    let fractions = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&fractions);
    let progress = move |_msg: &str, fraction: f64| sink.borrow_mut().push(fraction);

    let mut engine = AttributionEngine::new(
        FnConfigSource::new(|| Ok(two_signal_payload())),
        FnEvaluator::new(additive_eval),
    );
    engine.run(Some(&progress), None).unwrap();

    let fractions = fractions.borrow();
    assert!(fractions.len() >= 2);
    assert!(fractions.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(*fractions.last().unwrap(), 1.0);
}

#[test]
fn config_load_failure_fails_the_whole_run() {
    let mut engine = AttributionEngine::new(
        FnConfigSource::new(|| Err(anyhow!("strategy file missing"))),
        FnEvaluator::new(additive_eval),
    );
    let result = engine.run(None, None);
    assert!(matches!(result, Err(AttributionError::Config(_))));
}

#[test]
fn baseline_evaluation_failure_fails_the_whole_run() {
    let evaluator = FnEvaluator::new(|_: &Value, _| Err(anyhow!("no data loaded")));
    let mut engine = AttributionEngine::new(
        FnConfigSource::new(|| Ok(two_signal_payload())),
        evaluator,
    );
    let result = engine.run(None, None);
    assert!(matches!(result, Err(AttributionError::Baseline(_))));
}
