//! End-to-end lifecycle tests through the public store API.

use optfolio::error::ApiError;
use optfolio::gateway::sim::SimulatedOptimizer;
use optfolio::gateway::OptimizerGateway;
use optfolio::job::{
    ConvergencePoint, JobStatus, OptimizationResults, PerformanceMetrics, ResultsSummary,
    ScenarioEvaluation,
};
use optfolio::results::ResultsView;
use optfolio::storage::StateStore;
use optfolio::store::Store;
use optfolio::strategy::{StrategyConfig, StrategyPatch};

fn metrics() -> PerformanceMetrics {
    PerformanceMetrics {
        mean_return: 0.075,
        volatility: 0.10,
        sharpe_ratio: 0.45,
        max_drawdown: -0.15,
        var95: -0.02,
        cvar95: -0.028,
        avg_equity_weight: 0.58,
    }
}

fn results_for(job_id: &str) -> OptimizationResults {
    OptimizationResults {
        job_id: job_id.to_string(),
        best_config: StrategyConfig::default(),
        best_metrics: metrics(),
        convergence: vec![
            ConvergencePoint { iteration: 0, objective: 0.2, risk: 0.13 },
            ConvergencePoint { iteration: 1, objective: 0.4, risk: 0.11 },
        ],
        evaluations: vec![
            ScenarioEvaluation { scenario: "base_case".to_string(), metrics: metrics() },
            ScenarioEvaluation { scenario: "bear_market".to_string(), metrics: metrics() },
        ],
        summary: ResultsSummary {
            total_strategies_tested: 50,
            best_sharpe_ratio: 0.45,
            convergence_iterations: 50,
            execution_time_seconds: 1.0,
        },
    }
}

#[test]
fn full_lifecycle_start_progress_complete() {
    let mut store = Store::new();
    let scenarios = vec!["base_case".to_string(), "bear_market".to_string()];

    store
        .start_job("opt-1", StrategyConfig::default(), scenarios, 50)
        .unwrap();
    store.update_progress("opt-1", 50).unwrap();

    let results = results_for("opt-1");
    store.complete_job("opt-1", results.clone()).unwrap();

    assert!(store.current_job().is_none());
    let archived = &store.history()[0];
    assert_eq!(archived.job_id, "opt-1");
    assert_eq!(archived.status, JobStatus::Completed);
    assert_eq!(archived.results.as_ref().unwrap(), &results);

    // Reads are idempotent: the attached payload never changes.
    let ResultsView::Ready(first) = store.results_view("opt-1") else {
        panic!("expected ready view");
    };
    let ResultsView::Ready(second) = store.results_view("opt-1") else {
        panic!("expected ready view");
    };
    assert_eq!(first, second);
}

#[test]
fn second_start_while_active_conflicts() {
    let mut store = Store::new();
    store
        .start_job("opt-1", StrategyConfig::default(), vec!["base_case".into()], 10)
        .unwrap();
    let err = store
        .start_job("opt-2", StrategyConfig::default(), vec!["base_case".into()], 10)
        .unwrap_err();
    assert!(matches!(err, ApiError::Conflict(_)));
}

#[test]
fn progress_never_regresses_through_store() {
    let mut store = Store::new();
    store
        .start_job("opt-1", StrategyConfig::default(), vec!["base_case".into()], 10)
        .unwrap();
    store.update_progress("opt-1", 60).unwrap();
    store.update_progress("opt-1", 30).unwrap();
    store.update_progress("opt-7", 90).unwrap(); // stale id, ignored
    assert_eq!(store.current_job().unwrap().progress, 60);
}

#[test]
fn cancel_running_job_lands_in_history_failed() {
    let mut store = Store::new();
    store
        .start_job("opt-1", StrategyConfig::default(), vec!["base_case".into()], 10)
        .unwrap();
    store.cancel().unwrap();

    assert!(store.current_job().is_none());
    let archived = &store.history()[0];
    assert_eq!(archived.status, JobStatus::Failed);
    assert!(archived.end_time.is_some());

    // Cancel with nothing active is a quiet no-op.
    store.cancel().unwrap();
    assert_eq!(store.history().len(), 1);
}

#[test]
fn patch_out_of_domain_is_clamped() {
    let mut store = Store::new();
    store
        .patch_strategy(StrategyPatch {
            target_volatility: Some(0.5),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(store.current_strategy().target_volatility, 0.20);
}

#[test]
fn toggle_pair_is_idempotent() {
    let mut store = Store::new();
    let before = store.selection();
    store.toggle_scenario("bull_market").unwrap();
    store.toggle_scenario("bull_market").unwrap();
    assert_eq!(store.selection(), before);
}

#[test]
fn start_with_empty_selection_rejected() {
    let mut store = Store::new();
    store.clear_all_scenarios().unwrap();
    let err = store
        .start_job_from_current("opt-1", 10)
        .unwrap_err();
    assert!(matches!(err, ApiError::Validation(_)));
}

#[test]
fn history_and_saved_strategies_survive_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.sqlite");
    let path = path.to_str().unwrap();

    {
        let mut persistence = StateStore::new(path).unwrap();
        persistence.init().unwrap();
        let mut store = Store::with_persistence(persistence).unwrap();

        store
            .patch_strategy(StrategyPatch {
                name: Some("Persisted".to_string()),
                ..Default::default()
            })
            .unwrap();
        store.save_strategy().unwrap();

        store
            .start_job("opt-1", StrategyConfig::default(), vec!["base_case".into()], 10)
            .unwrap();
        store.complete_job("opt-1", results_for("opt-1")).unwrap();
    }

    let mut persistence = StateStore::new(path).unwrap();
    persistence.init().unwrap();
    let store = Store::with_persistence(persistence).unwrap();

    assert_eq!(store.saved_strategies()[0].name, "Persisted");
    assert_eq!(store.history()[0].job_id, "opt-1");
    assert_eq!(store.history()[0].status, JobStatus::Completed);
    // Archived ids stay reserved after a restart.
    let mut store = store;
    let err = store
        .start_job("opt-1", StrategyConfig::default(), vec!["base_case".into()], 10)
        .unwrap_err();
    assert!(matches!(err, ApiError::Validation(_)));
}

#[tokio::test]
async fn simulated_backend_drives_store_to_completion() {
    let sim = SimulatedOptimizer::seeded(99);
    let mut store = Store::new();

    let submitted = sim
        .submit_optimization(store.current_strategy(), &store.selection(), 25)
        .await
        .unwrap();
    store
        .start_job(
            &submitted.job_id,
            submitted.strategy_config.clone(),
            submitted.market_scenarios.clone(),
            submitted.iterations,
        )
        .unwrap();

    loop {
        let polled = sim.get_optimization_status(&submitted.job_id).await.unwrap();
        store
            .update_progress(&submitted.job_id, polled.progress as u32)
            .unwrap();
        match polled.status {
            JobStatus::Completed => {
                let results = sim
                    .get_optimization_results(&submitted.job_id)
                    .await
                    .unwrap();
                store.complete_job(&submitted.job_id, results).unwrap();
                break;
            }
            JobStatus::Failed => {
                store.fail_job(&submitted.job_id).unwrap();
                break;
            }
            _ => {}
        }
    }

    let ResultsView::Ready(report) = store.results_view(&submitted.job_id) else {
        panic!("expected completed results");
    };
    assert_eq!(report.objective_series.len(), 25);
    assert_eq!(report.scenario_table.len(), store.selection().len());
    assert!(store.current_job().is_none());
}
