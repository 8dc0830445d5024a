//! Read-only projection of a job's results for presentation.
//!
//! "Job not found" and "still running" are distinct, user-visible states of
//! the projection, never errors or panics.

use serde::Serialize;

use crate::engine::AppState;
use crate::job::{JobStatus, OptimizationResults, PerformanceMetrics, ScenarioEvaluation};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ResultsView {
    /// No job with this id was ever seen.
    NotFound,
    /// The job exists but has not completed yet.
    InProgress { progress: u8 },
    /// The job terminated without results (failure or cancellation).
    Failed,
    Ready(ResultsReport),
}

/// Summary card: one headline metric, formatted as a percentage where the
/// unit calls for it. Data stays in fractions; this is the formatting seam.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryCard {
    pub label: &'static str,
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChartPoint {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultsReport {
    pub job_id: String,
    pub cards: Vec<SummaryCard>,
    /// Objective value per iteration.
    pub objective_series: Vec<ChartPoint>,
    /// Risk value per iteration.
    pub risk_series: Vec<ChartPoint>,
    pub scenario_table: Vec<ScenarioEvaluation>,
}

pub fn project(state: &AppState, job_id: &str) -> ResultsView {
    let Some(job) = state.optimization.find(job_id) else {
        return ResultsView::NotFound;
    };
    match (&job.status, &job.results) {
        (JobStatus::Completed, Some(results)) => ResultsView::Ready(build_report(results)),
        // Completed without results cannot happen through the reducer, but
        // the projection must not panic on hand-built states either.
        (JobStatus::Completed, None) | (JobStatus::Failed, _) => ResultsView::Failed,
        _ => ResultsView::InProgress {
            progress: job.progress,
        },
    }
}

fn build_report(results: &OptimizationResults) -> ResultsReport {
    ResultsReport {
        job_id: results.job_id.clone(),
        cards: summary_cards(&results.best_metrics),
        objective_series: results
            .convergence
            .iter()
            .map(|p| ChartPoint {
                x: p.iteration as f64,
                y: p.objective,
            })
            .collect(),
        risk_series: results
            .convergence
            .iter()
            .map(|p| ChartPoint {
                x: p.iteration as f64,
                y: p.risk,
            })
            .collect(),
        scenario_table: results.evaluations.clone(),
    }
}

fn summary_cards(m: &PerformanceMetrics) -> Vec<SummaryCard> {
    vec![
        SummaryCard {
            label: "Sharpe Ratio",
            value: format!("{:.2}", m.sharpe_ratio),
        },
        SummaryCard {
            label: "Mean Return",
            value: pct(m.mean_return),
        },
        SummaryCard {
            label: "Volatility",
            value: pct(m.volatility),
        },
        SummaryCard {
            label: "Max Drawdown",
            value: pct(m.max_drawdown),
        },
        SummaryCard {
            label: "VaR 95",
            value: pct(m.var95),
        },
        SummaryCard {
            label: "CVaR 95",
            value: pct(m.cvar95),
        },
        SummaryCard {
            label: "Avg Equity Weight",
            value: pct(m.avg_equity_weight),
        },
    ]
}

fn pct(fraction: f64) -> String {
    format!("{:.2}%", fraction * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{reduce, Event, JobEvent};
    use crate::job::{ConvergencePoint, ResultsSummary};
    use crate::strategy::StrategyConfig;

    fn metrics() -> PerformanceMetrics {
        PerformanceMetrics {
            mean_return: 0.082,
            volatility: 0.101,
            sharpe_ratio: 0.51,
            max_drawdown: -0.14,
            var95: -0.021,
            cvar95: -0.033,
            avg_equity_weight: 0.62,
        }
    }

    fn completed_state(job_id: &str) -> AppState {
        let mut state = AppState::new();
        reduce(
            &mut state,
            Event::Job(JobEvent::Start {
                job_id: job_id.to_string(),
                strategy: StrategyConfig::default(),
                scenarios: vec!["base_case".to_string()],
                iterations: 3,
                ts: 1_000,
            }),
        )
        .unwrap();
        reduce(
            &mut state,
            Event::Job(JobEvent::Complete {
                job_id: job_id.to_string(),
                results: OptimizationResults {
                    job_id: job_id.to_string(),
                    best_config: StrategyConfig::default(),
                    best_metrics: metrics(),
                    convergence: vec![
                        ConvergencePoint { iteration: 0, objective: 0.3, risk: 0.12 },
                        ConvergencePoint { iteration: 1, objective: 0.4, risk: 0.11 },
                        ConvergencePoint { iteration: 2, objective: 0.5, risk: 0.10 },
                    ],
                    evaluations: vec![ScenarioEvaluation {
                        scenario: "base_case".to_string(),
                        metrics: metrics(),
                    }],
                    summary: ResultsSummary {
                        total_strategies_tested: 3,
                        best_sharpe_ratio: 0.51,
                        convergence_iterations: 3,
                        execution_time_seconds: 0.1,
                    },
                },
                ts: 2_000,
            }),
        )
        .unwrap();
        state
    }

    #[test]
    fn unknown_job_is_not_found() {
        let state = AppState::new();
        assert_eq!(project(&state, "opt-404"), ResultsView::NotFound);
    }

    #[test]
    fn running_job_is_in_progress() {
        let mut state = AppState::new();
        reduce(
            &mut state,
            Event::Job(JobEvent::Start {
                job_id: "opt-1".to_string(),
                strategy: StrategyConfig::default(),
                scenarios: vec!["base_case".to_string()],
                iterations: 10,
                ts: 1_000,
            }),
        )
        .unwrap();
        reduce(
            &mut state,
            Event::Job(JobEvent::Progress {
                job_id: "opt-1".to_string(),
                progress: 42,
            }),
        )
        .unwrap();
        assert_eq!(
            project(&state, "opt-1"),
            ResultsView::InProgress { progress: 42 }
        );
    }

    #[test]
    fn completed_job_projects_report() {
        let state = completed_state("opt-1");
        let ResultsView::Ready(report) = project(&state, "opt-1") else {
            panic!("expected ready view");
        };
        assert_eq!(report.job_id, "opt-1");
        assert_eq!(report.cards.len(), 7);
        assert_eq!(report.objective_series.len(), 3);
        assert_eq!(report.risk_series[2].y, 0.10);
        assert_eq!(report.scenario_table[0].scenario, "base_case");
        // Fractions are formatted as percentages only here.
        assert_eq!(report.cards[1].value, "8.20%");
    }

    #[test]
    fn failed_job_projects_failed() {
        let mut state = AppState::new();
        reduce(
            &mut state,
            Event::Job(JobEvent::Start {
                job_id: "opt-1".to_string(),
                strategy: StrategyConfig::default(),
                scenarios: vec!["base_case".to_string()],
                iterations: 10,
                ts: 1_000,
            }),
        )
        .unwrap();
        reduce(
            &mut state,
            Event::Job(JobEvent::Fail {
                job_id: "opt-1".to_string(),
                ts: 2_000,
            }),
        )
        .unwrap();
        assert_eq!(project(&state, "opt-1"), ResultsView::Failed);
    }
}
