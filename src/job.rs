//! Optimization job entity and results payload.
//!
//! A job snapshots the strategy and scenario selection at launch; later edits
//! to the working strategy never alter a launched job. All metric fields are
//! fractions at the data layer; percentage formatting belongs to presentation.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::strategy::StrategyConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub mean_return: f64,
    pub volatility: f64,
    pub sharpe_ratio: f64,
    /// Peak-to-trough, negative fraction.
    pub max_drawdown: f64,
    pub var95: f64,
    pub cvar95: f64,
    pub avg_equity_weight: f64,
}

/// One record per optimizer iteration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConvergencePoint {
    pub iteration: u32,
    pub objective: f64,
    pub risk: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioEvaluation {
    pub scenario: String,
    pub metrics: PerformanceMetrics,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultsSummary {
    pub total_strategies_tested: u32,
    pub best_sharpe_ratio: f64,
    pub convergence_iterations: u32,
    pub execution_time_seconds: f64,
}

/// Immutable once attached to a completed job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationResults {
    pub job_id: String,
    pub best_config: StrategyConfig,
    pub best_metrics: PerformanceMetrics,
    pub convergence: Vec<ConvergencePoint>,
    pub evaluations: Vec<ScenarioEvaluation>,
    pub summary: ResultsSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationJob {
    pub job_id: String,
    pub status: JobStatus,
    pub strategy_config: StrategyConfig,
    pub market_scenarios: Vec<String>,
    pub iterations: u32,
    /// Percentage [0, 100], monotonically non-decreasing while running.
    pub progress: u8,
    /// Epoch milliseconds.
    pub start_time: u64,
    pub end_time: Option<u64>,
    pub results: Option<OptimizationResults>,
}

impl OptimizationJob {
    pub fn invariants_hold(&self) -> bool {
        let results_ok = match self.status {
            JobStatus::Completed => self.results.is_some(),
            _ => self.results.is_none(),
        };
        let end_ok = if self.status.is_terminal() {
            self.end_time.is_some()
        } else {
            self.end_time.is_none()
        };
        results_ok && end_ok && self.progress <= 100
    }
}

/// Current job slot plus terminal history, most-recent-first. Job ids must be
/// unique for the process lifetime; `seen_ids` holds every id ever started.
#[derive(Debug, Clone, Default)]
pub struct OptimizationState {
    pub current: Option<OptimizationJob>,
    pub history: Vec<OptimizationJob>,
    pub seen_ids: BTreeSet<String>,
}

impl OptimizationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// A job occupies the slot and is not yet terminal.
    pub fn is_active(&self) -> bool {
        self.current
            .as_ref()
            .map(|j| !j.status.is_terminal())
            .unwrap_or(false)
    }

    pub fn active_id(&self) -> Option<&str> {
        match &self.current {
            Some(j) if !j.status.is_terminal() => Some(j.job_id.as_str()),
            _ => None,
        }
    }

    /// Job lookup across the current slot and history.
    pub fn find(&self, job_id: &str) -> Option<&OptimizationJob> {
        self.current
            .iter()
            .chain(self.history.iter())
            .find(|j| j.job_id == job_id)
    }

    /// Move the current job to the front of history and free the slot. The
    /// caller has already made the job terminal.
    pub fn archive_current(&mut self) {
        if let Some(job) = self.current.take() {
            debug_assert!(job.status.is_terminal());
            self.history.insert(0, job);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::StrategyConfig;

    fn running_job(id: &str) -> OptimizationJob {
        OptimizationJob {
            job_id: id.to_string(),
            status: JobStatus::Running,
            strategy_config: StrategyConfig::default(),
            market_scenarios: vec!["base_case".to_string()],
            iterations: 50,
            progress: 0,
            start_time: 1_000,
            end_time: None,
            results: None,
        }
    }

    #[test]
    fn running_job_invariants() {
        assert!(running_job("opt-1").invariants_hold());
    }

    #[test]
    fn completed_without_results_violates() {
        let mut job = running_job("opt-1");
        job.status = JobStatus::Completed;
        job.end_time = Some(2_000);
        assert!(!job.invariants_hold());
    }

    #[test]
    fn archive_moves_terminal_job_to_front() {
        let mut state = OptimizationState::new();
        let mut old = running_job("opt-0");
        old.status = JobStatus::Failed;
        old.end_time = Some(1_500);
        state.history.push(old);

        let mut job = running_job("opt-1");
        job.status = JobStatus::Failed;
        job.end_time = Some(2_000);
        state.current = Some(job);
        state.archive_current();

        assert!(state.current.is_none());
        assert_eq!(state.history[0].job_id, "opt-1");
        assert_eq!(state.history[1].job_id, "opt-0");
        assert!(state.history.iter().all(|j| j.status.is_terminal()));
    }

    #[test]
    fn active_id_ignores_terminal_slot() {
        let mut state = OptimizationState::new();
        state.current = Some(running_job("opt-1"));
        assert_eq!(state.active_id(), Some("opt-1"));
        state.current.as_mut().unwrap().status = JobStatus::Failed;
        assert_eq!(state.active_id(), None);
    }
}
