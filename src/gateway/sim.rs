//! In-process simulated optimizer.
//!
//! Every number here is fabricated with `rand`; the point is to stand behind
//! the same `OptimizerGateway` trait a real backend would, so the lifecycle
//! store and the UI flow never know the difference. Each status poll advances
//! the job by a random slice of progress; completion fabricates a convergence
//! curve and per-scenario metrics loosely shaped by the scenario constants.

use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::anyhow;
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::OptimizerGateway;
use crate::error::{ApiError, ApiResult};
use crate::export::{render_csv, ExportFormat};
use crate::job::{
    ConvergencePoint, JobStatus, OptimizationJob, OptimizationResults, PerformanceMetrics,
    ResultsSummary, ScenarioEvaluation,
};
use crate::logging::ts_epoch_ms;
use crate::scenario::{builtin_scenarios, MarketScenario};
use crate::strategy::{StrategyConfig, StrategyPatch};

struct SimState {
    rng: StdRng,
    jobs: HashMap<String, OptimizationJob>,
    strategies: HashMap<String, StrategyConfig>,
    job_seq: u64,
    strategy_seq: u64,
}

pub struct SimulatedOptimizer {
    inner: Mutex<SimState>,
}

impl SimulatedOptimizer {
    pub fn new() -> Self {
        Self::seeded(rand::thread_rng().gen())
    }

    /// Deterministic simulator for tests.
    pub fn seeded(seed: u64) -> Self {
        Self {
            inner: Mutex::new(SimState {
                rng: StdRng::seed_from_u64(seed),
                jobs: HashMap::new(),
                strategies: HashMap::new(),
                job_seq: 0,
                strategy_seq: 0,
            }),
        }
    }

    fn lock(&self) -> ApiResult<std::sync::MutexGuard<'_, SimState>> {
        self.inner
            .lock()
            .map_err(|_| ApiError::Gateway(anyhow!("simulator state poisoned")))
    }
}

impl Default for SimulatedOptimizer {
    fn default() -> Self {
        Self::new()
    }
}

fn scenario_params(name: &str) -> MarketScenario {
    builtin_scenarios()
        .into_iter()
        .find(|s| s.name == name)
        .unwrap_or(MarketScenario {
            name: name.to_string(),
            equity_drift: 0.06,
            equity_vol: 0.18,
            risk_free_rate: 0.03,
            correlation_equity_rates: -0.2,
        })
}

fn fabricate_metrics(rng: &mut StdRng, cfg: &StrategyConfig, scenario: &MarketScenario) -> PerformanceMetrics {
    let bounds = cfg.equity_weight_bounds;
    let avg_weight = rng.gen_range(bounds.min..=bounds.max.max(bounds.min + 1e-9));
    let vol = (cfg.target_volatility + scenario.equity_vol * 0.3) * rng.gen_range(0.85..1.15);
    let mean = scenario.equity_drift * avg_weight
        + scenario.risk_free_rate * (1.0 - avg_weight)
        + rng.gen_range(-0.01..0.01);
    let sharpe = if vol > 0.0 {
        (mean - scenario.risk_free_rate) / vol
    } else {
        0.0
    };
    PerformanceMetrics {
        mean_return: mean,
        volatility: vol,
        sharpe_ratio: sharpe,
        max_drawdown: -(vol * rng.gen_range(1.2..2.2)),
        var95: -(1.65 * vol * 0.3),
        cvar95: -(1.65 * vol * 0.3) * 1.3,
        avg_equity_weight: avg_weight,
    }
}

fn fabricate_results(rng: &mut StdRng, job: &OptimizationJob) -> OptimizationResults {
    let evaluations: Vec<ScenarioEvaluation> = job
        .market_scenarios
        .iter()
        .map(|name| ScenarioEvaluation {
            scenario: name.clone(),
            metrics: fabricate_metrics(rng, &job.strategy_config, &scenario_params(name)),
        })
        .collect();

    let best_metrics = evaluations
        .iter()
        .map(|e| e.metrics)
        .max_by(|a, b| a.sharpe_ratio.total_cmp(&b.sharpe_ratio))
        .unwrap_or(PerformanceMetrics {
            mean_return: 0.0,
            volatility: cfg_vol(job),
            sharpe_ratio: 0.0,
            max_drawdown: 0.0,
            var95: 0.0,
            cvar95: 0.0,
            avg_equity_weight: 0.5,
        });

    // Objective ramps toward the best Sharpe; risk decays toward target vol.
    let n = job.iterations.max(1);
    let convergence = (0..n)
        .map(|i| {
            let t = i as f64 / n as f64;
            let ramp = 1.0 - (-4.0 * t).exp();
            ConvergencePoint {
                iteration: i,
                objective: best_metrics.sharpe_ratio * ramp + rng.gen_range(-0.02..0.02),
                risk: cfg_vol(job) * (1.5 - 0.5 * ramp) + rng.gen_range(-0.005..0.005),
            }
        })
        .collect();

    OptimizationResults {
        job_id: job.job_id.clone(),
        best_config: job.strategy_config.clone(),
        best_metrics,
        convergence,
        evaluations,
        summary: ResultsSummary {
            total_strategies_tested: n,
            best_sharpe_ratio: best_metrics.sharpe_ratio,
            convergence_iterations: n,
            execution_time_seconds: n as f64 * 0.02,
        },
    }
}

fn cfg_vol(job: &OptimizationJob) -> f64 {
    job.strategy_config.target_volatility
}

#[async_trait]
impl OptimizerGateway for SimulatedOptimizer {
    async fn submit_optimization(
        &self,
        strategy: &StrategyConfig,
        scenarios: &[String],
        iterations: u32,
    ) -> ApiResult<OptimizationJob> {
        if scenarios.is_empty() {
            return Err(ApiError::Validation("no scenarios selected".to_string()));
        }
        if !strategy.is_valid() {
            return Err(ApiError::Validation(format!(
                "strategy {} is out of domain",
                strategy.name
            )));
        }
        let mut state = self.lock()?;
        state.job_seq += 1;
        let job = OptimizationJob {
            job_id: format!("opt-{}", state.job_seq),
            status: JobStatus::Pending,
            strategy_config: strategy.clone(),
            market_scenarios: scenarios.to_vec(),
            iterations,
            progress: 0,
            start_time: ts_epoch_ms(),
            end_time: None,
            results: None,
        };
        state.jobs.insert(job.job_id.clone(), job.clone());
        Ok(job)
    }

    async fn get_optimization_status(&self, job_id: &str) -> ApiResult<OptimizationJob> {
        let mut state = self.lock()?;
        let step = state.rng.gen_range(12..=25u32);
        let job = state
            .jobs
            .get_mut(job_id)
            .ok_or_else(|| ApiError::NotFound(job_id.to_string()))?;

        match job.status {
            JobStatus::Pending => job.status = JobStatus::Running,
            JobStatus::Running => {
                job.progress = (job.progress as u32 + step).min(100) as u8;
                if job.progress >= 100 {
                    job.status = JobStatus::Completed;
                    job.end_time = Some(ts_epoch_ms());
                }
            }
            _ => {}
        }

        let snapshot = job.clone();
        if snapshot.status == JobStatus::Completed && snapshot.results.is_none() {
            let results = fabricate_results(&mut state.rng, &snapshot);
            let job = state
                .jobs
                .get_mut(job_id)
                .ok_or_else(|| ApiError::NotFound(job_id.to_string()))?;
            job.results = Some(results);
            return Ok(job.clone());
        }
        Ok(snapshot)
    }

    async fn get_optimization_results(&self, job_id: &str) -> ApiResult<OptimizationResults> {
        let state = self.lock()?;
        let job = state
            .jobs
            .get(job_id)
            .ok_or_else(|| ApiError::NotFound(job_id.to_string()))?;
        match (&job.status, &job.results) {
            (JobStatus::Completed, Some(results)) => Ok(results.clone()),
            _ => Err(ApiError::NotReady(job_id.to_string())),
        }
    }

    async fn cancel_optimization(&self, job_id: &str) -> ApiResult<()> {
        let mut state = self.lock()?;
        let job = state
            .jobs
            .get_mut(job_id)
            .ok_or_else(|| ApiError::NotFound(job_id.to_string()))?;
        if job.status.is_terminal() {
            return Err(ApiError::Conflict(format!(
                "job {} is already {}",
                job_id,
                job.status.as_str()
            )));
        }
        job.status = JobStatus::Failed;
        job.end_time = Some(ts_epoch_ms());
        Ok(())
    }

    async fn list_strategies(&self) -> ApiResult<Vec<StrategyConfig>> {
        let state = self.lock()?;
        let mut out: Vec<StrategyConfig> = state.strategies.values().cloned().collect();
        out.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(out)
    }

    async fn save_strategy(&self, strategy: &StrategyConfig) -> ApiResult<StrategyConfig> {
        if !strategy.is_valid() {
            return Err(ApiError::Validation(format!(
                "strategy {} is out of domain",
                strategy.name
            )));
        }
        let mut state = self.lock()?;
        state.strategy_seq += 1;
        let mut saved = strategy.clone();
        saved.id = Some(format!("strategy_sim_{}", state.strategy_seq));
        state
            .strategies
            .insert(saved.id.clone().unwrap_or_default(), saved.clone());
        Ok(saved)
    }

    async fn get_strategy(&self, id: &str) -> ApiResult<StrategyConfig> {
        let state = self.lock()?;
        state
            .strategies
            .get(id)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(id.to_string()))
    }

    async fn update_strategy(&self, id: &str, patch: &StrategyPatch) -> ApiResult<StrategyConfig> {
        let mut state = self.lock()?;
        let strategy = state
            .strategies
            .get_mut(id)
            .ok_or_else(|| ApiError::NotFound(id.to_string()))?;
        patch.apply(strategy);
        Ok(strategy.clone())
    }

    async fn delete_strategy(&self, id: &str) -> ApiResult<()> {
        let mut state = self.lock()?;
        state
            .strategies
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| ApiError::NotFound(id.to_string()))
    }

    async fn export_results(&self, job_id: &str, format: ExportFormat) -> ApiResult<Vec<u8>> {
        let results = self.get_optimization_results(job_id).await?;
        // The rendering is as fabricated as the numbers: pdf/excel get the
        // CSV body behind a format banner.
        let csv = render_csv(&results);
        match format {
            ExportFormat::Csv => Ok(csv.into_bytes()),
            ExportFormat::Pdf | ExportFormat::Excel => {
                Ok(format!("[simulated {} export]\n{}", format, csv).into_bytes())
            }
        }
    }
}
