//! Pure reducer: (State, Event) -> Result<(State', Vec<Command>), ApiError>.
//!
//! All state transitions happen here. The reducer performs no I/O and reads
//! no clocks; side effects come back as commands for the store to run. A
//! rejected event (`Err`) leaves the state untouched. Expected races from
//! asynchronous progress reporting — stale job ids, duplicate or regressive
//! progress — are benign no-ops that succeed and emit a debug log command.
//!
//! Enforced invariants:
//! - at most one pending/running job at any time
//! - job ids are unique for the process lifetime
//! - progress is clamped to [0, 100] and never regresses
//! - terminal jobs are immutable; history holds only terminal jobs

use super::events::*;
use super::state::AppState;
use crate::error::{ApiError, ApiResult};
use crate::job::{JobStatus, OptimizationJob};
use crate::logging::{Domain, Level};
use crate::strategy::StrategyConfig;

/// Side effect requested by the reducer, executed by the store.
#[derive(Debug, Clone)]
pub enum Command {
    Log {
        level: Level,
        domain: Domain,
        msg: String,
    },
    /// A strategy snapshot was saved; persist it.
    PersistStrategy(StrategyConfig),
    /// A job reached a terminal state; persist the history entry.
    PersistJob(OptimizationJob),
}

#[derive(Debug)]
pub struct ReducerOutput {
    pub commands: Vec<Command>,
    pub state_hash: u64,
}

pub fn reduce(state: &mut AppState, event: Event) -> ApiResult<ReducerOutput> {
    let mut commands = Vec::new();

    match event {
        Event::Strategy(e) => handle_strategy_event(state, e, &mut commands)?,
        Event::Scenario(e) => handle_scenario_event(state, e, &mut commands)?,
        Event::Job(e) => handle_job_event(state, e, &mut commands)?,
    }

    state.seq += 1;
    Ok(ReducerOutput {
        commands,
        state_hash: state.hash(),
    })
}

fn handle_strategy_event(
    state: &mut AppState,
    event: StrategyEvent,
    commands: &mut Vec<Command>,
) -> ApiResult<()> {
    match event {
        StrategyEvent::Patch(patch) => {
            patch.apply(&mut state.strategy.current);
        }

        StrategyEvent::Save { ts } => {
            let mut snapshot = state.strategy.current.clone();
            snapshot.id = Some(format!("strategy_{}_{}", ts, state.seq));
            state.strategy.saved.push(snapshot.clone());
            commands.push(Command::Log {
                level: Level::Info,
                domain: Domain::Strategy,
                msg: format!("saved {}", snapshot.id.as_deref().unwrap_or("?")),
            });
            commands.push(Command::PersistStrategy(snapshot));
        }

        StrategyEvent::Load { id } => {
            // Unknown id is a silent no-op; the working copy stays put.
            if let Some(saved) = state.strategy.find_saved(&id) {
                state.strategy.current = saved.clone();
            } else {
                commands.push(Command::Log {
                    level: Level::Debug,
                    domain: Domain::Strategy,
                    msg: format!("load ignored, unknown id {}", id),
                });
            }
        }

        StrategyEvent::Delete { id } => {
            state.strategy.saved.retain(|s| s.id.as_deref() != Some(&id));
        }

        StrategyEvent::Reset => {
            state.strategy.current = StrategyConfig::default();
        }
    }
    Ok(())
}

fn handle_scenario_event(
    state: &mut AppState,
    event: ScenarioEvent,
    commands: &mut Vec<Command>,
) -> ApiResult<()> {
    match event {
        ScenarioEvent::Toggle { name } => {
            if !state.scenarios.contains(&name) {
                commands.push(Command::Log {
                    level: Level::Debug,
                    domain: Domain::Scenario,
                    msg: format!("toggle ignored, unknown scenario {}", name),
                });
            } else {
                state.scenarios.toggle(&name);
            }
        }

        ScenarioEvent::SelectAll => state.scenarios.select_all(),
        ScenarioEvent::ClearAll => state.scenarios.clear_all(),

        ScenarioEvent::AddCustom(scenario) => {
            if !scenario.is_valid() {
                return Err(ApiError::Validation(format!(
                    "malformed scenario {}",
                    scenario.name
                )));
            }
            if state.scenarios.contains(&scenario.name) {
                return Err(ApiError::Validation(format!(
                    "scenario {} already exists",
                    scenario.name
                )));
            }
            commands.push(Command::Log {
                level: Level::Info,
                domain: Domain::Scenario,
                msg: format!("added custom scenario {}", scenario.name),
            });
            state.scenarios.add_custom(scenario);
        }
    }
    Ok(())
}

fn handle_job_event(
    state: &mut AppState,
    event: JobEvent,
    commands: &mut Vec<Command>,
) -> ApiResult<()> {
    match event {
        JobEvent::Start {
            job_id,
            strategy,
            scenarios,
            iterations,
            ts,
        } => {
            if state.optimization.is_active() {
                return Err(ApiError::Conflict(format!(
                    "job {} is already active",
                    state.optimization.active_id().unwrap_or("?")
                )));
            }
            if job_id.trim().is_empty() {
                return Err(ApiError::Validation("empty job id".to_string()));
            }
            if state.optimization.seen_ids.contains(&job_id) {
                return Err(ApiError::Validation(format!(
                    "job id {} was already used",
                    job_id
                )));
            }
            if scenarios.is_empty() {
                return Err(ApiError::Validation("no scenarios selected".to_string()));
            }
            if iterations == 0 {
                return Err(ApiError::Validation("iteration budget is zero".to_string()));
            }
            if !strategy.is_valid() {
                return Err(ApiError::Validation(format!(
                    "strategy {} is out of domain",
                    strategy.name
                )));
            }

            state.optimization.seen_ids.insert(job_id.clone());
            state.optimization.current = Some(OptimizationJob {
                job_id: job_id.clone(),
                status: JobStatus::Running,
                strategy_config: strategy,
                market_scenarios: scenarios,
                iterations,
                progress: 0,
                start_time: ts,
                end_time: None,
                results: None,
            });
            commands.push(Command::Log {
                level: Level::Info,
                domain: Domain::Job,
                msg: format!("{}: -> running", job_id),
            });
        }

        JobEvent::Progress { job_id, progress } => {
            let Some(job) = state.optimization.current.as_mut() else {
                ignore(commands, format!("progress for {} with no active job", job_id));
                return Ok(());
            };
            if job.job_id != job_id || job.status != JobStatus::Running {
                ignore(commands, format!("stale progress for {}", job_id));
                return Ok(());
            }
            let clamped = progress.min(100) as u8;
            if clamped < job.progress {
                // Out-of-order report; monotonicity is enforced here rather
                // than trusted to the optimizer.
                ignore(
                    commands,
                    format!("regressive progress {} < {} for {}", clamped, job.progress, job_id),
                );
                return Ok(());
            }
            job.progress = clamped;
        }

        JobEvent::Complete { job_id, results, ts } => {
            let Some(job) = state.optimization.current.as_mut() else {
                ignore(commands, format!("complete for {} with no active job", job_id));
                return Ok(());
            };
            if job.job_id != job_id || job.status.is_terminal() {
                ignore(commands, format!("stale complete for {}", job_id));
                return Ok(());
            }
            job.status = JobStatus::Completed;
            job.progress = 100;
            job.results = Some(results);
            job.end_time = Some(ts);
            let archived = job.clone();
            state.optimization.archive_current();
            commands.push(Command::Log {
                level: Level::Info,
                domain: Domain::Job,
                msg: format!("{}: running -> completed", job_id),
            });
            commands.push(Command::PersistJob(archived));
        }

        JobEvent::Fail { job_id, ts } => {
            let Some(job) = state.optimization.current.as_mut() else {
                ignore(commands, format!("fail for {} with no active job", job_id));
                return Ok(());
            };
            if job.job_id != job_id || job.status.is_terminal() {
                ignore(commands, format!("stale fail for {}", job_id));
                return Ok(());
            }
            job.status = JobStatus::Failed;
            job.end_time = Some(ts);
            let archived = job.clone();
            state.optimization.archive_current();
            commands.push(Command::Log {
                level: Level::Warn,
                domain: Domain::Job,
                msg: format!("{}: running -> failed", job_id),
            });
            commands.push(Command::PersistJob(archived));
        }

        JobEvent::Cancel { ts } => {
            // Optimistic local bookkeeping; the external optimizer is
            // signalled separately and may keep running for a while.
            let Some(job) = state.optimization.current.as_mut() else {
                return Ok(());
            };
            if job.status.is_terminal() {
                return Ok(());
            }
            let job_id = job.job_id.clone();
            job.status = JobStatus::Failed;
            job.end_time = Some(ts);
            let archived = job.clone();
            state.optimization.archive_current();
            commands.push(Command::Log {
                level: Level::Info,
                domain: Domain::Job,
                msg: format!("{}: cancelled", job_id),
            });
            commands.push(Command::PersistJob(archived));
        }
    }
    Ok(())
}

fn ignore(commands: &mut Vec<Command>, msg: String) {
    commands.push(Command::Log {
        level: Level::Debug,
        domain: Domain::Job,
        msg: format!("ignored: {}", msg),
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::{
        ConvergencePoint, OptimizationResults, PerformanceMetrics, ResultsSummary,
        ScenarioEvaluation,
    };

    fn start_event(job_id: &str) -> Event {
        Event::Job(JobEvent::Start {
            job_id: job_id.to_string(),
            strategy: StrategyConfig::default(),
            scenarios: vec!["base_case".to_string(), "bear_market".to_string()],
            iterations: 50,
            ts: 1_000,
        })
    }

    fn results_for(job_id: &str) -> OptimizationResults {
        let metrics = PerformanceMetrics {
            mean_return: 0.07,
            volatility: 0.11,
            sharpe_ratio: 0.64,
            max_drawdown: -0.12,
            var95: -0.02,
            cvar95: -0.03,
            avg_equity_weight: 0.55,
        };
        OptimizationResults {
            job_id: job_id.to_string(),
            best_config: StrategyConfig::default(),
            best_metrics: metrics,
            convergence: vec![ConvergencePoint {
                iteration: 0,
                objective: 0.5,
                risk: 0.1,
            }],
            evaluations: vec![ScenarioEvaluation {
                scenario: "base_case".to_string(),
                metrics,
            }],
            summary: ResultsSummary {
                total_strategies_tested: 50,
                best_sharpe_ratio: 0.64,
                convergence_iterations: 50,
                execution_time_seconds: 1.2,
            },
        }
    }

    #[test]
    fn start_creates_running_job() {
        let mut state = AppState::new();
        let out = reduce(&mut state, start_event("opt-1")).unwrap();
        assert!(out.state_hash != 0);

        let job = state.optimization.current.as_ref().unwrap();
        assert_eq!(job.status, JobStatus::Running);
        assert_eq!(job.progress, 0);
        assert!(job.invariants_hold());
    }

    #[test]
    fn second_start_conflicts() {
        let mut state = AppState::new();
        reduce(&mut state, start_event("opt-1")).unwrap();
        let err = reduce(&mut state, start_event("opt-2")).unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));
        // Rejection left the state untouched.
        assert_eq!(state.optimization.active_id(), Some("opt-1"));
    }

    #[test]
    fn reused_job_id_rejected() {
        let mut state = AppState::new();
        reduce(&mut state, start_event("opt-1")).unwrap();
        reduce(&mut state, Event::Job(JobEvent::Cancel { ts: 2_000 })).unwrap();
        let err = reduce(&mut state, start_event("opt-1")).unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[test]
    fn start_requires_scenarios() {
        let mut state = AppState::new();
        let err = reduce(
            &mut state,
            Event::Job(JobEvent::Start {
                job_id: "opt-1".to_string(),
                strategy: StrategyConfig::default(),
                scenarios: vec![],
                iterations: 50,
                ts: 1_000,
            }),
        )
        .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
        assert!(state.optimization.current.is_none());
    }

    #[test]
    fn progress_is_monotonic_and_clamped() {
        let mut state = AppState::new();
        reduce(&mut state, start_event("opt-1")).unwrap();

        let p = |id: &str, pct: u32| {
            Event::Job(JobEvent::Progress {
                job_id: id.to_string(),
                progress: pct,
            })
        };

        reduce(&mut state, p("opt-1", 40)).unwrap();
        assert_eq!(state.optimization.current.as_ref().unwrap().progress, 40);

        // Regression is ignored, not an error.
        reduce(&mut state, p("opt-1", 10)).unwrap();
        assert_eq!(state.optimization.current.as_ref().unwrap().progress, 40);

        // Duplicate report is accepted and idempotent.
        reduce(&mut state, p("opt-1", 40)).unwrap();
        assert_eq!(state.optimization.current.as_ref().unwrap().progress, 40);

        reduce(&mut state, p("opt-1", 250)).unwrap();
        assert_eq!(state.optimization.current.as_ref().unwrap().progress, 100);
    }

    #[test]
    fn stale_job_id_progress_is_noop() {
        let mut state = AppState::new();
        reduce(&mut state, start_event("opt-1")).unwrap();
        reduce(
            &mut state,
            Event::Job(JobEvent::Progress {
                job_id: "opt-9".to_string(),
                progress: 90,
            }),
        )
        .unwrap();
        assert_eq!(state.optimization.current.as_ref().unwrap().progress, 0);
    }

    #[test]
    fn complete_archives_and_clears_current() {
        let mut state = AppState::new();
        reduce(&mut state, start_event("opt-1")).unwrap();
        let results = results_for("opt-1");
        let out = reduce(
            &mut state,
            Event::Job(JobEvent::Complete {
                job_id: "opt-1".to_string(),
                results: results.clone(),
                ts: 5_000,
            }),
        )
        .unwrap();

        assert!(state.optimization.current.is_none());
        let archived = &state.optimization.history[0];
        assert_eq!(archived.job_id, "opt-1");
        assert_eq!(archived.status, JobStatus::Completed);
        assert_eq!(archived.results.as_ref().unwrap(), &results);
        assert!(archived.end_time.is_some());
        assert!(archived.invariants_hold());
        assert!(out
            .commands
            .iter()
            .any(|c| matches!(c, Command::PersistJob(_))));
    }

    #[test]
    fn duplicate_complete_is_noop() {
        let mut state = AppState::new();
        reduce(&mut state, start_event("opt-1")).unwrap();
        let complete = Event::Job(JobEvent::Complete {
            job_id: "opt-1".to_string(),
            results: results_for("opt-1"),
            ts: 5_000,
        });
        reduce(&mut state, complete.clone()).unwrap();
        reduce(&mut state, complete).unwrap();
        assert_eq!(state.optimization.history.len(), 1);
    }

    #[test]
    fn cancel_moves_job_to_history_as_failed() {
        let mut state = AppState::new();
        reduce(&mut state, start_event("opt-1")).unwrap();
        reduce(&mut state, Event::Job(JobEvent::Cancel { ts: 3_000 })).unwrap();

        assert!(state.optimization.current.is_none());
        let archived = &state.optimization.history[0];
        assert_eq!(archived.status, JobStatus::Failed);
        assert_eq!(archived.end_time, Some(3_000));
    }

    #[test]
    fn cancel_without_active_job_is_noop() {
        let mut state = AppState::new();
        let out = reduce(&mut state, Event::Job(JobEvent::Cancel { ts: 3_000 })).unwrap();
        assert!(out.commands.is_empty());
        assert!(state.optimization.history.is_empty());
    }

    #[test]
    fn fail_attaches_no_results() {
        let mut state = AppState::new();
        reduce(&mut state, start_event("opt-1")).unwrap();
        reduce(
            &mut state,
            Event::Job(JobEvent::Fail {
                job_id: "opt-1".to_string(),
                ts: 4_000,
            }),
        )
        .unwrap();
        let archived = &state.optimization.history[0];
        assert_eq!(archived.status, JobStatus::Failed);
        assert!(archived.results.is_none());
        assert!(archived.invariants_hold());
    }

    #[test]
    fn launched_job_snapshot_is_isolated_from_edits() {
        let mut state = AppState::new();
        reduce(&mut state, start_event("opt-1")).unwrap();
        reduce(
            &mut state,
            Event::Strategy(StrategyEvent::Patch(crate::strategy::StrategyPatch {
                risk_aversion: Some(4.5),
                ..Default::default()
            })),
        )
        .unwrap();
        let job = state.optimization.current.as_ref().unwrap();
        assert_eq!(job.strategy_config.risk_aversion, 2.0);
        assert_eq!(state.strategy.current.risk_aversion, 4.5);
    }

    #[test]
    fn save_load_reset_round_trip() {
        let mut state = AppState::new();
        reduce(
            &mut state,
            Event::Strategy(StrategyEvent::Patch(crate::strategy::StrategyPatch {
                name: Some("LowVol".to_string()),
                target_volatility: Some(0.07),
                ..Default::default()
            })),
        )
        .unwrap();
        reduce(&mut state, Event::Strategy(StrategyEvent::Save { ts: 42 })).unwrap();
        let id = state.strategy.saved[0].id.clone().unwrap();

        reduce(&mut state, Event::Strategy(StrategyEvent::Reset)).unwrap();
        assert_eq!(state.strategy.current.name, "New Strategy");

        reduce(&mut state, Event::Strategy(StrategyEvent::Load { id })).unwrap();
        assert_eq!(state.strategy.current.name, "LowVol");
        assert_eq!(state.strategy.current.target_volatility, 0.07);
    }

    #[test]
    fn load_unknown_id_is_silent_noop() {
        let mut state = AppState::new();
        let before = state.strategy.current.clone();
        reduce(
            &mut state,
            Event::Strategy(StrategyEvent::Load {
                id: "strategy_missing".to_string(),
            }),
        )
        .unwrap();
        assert_eq!(state.strategy.current, before);
    }

    #[test]
    fn add_duplicate_scenario_rejected() {
        let mut state = AppState::new();
        let err = reduce(
            &mut state,
            Event::Scenario(ScenarioEvent::AddCustom(crate::scenario::MarketScenario {
                name: "base_case".to_string(),
                equity_drift: 0.0,
                equity_vol: 0.1,
                risk_free_rate: 0.0,
                correlation_equity_rates: 0.0,
            })),
        )
        .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
        assert_eq!(state.scenarios.list().len(), 5);
    }
}
