//! The injectable state container.
//!
//! Owns the `AppState`, applies events through the pure reducer one at a
//! time (`&mut self` is the single-writer channel), and executes the commands
//! the reducer hands back: structured logs and sqlite persistence. There is
//! no ambient singleton; the application root constructs one and passes it
//! down.

use crate::engine::{reduce, AppState, Command, Event, JobEvent, ScenarioEvent, StrategyEvent};
use crate::error::ApiResult;
use crate::job::{OptimizationJob, OptimizationResults};
use crate::logging::{self, Domain, Level};
use crate::results::{project, ResultsView};
use crate::scenario::MarketScenario;
use crate::storage::StateStore;
use crate::strategy::{StrategyConfig, StrategyPatch};

pub struct Store {
    state: AppState,
    persistence: Option<StateStore>,
}

impl Store {
    pub fn new() -> Self {
        Self {
            state: AppState::new(),
            persistence: None,
        }
    }

    /// Attach sqlite persistence and re-hydrate saved strategies and job
    /// history from it.
    pub fn with_persistence(store: StateStore) -> anyhow::Result<Self> {
        let mut state = AppState::new();
        state.strategy.saved = store.load_strategies()?;
        state.optimization.history = store.load_history()?;
        for job in &state.optimization.history {
            state.optimization.seen_ids.insert(job.job_id.clone());
        }
        Ok(Self {
            state,
            persistence: Some(store),
        })
    }

    /// Apply one event. Mutations never interleave: each dispatch runs the
    /// reducer to completion and executes its commands before returning.
    pub fn dispatch(&mut self, event: Event) -> ApiResult<u64> {
        let output = reduce(&mut self.state, event)?;
        for command in output.commands {
            self.run(command);
        }
        Ok(output.state_hash)
    }

    fn run(&mut self, command: Command) {
        match command {
            Command::Log { level, domain, msg } => {
                logging::log(level, domain, "store", logging::obj(&[("msg", logging::v_str(&msg))]));
            }
            Command::PersistStrategy(cfg) => {
                if let Some(store) = self.persistence.as_mut() {
                    if let Err(err) = store.persist_strategy(&cfg) {
                        logging::log(
                            Level::Error,
                            Domain::Store,
                            "persist_strategy_failed",
                            logging::obj(&[("err", logging::v_str(&err.to_string()))]),
                        );
                    }
                }
            }
            Command::PersistJob(job) => {
                if let Some(store) = self.persistence.as_mut() {
                    if let Err(err) = store.persist_job(&job) {
                        logging::log(
                            Level::Error,
                            Domain::Store,
                            "persist_job_failed",
                            logging::obj(&[("err", logging::v_str(&err.to_string()))]),
                        );
                    }
                }
            }
        }
    }

    // Strategy model -------------------------------------------------------

    pub fn patch_strategy(&mut self, patch: StrategyPatch) -> ApiResult<()> {
        self.dispatch(Event::Strategy(StrategyEvent::Patch(patch)))?;
        Ok(())
    }

    /// Snapshot the working config under a fresh id; returns the id.
    pub fn save_strategy(&mut self) -> ApiResult<String> {
        self.dispatch(Event::Strategy(StrategyEvent::Save {
            ts: logging::ts_epoch_ms(),
        }))?;
        Ok(self
            .state
            .strategy
            .saved
            .last()
            .and_then(|s| s.id.clone())
            .unwrap_or_default())
    }

    pub fn load_strategy(&mut self, id: &str) -> ApiResult<()> {
        self.dispatch(Event::Strategy(StrategyEvent::Load { id: id.to_string() }))?;
        Ok(())
    }

    pub fn delete_strategy(&mut self, id: &str) -> ApiResult<()> {
        self.dispatch(Event::Strategy(StrategyEvent::Delete { id: id.to_string() }))?;
        if let Some(store) = self.persistence.as_mut() {
            if let Err(err) = store.delete_strategy(id) {
                logging::log(
                    Level::Error,
                    Domain::Store,
                    "delete_strategy_failed",
                    logging::obj(&[("err", logging::v_str(&err.to_string()))]),
                );
            }
        }
        Ok(())
    }

    pub fn reset_strategy(&mut self) -> ApiResult<()> {
        self.dispatch(Event::Strategy(StrategyEvent::Reset))?;
        Ok(())
    }

    // Scenario registry ----------------------------------------------------

    pub fn toggle_scenario(&mut self, name: &str) -> ApiResult<()> {
        self.dispatch(Event::Scenario(ScenarioEvent::Toggle {
            name: name.to_string(),
        }))?;
        Ok(())
    }

    pub fn select_all_scenarios(&mut self) -> ApiResult<()> {
        self.dispatch(Event::Scenario(ScenarioEvent::SelectAll))?;
        Ok(())
    }

    pub fn clear_all_scenarios(&mut self) -> ApiResult<()> {
        self.dispatch(Event::Scenario(ScenarioEvent::ClearAll))?;
        Ok(())
    }

    pub fn add_custom_scenario(&mut self, scenario: MarketScenario) -> ApiResult<()> {
        self.dispatch(Event::Scenario(ScenarioEvent::AddCustom(scenario)))?;
        Ok(())
    }

    // Job lifecycle --------------------------------------------------------

    /// Launch from explicit strategy and scenario snapshots.
    pub fn start_job(
        &mut self,
        job_id: &str,
        strategy: StrategyConfig,
        scenarios: Vec<String>,
        iterations: u32,
    ) -> ApiResult<()> {
        self.dispatch(Event::Job(JobEvent::Start {
            job_id: job_id.to_string(),
            strategy,
            scenarios,
            iterations,
            ts: logging::ts_epoch_ms(),
        }))?;
        Ok(())
    }

    /// Launch from the working strategy and current selection.
    pub fn start_job_from_current(&mut self, job_id: &str, iterations: u32) -> ApiResult<()> {
        let strategy = self.state.strategy.current.clone();
        let scenarios = self.state.scenarios.selection();
        self.start_job(job_id, strategy, scenarios, iterations)
    }

    pub fn update_progress(&mut self, job_id: &str, progress: u32) -> ApiResult<()> {
        self.dispatch(Event::Job(JobEvent::Progress {
            job_id: job_id.to_string(),
            progress,
        }))?;
        if let Some(job) = self.state.optimization.current.as_ref() {
            if job.job_id == job_id {
                logging::log_progress(job_id, job.progress);
            }
        }
        Ok(())
    }

    pub fn complete_job(&mut self, job_id: &str, results: OptimizationResults) -> ApiResult<()> {
        self.dispatch(Event::Job(JobEvent::Complete {
            job_id: job_id.to_string(),
            results,
            ts: logging::ts_epoch_ms(),
        }))?;
        Ok(())
    }

    pub fn fail_job(&mut self, job_id: &str) -> ApiResult<()> {
        self.dispatch(Event::Job(JobEvent::Fail {
            job_id: job_id.to_string(),
            ts: logging::ts_epoch_ms(),
        }))?;
        Ok(())
    }

    /// Optimistic local cancellation; the caller signals the external
    /// optimizer separately.
    pub fn cancel(&mut self) -> ApiResult<()> {
        self.dispatch(Event::Job(JobEvent::Cancel {
            ts: logging::ts_epoch_ms(),
        }))?;
        Ok(())
    }

    // Reads ----------------------------------------------------------------

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn current_strategy(&self) -> &StrategyConfig {
        &self.state.strategy.current
    }

    pub fn saved_strategies(&self) -> &[StrategyConfig] {
        &self.state.strategy.saved
    }

    pub fn scenarios(&self) -> &[MarketScenario] {
        self.state.scenarios.list()
    }

    pub fn selection(&self) -> Vec<String> {
        self.state.scenarios.selection()
    }

    pub fn current_job(&self) -> Option<&OptimizationJob> {
        self.state.optimization.current.as_ref()
    }

    pub fn history(&self) -> &[OptimizationJob] {
        &self.state.optimization.history
    }

    pub fn results_view(&self, job_id: &str) -> ResultsView {
        project(&self.state, job_id)
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}
