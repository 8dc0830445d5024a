//! Store events: every mutation of application state is one of these.
//!
//! Events carry their own timestamps so the reducer stays free of clocks and
//! replays deterministically.

use crate::job::OptimizationResults;
use crate::scenario::MarketScenario;
use crate::strategy::{StrategyConfig, StrategyPatch};

#[derive(Debug, Clone)]
pub enum Event {
    Strategy(StrategyEvent),
    Scenario(ScenarioEvent),
    Job(JobEvent),
}

#[derive(Debug, Clone)]
pub enum StrategyEvent {
    /// Merge partial fields into the working config, clamping to domains.
    Patch(StrategyPatch),
    /// Snapshot the working config into the saved set under a fresh id.
    Save { ts: u64 },
    /// Replace the working config with a saved snapshot; unknown id is a
    /// silent no-op.
    Load { id: String },
    /// Remove a saved snapshot; unknown id is a silent no-op.
    Delete { id: String },
    /// Restore the built-in default config.
    Reset,
}

#[derive(Debug, Clone)]
pub enum ScenarioEvent {
    Toggle { name: String },
    SelectAll,
    ClearAll,
    AddCustom(MarketScenario),
}

#[derive(Debug, Clone)]
pub enum JobEvent {
    /// Launch a job from explicit snapshots. The strategy and scenario list
    /// are copied into the job; later edits to the working state never reach
    /// a launched job.
    Start {
        job_id: String,
        strategy: StrategyConfig,
        scenarios: Vec<String>,
        iterations: u32,
        ts: u64,
    },
    /// Progress report from the optimizer. Stale ids and regressive values
    /// are benign no-ops.
    Progress { job_id: String, progress: u32 },
    Complete {
        job_id: String,
        results: OptimizationResults,
        ts: u64,
    },
    Fail { job_id: String, ts: u64 },
    /// Cooperative cancellation of whatever is running; no-op when idle.
    Cancel { ts: u64 },
}
