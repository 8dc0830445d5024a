//! Aggregate application state, one sub-state per component.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use crate::job::OptimizationState;
use crate::scenario::ScenarioState;
use crate::strategy::StrategyState;

#[derive(Debug, Clone)]
pub struct AppState {
    pub strategy: StrategyState,
    pub scenarios: ScenarioState,
    pub optimization: OptimizationState,
    /// Events applied so far; also salts generated strategy ids.
    pub seq: u64,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            strategy: StrategyState::new(),
            scenarios: ScenarioState::new(),
            optimization: OptimizationState::new(),
            seq: 0,
        }
    }

    /// Cheap fingerprint of the observable state, logged after each event so
    /// two runs over the same event sequence can be compared.
    pub fn hash(&self) -> u64 {
        let mut h = DefaultHasher::new();
        self.seq.hash(&mut h);
        self.strategy.current.name.hash(&mut h);
        self.strategy.saved.len().hash(&mut h);
        for name in &self.scenarios.selected {
            name.hash(&mut h);
        }
        self.scenarios.catalog.len().hash(&mut h);
        if let Some(job) = &self.optimization.current {
            job.job_id.hash(&mut h);
            job.status.as_str().hash(&mut h);
            job.progress.hash(&mut h);
        }
        self.optimization.history.len().hash(&mut h);
        h.finish()
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
