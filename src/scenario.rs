//! Market scenario catalog and selection set.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// A named stochastic regime the optimizer evaluates strategies against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketScenario {
    pub name: String,
    /// Annualized drift, fraction.
    pub equity_drift: f64,
    /// Annualized volatility, fraction.
    pub equity_vol: f64,
    pub risk_free_rate: f64,
    /// Equity/rates correlation in [-1, 1].
    pub correlation_equity_rates: f64,
}

impl MarketScenario {
    pub fn is_valid(&self) -> bool {
        !self.name.trim().is_empty()
            && self.equity_vol >= 0.0
            && (-1.0..=1.0).contains(&self.correlation_equity_rates)
    }
}

/// The five built-in regimes, in catalog order.
pub fn builtin_scenarios() -> Vec<MarketScenario> {
    vec![
        MarketScenario {
            name: "base_case".to_string(),
            equity_drift: 0.08,
            equity_vol: 0.18,
            risk_free_rate: 0.03,
            correlation_equity_rates: -0.3,
        },
        MarketScenario {
            name: "bull_market".to_string(),
            equity_drift: 0.15,
            equity_vol: 0.12,
            risk_free_rate: 0.02,
            correlation_equity_rates: 0.0,
        },
        MarketScenario {
            name: "bear_market".to_string(),
            equity_drift: -0.05,
            equity_vol: 0.35,
            risk_free_rate: 0.01,
            correlation_equity_rates: -0.6,
        },
        MarketScenario {
            name: "high_volatility".to_string(),
            equity_drift: 0.05,
            equity_vol: 0.40,
            risk_free_rate: 0.04,
            correlation_equity_rates: -0.5,
        },
        MarketScenario {
            name: "low_volatility".to_string(),
            equity_drift: 0.07,
            equity_vol: 0.08,
            risk_free_rate: 0.03,
            correlation_equity_rates: 0.1,
        },
    ]
}

/// Catalog (stable order) plus the selection set. Selection is a set by
/// construction: order-insensitive, duplicates impossible. Toggling a name
/// that is not in the catalog is a benign no-op.
#[derive(Debug, Clone)]
pub struct ScenarioState {
    pub catalog: Vec<MarketScenario>,
    pub selected: BTreeSet<String>,
}

impl ScenarioState {
    pub fn new() -> Self {
        let catalog = builtin_scenarios();
        let selected = catalog.iter().map(|s| s.name.clone()).collect();
        Self { catalog, selected }
    }

    /// Catalog in stable order.
    pub fn list(&self) -> &[MarketScenario] {
        &self.catalog
    }

    pub fn contains(&self, name: &str) -> bool {
        self.catalog.iter().any(|s| s.name == name)
    }

    pub fn is_selected(&self, name: &str) -> bool {
        self.selected.contains(name)
    }

    /// Flips membership; unknown names are ignored.
    pub fn toggle(&mut self, name: &str) {
        if !self.contains(name) {
            return;
        }
        if !self.selected.remove(name) {
            self.selected.insert(name.to_string());
        }
    }

    pub fn select_all(&mut self) {
        self.selected = self.catalog.iter().map(|s| s.name.clone()).collect();
    }

    pub fn clear_all(&mut self) {
        self.selected.clear();
    }

    /// Appends to the catalog and auto-selects. Duplicate names and malformed
    /// scenarios are the caller's error, checked by the reducer.
    pub fn add_custom(&mut self, scenario: MarketScenario) {
        self.selected.insert(scenario.name.clone());
        self.catalog.push(scenario);
    }

    /// Selected names in a deterministic order for snapshotting into jobs.
    pub fn selection(&self) -> Vec<String> {
        self.selected.iter().cloned().collect()
    }
}

impl Default for ScenarioState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_catalog_has_five_all_selected() {
        let state = ScenarioState::new();
        assert_eq!(state.list().len(), 5);
        assert_eq!(state.selection().len(), 5);
        assert_eq!(state.list()[0].name, "base_case");
    }

    #[test]
    fn toggle_twice_restores_membership() {
        let mut state = ScenarioState::new();
        assert!(state.is_selected("bull_market"));
        state.toggle("bull_market");
        assert!(!state.is_selected("bull_market"));
        state.toggle("bull_market");
        assert!(state.is_selected("bull_market"));
    }

    #[test]
    fn toggle_unknown_is_noop() {
        let mut state = ScenarioState::new();
        let before = state.selection();
        state.toggle("sideways_crab");
        assert_eq!(state.selection(), before);
    }

    #[test]
    fn clear_then_select_all() {
        let mut state = ScenarioState::new();
        state.clear_all();
        assert!(state.selection().is_empty());
        state.select_all();
        assert_eq!(state.selection().len(), 5);
    }

    #[test]
    fn add_custom_auto_selects() {
        let mut state = ScenarioState::new();
        state.add_custom(MarketScenario {
            name: "stagflation".to_string(),
            equity_drift: 0.01,
            equity_vol: 0.25,
            risk_free_rate: 0.06,
            correlation_equity_rates: 0.4,
        });
        assert_eq!(state.list().len(), 6);
        assert!(state.is_selected("stagflation"));
    }
}
