//! Strategy configuration: the allocation policy record edited by the user
//! and snapshotted into every optimization job.

use serde::{Deserialize, Serialize};

/// Equity weight policy selector. Enumerated, not executable: the optimizer
/// service interprets it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightFunction {
    InverseVol,
    InverseVolSquared,
    LinearDecay,
    Sigmoid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RebalanceFrequency {
    Daily,
    Weekly,
    Monthly,
    Quarterly,
}

/// Allowed equity weight range, min <= max, both in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightBounds {
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyConfig {
    /// Assigned on save; None while the config is only the working copy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    /// Fraction in [0.05, 0.20].
    pub target_volatility: f64,
    pub equity_weight_function: WeightFunction,
    /// Months in [6, 24].
    pub vol_lookback_months: u32,
    pub rebalancing_frequency: RebalanceFrequency,
    /// [0.5, 5.0].
    pub risk_aversion: f64,
    /// Basis points in [0, 20].
    pub transaction_cost_bps: u32,
    pub equity_weight_bounds: WeightBounds,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            id: None,
            name: "New Strategy".to_string(),
            target_volatility: 0.10,
            equity_weight_function: WeightFunction::InverseVol,
            vol_lookback_months: 12,
            rebalancing_frequency: RebalanceFrequency::Monthly,
            risk_aversion: 2.0,
            transaction_cost_bps: 5,
            equity_weight_bounds: WeightBounds { min: 0.0, max: 1.0 },
        }
    }
}

impl StrategyConfig {
    /// True when every field sits inside its declared domain. Saved and
    /// launched configs must pass; `clamp()` below makes any config pass.
    pub fn is_valid(&self) -> bool {
        !self.name.trim().is_empty()
            && (0.05..=0.20).contains(&self.target_volatility)
            && (6..=24).contains(&self.vol_lookback_months)
            && (0.5..=5.0).contains(&self.risk_aversion)
            && self.transaction_cost_bps <= 20
            && (0.0..=1.0).contains(&self.equity_weight_bounds.min)
            && (0.0..=1.0).contains(&self.equity_weight_bounds.max)
            && self.equity_weight_bounds.min <= self.equity_weight_bounds.max
    }

    /// Clamp every numeric field to its domain. Out-of-range patch values are
    /// clamped rather than rejected; the policy is total and uniform. Bounds
    /// are reconciled afterwards so min <= max holds.
    pub fn clamp(&mut self) {
        self.target_volatility = self.target_volatility.clamp(0.05, 0.20);
        self.vol_lookback_months = self.vol_lookback_months.clamp(6, 24);
        self.risk_aversion = self.risk_aversion.clamp(0.5, 5.0);
        self.transaction_cost_bps = self.transaction_cost_bps.min(20);
        self.equity_weight_bounds.min = self.equity_weight_bounds.min.clamp(0.0, 1.0);
        self.equity_weight_bounds.max = self.equity_weight_bounds.max.clamp(0.0, 1.0);
        if self.equity_weight_bounds.min > self.equity_weight_bounds.max {
            self.equity_weight_bounds.max = self.equity_weight_bounds.min;
        }
    }
}

/// Field-level patch merged into the current config. Absent fields are left
/// untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StrategyPatch {
    pub name: Option<String>,
    pub target_volatility: Option<f64>,
    pub equity_weight_function: Option<WeightFunction>,
    pub vol_lookback_months: Option<u32>,
    pub rebalancing_frequency: Option<RebalanceFrequency>,
    pub risk_aversion: Option<f64>,
    pub transaction_cost_bps: Option<u32>,
    pub equity_weight_bounds: Option<WeightBounds>,
}

impl StrategyPatch {
    pub fn apply(&self, cfg: &mut StrategyConfig) {
        if let Some(v) = &self.name {
            if !v.trim().is_empty() {
                cfg.name = v.clone();
            }
        }
        if let Some(v) = self.target_volatility {
            cfg.target_volatility = v;
        }
        if let Some(v) = self.equity_weight_function {
            cfg.equity_weight_function = v;
        }
        if let Some(v) = self.vol_lookback_months {
            cfg.vol_lookback_months = v;
        }
        if let Some(v) = self.rebalancing_frequency {
            cfg.rebalancing_frequency = v;
        }
        if let Some(v) = self.risk_aversion {
            cfg.risk_aversion = v;
        }
        if let Some(v) = self.transaction_cost_bps {
            cfg.transaction_cost_bps = v;
        }
        if let Some(v) = self.equity_weight_bounds {
            cfg.equity_weight_bounds = v;
        }
        cfg.clamp();
    }
}

/// Working copy plus the append-only saved set. Saved snapshots are immutable;
/// `load` replaces the working copy wholesale.
#[derive(Debug, Clone, Default)]
pub struct StrategyState {
    pub current: StrategyConfig,
    pub saved: Vec<StrategyConfig>,
}

impl StrategyState {
    pub fn new() -> Self {
        Self {
            current: StrategyConfig::default(),
            saved: Vec::new(),
        }
    }

    pub fn find_saved(&self, id: &str) -> Option<&StrategyConfig> {
        self.saved.iter().find(|s| s.id.as_deref() == Some(id))
    }
}
