//! Results export. CSV renders locally; pdf and excel are produced by the
//! optimizer service and fetched through the gateway.

use std::fmt;
use std::str::FromStr;

use crate::error::ApiError;
use crate::job::OptimizationResults;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Pdf,
    Excel,
}

impl ExportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Pdf => "pdf",
            ExportFormat::Excel => "excel",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportFormat {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "pdf" => Ok(ExportFormat::Pdf),
            "excel" => Ok(ExportFormat::Excel),
            other => Err(ApiError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// Render completed results as CSV: a summary block, the convergence
/// sequence, and the per-scenario metrics table. Values stay fractions.
pub fn render_csv(results: &OptimizationResults) -> String {
    let mut out = String::new();

    out.push_str("section,key,value\n");
    out.push_str(&format!("summary,job_id,{}\n", results.job_id));
    out.push_str(&format!(
        "summary,total_strategies_tested,{}\n",
        results.summary.total_strategies_tested
    ));
    out.push_str(&format!(
        "summary,best_sharpe_ratio,{}\n",
        results.summary.best_sharpe_ratio
    ));
    out.push_str(&format!(
        "summary,convergence_iterations,{}\n",
        results.summary.convergence_iterations
    ));
    out.push_str(&format!(
        "summary,execution_time_seconds,{}\n",
        results.summary.execution_time_seconds
    ));

    out.push_str("\niteration,objective,risk\n");
    for p in &results.convergence {
        out.push_str(&format!("{},{},{}\n", p.iteration, p.objective, p.risk));
    }

    out.push_str(
        "\nscenario,mean_return,volatility,sharpe_ratio,max_drawdown,var95,cvar95,avg_equity_weight\n",
    );
    for eval in &results.evaluations {
        let m = &eval.metrics;
        out.push_str(&format!(
            "{},{},{},{},{},{},{},{}\n",
            eval.scenario,
            m.mean_return,
            m.volatility,
            m.sharpe_ratio,
            m.max_drawdown,
            m.var95,
            m.cvar95,
            m.avg_equity_weight
        ));
    }

    out
}
