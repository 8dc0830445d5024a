//! Remote gateway: the integration surface a real optimizer backend must
//! satisfy. The store performs no computation; whatever fulfills this trait
//! drives the job transitions by reporting status asynchronously.

use anyhow::anyhow;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::{ApiError, ApiResult};
use crate::export::ExportFormat;
use crate::job::{OptimizationJob, OptimizationResults};
use crate::strategy::{StrategyConfig, StrategyPatch};

pub mod http;
pub mod retry;
pub mod sim;

/// Envelope every service response arrives in. `success` gates the payload;
/// callers go through `into_result` instead of touching `data` directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            message: None,
        }
    }

    pub fn err(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            message: None,
        }
    }

    pub fn into_result(self) -> ApiResult<T> {
        if self.success {
            self.data
                .ok_or_else(|| ApiError::Gateway(anyhow!("success response without payload")))
        } else {
            let msg = self
                .error
                .or(self.message)
                .unwrap_or_else(|| "unspecified service error".to_string());
            Err(ApiError::Gateway(anyhow!(msg)))
        }
    }
}

#[async_trait]
pub trait OptimizerGateway {
    /// Submit a job; the service answers with a pending job record.
    async fn submit_optimization(
        &self,
        strategy: &StrategyConfig,
        scenarios: &[String],
        iterations: u32,
    ) -> ApiResult<OptimizationJob>;

    async fn get_optimization_status(&self, job_id: &str) -> ApiResult<OptimizationJob>;

    async fn get_optimization_results(&self, job_id: &str) -> ApiResult<OptimizationResults>;

    async fn cancel_optimization(&self, job_id: &str) -> ApiResult<()>;

    // Strategy CRUD.
    async fn list_strategies(&self) -> ApiResult<Vec<StrategyConfig>>;
    async fn save_strategy(&self, strategy: &StrategyConfig) -> ApiResult<StrategyConfig>;
    async fn get_strategy(&self, id: &str) -> ApiResult<StrategyConfig>;
    async fn update_strategy(&self, id: &str, patch: &StrategyPatch) -> ApiResult<StrategyConfig>;
    async fn delete_strategy(&self, id: &str) -> ApiResult<()>;

    /// Rendered results in the requested format.
    async fn export_results(&self, job_id: &str, format: ExportFormat) -> ApiResult<Vec<u8>>;
}

#[derive(Clone, Copy, Debug)]
pub enum GatewayKind {
    Http,
    Simulated,
}

impl GatewayKind {
    /// HTTP when a base URL is configured, in-process simulator otherwise.
    pub fn from_config(cfg: &Config) -> Self {
        if cfg.optimizer_base.is_empty() {
            GatewayKind::Simulated
        } else {
            GatewayKind::Http
        }
    }

    pub fn build(self, cfg: &Config) -> anyhow::Result<Box<dyn OptimizerGateway + Send + Sync>> {
        match self {
            GatewayKind::Http => Ok(Box::new(http::HttpGateway::new(cfg)?)),
            GatewayKind::Simulated => Ok(Box::new(sim::SimulatedOptimizer::new())),
        }
    }
}
