//! HTTP implementation of the optimizer gateway.
//!
//! Status mapping: 401 is a session-expiry signal (`AuthExpired`, never
//! retried), 404 is `NotFound`, 409 is `Conflict` except on the results
//! endpoint where it means the job has not completed (`NotReady`). Transient
//! 5xx and timeout failures surface as `Gateway` errors, which the retry
//! layer may replay.

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::json;
use url::Url;

use super::{ApiResponse, OptimizerGateway};
use crate::config::Config;
use crate::error::{ApiError, ApiResult};
use crate::export::ExportFormat;
use crate::job::{OptimizationJob, OptimizationResults};
use crate::logging::log_gateway_call;
use crate::strategy::{StrategyConfig, StrategyPatch};

pub struct HttpGateway {
    client: Client,
    base: Url,
    token: Option<String>,
}

impl HttpGateway {
    pub fn new(cfg: &Config) -> anyhow::Result<Self> {
        let base = Url::parse(&cfg.optimizer_base)
            .with_context(|| format!("bad optimizer base url: {}", cfg.optimizer_base))?;
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(cfg.request_timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base,
            token: cfg.auth_token.clone(),
        })
    }

    fn url(&self, path: &str) -> ApiResult<Url> {
        self.base
            .join(path)
            .map_err(|e| ApiError::Gateway(anyhow!("bad endpoint {}: {}", path, e)))
    }

    fn authed(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(&self, endpoint: &str, builder: RequestBuilder) -> ApiResult<Response> {
        let started = std::time::Instant::now();
        let result = self.authed(builder).send().await;
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        match result {
            Ok(resp) => {
                log_gateway_call(endpoint, resp.status().as_str(), elapsed_ms);
                Ok(resp)
            }
            Err(err) => {
                log_gateway_call(endpoint, "transport_error", elapsed_ms);
                Err(ApiError::Gateway(anyhow!("{}: {}", endpoint, err)))
            }
        }
    }

    /// Map error statuses to the taxonomy, handing back successful responses.
    async fn check(resp: Response, subject: &str, results_endpoint: bool) -> ApiResult<Response> {
        match resp.status() {
            StatusCode::UNAUTHORIZED => Err(ApiError::AuthExpired),
            StatusCode::NOT_FOUND => Err(ApiError::NotFound(subject.to_string())),
            StatusCode::CONFLICT if results_endpoint => {
                Err(ApiError::NotReady(subject.to_string()))
            }
            StatusCode::CONFLICT => Err(ApiError::Conflict(subject.to_string())),
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                let body = resp.text().await.unwrap_or_default();
                Err(ApiError::Validation(body))
            }
            status if !status.is_success() => Err(ApiError::Gateway(anyhow!(
                "{}: unexpected status {}",
                subject,
                status
            ))),
            _ => Ok(resp),
        }
    }

    /// Status mapping, then the payload out of the service envelope.
    async fn decode<T: DeserializeOwned>(
        resp: Response,
        subject: &str,
        results_endpoint: bool,
    ) -> ApiResult<T> {
        let resp = Self::check(resp, subject, results_endpoint).await?;
        let envelope: ApiResponse<T> = resp
            .json()
            .await
            .map_err(|e| ApiError::Gateway(anyhow!("malformed response: {}", e)))?;
        envelope.into_result()
    }

    /// For void endpoints the envelope carries no payload; only the success
    /// flag matters.
    async fn decode_unit(resp: Response, subject: &str) -> ApiResult<()> {
        let resp = Self::check(resp, subject, false).await?;
        let envelope: ApiResponse<serde_json::Value> = resp
            .json()
            .await
            .map_err(|e| ApiError::Gateway(anyhow!("malformed response: {}", e)))?;
        if envelope.success {
            Ok(())
        } else {
            let msg = envelope
                .error
                .or(envelope.message)
                .unwrap_or_else(|| "unspecified service error".to_string());
            Err(ApiError::Gateway(anyhow!(msg)))
        }
    }
}

#[async_trait]
impl OptimizerGateway for HttpGateway {
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
        let url = self.url("optimize")?;
        let body = json!({
            "strategy": strategy,
            "scenarios": scenarios,
            "iterations": iterations,
        });
        let resp = self.send("optimize", self.client.post(url).json(&body)).await?;
        Self::decode(resp, "optimization", false).await
    }

    async fn get_optimization_status(&self, job_id: &str) -> ApiResult<OptimizationJob> {
        let url = self.url(&format!("optimize/{}/status", job_id))?;
        let resp = self.send("optimize_status", self.client.get(url)).await?;
        Self::decode(resp, job_id, false).await
    }

    async fn get_optimization_results(&self, job_id: &str) -> ApiResult<OptimizationResults> {
        let url = self.url(&format!("optimize/{}/results", job_id))?;
        let resp = self.send("optimize_results", self.client.get(url)).await?;
        Self::decode(resp, job_id, true).await
    }

    async fn cancel_optimization(&self, job_id: &str) -> ApiResult<()> {
        let url = self.url(&format!("optimize/{}", job_id))?;
        let resp = self.send("optimize_cancel", self.client.delete(url)).await?;
        Self::decode_unit(resp, job_id).await
    }

    async fn list_strategies(&self) -> ApiResult<Vec<StrategyConfig>> {
        let url = self.url("strategies")?;
        let resp = self.send("strategies_list", self.client.get(url)).await?;
        Self::decode(resp, "strategies", false).await
    }

    async fn save_strategy(&self, strategy: &StrategyConfig) -> ApiResult<StrategyConfig> {
        let url = self.url("strategies")?;
        let resp = self
            .send("strategies_save", self.client.post(url).json(strategy))
            .await?;
        Self::decode(resp, &strategy.name, false).await
    }

    async fn get_strategy(&self, id: &str) -> ApiResult<StrategyConfig> {
        let url = self.url(&format!("strategies/{}", id))?;
        let resp = self.send("strategies_get", self.client.get(url)).await?;
        Self::decode(resp, id, false).await
    }

    async fn update_strategy(&self, id: &str, patch: &StrategyPatch) -> ApiResult<StrategyConfig> {
        let url = self.url(&format!("strategies/{}", id))?;
        let resp = self
            .send("strategies_update", self.client.put(url).json(patch))
            .await?;
        Self::decode(resp, id, false).await
    }

    async fn delete_strategy(&self, id: &str) -> ApiResult<()> {
        let url = self.url(&format!("strategies/{}", id))?;
        let resp = self.send("strategies_delete", self.client.delete(url)).await?;
        Self::decode_unit(resp, id).await
    }

    async fn export_results(&self, job_id: &str, format: ExportFormat) -> ApiResult<Vec<u8>> {
        let mut url = self.url(&format!("results/{}/export", job_id))?;
        url.query_pairs_mut().append_pair("format", format.as_str());
        let resp = self.send("results_export", self.client.get(url)).await?;
        match resp.status() {
            StatusCode::UNAUTHORIZED => Err(ApiError::AuthExpired),
            StatusCode::NOT_FOUND => Err(ApiError::NotFound(job_id.to_string())),
            StatusCode::CONFLICT => Err(ApiError::NotReady(job_id.to_string())),
            StatusCode::BAD_REQUEST => Err(ApiError::UnsupportedFormat(format.to_string())),
            status if !status.is_success() => Err(ApiError::Gateway(anyhow!(
                "export: unexpected status {}",
                status
            ))),
            _ => resp
                .bytes()
                .await
                .map(|b| b.to_vec())
                .map_err(|e| ApiError::Gateway(anyhow!("export body: {}", e))),
        }
    }
}
