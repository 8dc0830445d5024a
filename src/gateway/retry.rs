//! Exponential backoff with jitter for status polling and other transient
//! gateway failures. Typed errors that are not retryable (auth expiry,
//! validation, not-found) surface immediately.

use std::future::Future;

use rand::Rng;
use tokio::time::{sleep, Duration};

use crate::config::Config;
use crate::error::{ApiError, ApiResult};

#[derive(Clone, Debug)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 100,
            max_delay_ms: 5000,
            jitter_factor: 0.3,
        }
    }
}

impl RetryConfig {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            max_retries: cfg.retry_max,
            base_delay_ms: cfg.retry_base_delay_ms,
            max_delay_ms: cfg.retry_max_delay_ms,
            jitter_factor: 0.3,
        }
    }

    fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base = self.base_delay_ms as f64 * 2.0_f64.powi(attempt as i32);
        let clamped = base.min(self.max_delay_ms as f64);

        let jitter_range = clamped * self.jitter_factor;
        let jitter: f64 = if jitter_range > 0.0 {
            rand::thread_rng().gen_range(-jitter_range..=jitter_range)
        } else {
            0.0
        };
        Duration::from_millis((clamped + jitter).max(0.0) as u64)
    }
}

/// Retry a fallible gateway call. Only `ApiError::is_retryable` failures are
/// retried; everything else propagates on the first occurrence.
pub async fn retry_api<F, Fut, T>(
    config: &RetryConfig,
    operation_name: &str,
    mut operation: F,
) -> ApiResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ApiResult<T>>,
{
    let mut last_error: Option<ApiError> = None;

    for attempt in 0..=config.max_retries {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) if !e.is_retryable() => return Err(e),
            Err(e) => {
                if attempt < config.max_retries {
                    let delay = config.delay_for_attempt(attempt);
                    eprintln!(
                        "[retry] {} attempt {}/{} failed: {}. Retrying in {:?}",
                        operation_name,
                        attempt + 1,
                        config.max_retries + 1,
                        e,
                        delay
                    );
                    sleep(delay).await;
                }
                last_error = Some(e);
            }
        }
    }

    Err(last_error
        .unwrap_or_else(|| ApiError::Gateway(anyhow::anyhow!("retry exhausted without error"))))
}

/// HTTP statuses worth retrying on a poll.
pub fn is_retryable_http_status(status: u16) -> bool {
    matches!(status, 408 | 429 | 500 | 502 | 503 | 504)
}
