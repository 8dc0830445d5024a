//! Error taxonomy shared by the store and the remote gateway.
//!
//! Local store operations that reference a stale `job_id` are benign no-ops,
//! not errors: asynchronous progress reports are expected to race against
//! completion and cancellation. Everything a caller must branch on is a typed
//! variant here.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed or out-of-range input: empty scenario selection, bad
    /// strategy field, duplicate scenario name, zero iteration budget.
    #[error("validation: {0}")]
    Validation(String),

    /// Unknown job or strategy id.
    #[error("not found: {0}")]
    NotFound(String),

    /// Second concurrent launch, or cancel/complete against a terminal job.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Results requested before the job completed.
    #[error("not ready: job {0} has not completed")]
    NotReady(String),

    /// Export format outside {csv, pdf, excel}.
    #[error("unsupported export format: {0}")]
    UnsupportedFormat(String),

    /// HTTP 401 from the optimizer service. The session token is stale;
    /// re-authentication is required, retrying is pointless.
    #[error("session expired, re-authentication required")]
    AuthExpired,

    /// Transport or protocol failure talking to the optimizer service.
    #[error("gateway: {0}")]
    Gateway(#[from] anyhow::Error),
}

impl ApiError {
    /// Transient failures worth retrying on a status poll. Auth expiry and
    /// caller mistakes are not.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ApiError::Gateway(_))
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
