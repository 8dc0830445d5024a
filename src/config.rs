//! Process configuration, environment-driven with defaults.

#[derive(Clone, Debug)]
pub struct Config {
    /// Base URL of the optimizer service. Empty means no remote backend.
    pub optimizer_base: String,
    /// Bearer token for the optimizer service.
    pub auth_token: Option<String>,
    pub sqlite_path: String,
    /// Requested optimization budget per job.
    pub iterations: u32,
    /// Status poll cadence in milliseconds.
    pub poll_interval_ms: u64,
    pub retry_max: u32,
    pub retry_base_delay_ms: u64,
    pub retry_max_delay_ms: u64,
    /// Gateway request timeout. Optimizations are long-running.
    pub request_timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            optimizer_base: std::env::var("OPTIMIZER_URL").unwrap_or_default(),
            auth_token: std::env::var("OPTIMIZER_TOKEN").ok(),
            sqlite_path: std::env::var("SQLITE_PATH").unwrap_or_else(|_| "./optfolio.sqlite".to_string()),
            iterations: std::env::var("ITERATIONS").ok().and_then(|v| v.parse().ok()).unwrap_or(100),
            poll_interval_ms: std::env::var("POLL_INTERVAL_MS").ok().and_then(|v| v.parse().ok()).unwrap_or(500),
            retry_max: std::env::var("RETRY_MAX").ok().and_then(|v| v.parse().ok()).unwrap_or(3),
            retry_base_delay_ms: std::env::var("RETRY_BASE_MS").ok().and_then(|v| v.parse().ok()).unwrap_or(100),
            retry_max_delay_ms: std::env::var("RETRY_MAX_MS").ok().and_then(|v| v.parse().ok()).unwrap_or(5000),
            request_timeout_secs: std::env::var("REQUEST_TIMEOUT_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(300),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            optimizer_base: String::new(),
            auth_token: None,
            sqlite_path: "./optfolio.sqlite".to_string(),
            iterations: 100,
            poll_interval_ms: 500,
            retry_max: 3,
            retry_base_delay_ms: 100,
            retry_max_delay_ms: 5000,
            request_timeout_secs: 300,
        }
    }
}
