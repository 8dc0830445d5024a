//! Structured JSON logging.
//!
//! One JSON object per line on stdout. `LOG_LEVEL` sets the minimum level,
//! `LOG_DOMAINS` (comma-separated, or "all") filters by domain. Entries carry
//! a process-wide sequence number so interleaved store and gateway activity
//! can be reordered after the fact.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Trace = 0,
    Debug = 1,
    Info = 2,
    Warn = 3,
    Error = 4,
}

impl Level {
    pub fn from_env() -> Self {
        match std::env::var("LOG_LEVEL").as_deref() {
            Ok("trace") => Level::Trace,
            Ok("debug") => Level::Debug,
            Ok("info") => Level::Info,
            Ok("warn") => Level::Warn,
            Ok("error") => Level::Error,
            _ => Level::Info,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Trace => "trace",
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    Strategy, // config edits, save/load
    Scenario, // catalog and selection changes
    Job,      // lifecycle transitions, progress
    Gateway,  // optimizer service calls
    Store,    // event dispatch, persistence
    System,   // startup, shutdown
}

impl Domain {
    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Strategy => "strategy",
            Domain::Scenario => "scenario",
            Domain::Job => "job",
            Domain::Gateway => "gateway",
            Domain::Store => "store",
            Domain::System => "system",
        }
    }

    pub fn is_enabled(&self) -> bool {
        match std::env::var("LOG_DOMAINS").as_deref() {
            Ok("all") | Err(_) => true,
            Ok(domains) => domains.split(',').any(|d| d.trim() == self.as_str()),
        }
    }
}

static LOG_SEQ: AtomicU64 = AtomicU64::new(0);

fn next_seq() -> u64 {
    LOG_SEQ.fetch_add(1, Ordering::SeqCst)
}

/// RFC3339 timestamp with milliseconds.
pub fn ts_now() -> String {
    Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

/// Epoch milliseconds, the timestamp unit used on jobs.
pub fn ts_epoch_ms() -> u64 {
    Utc::now().timestamp_millis() as u64
}

/// Emit a structured log entry.
pub fn log(level: Level, domain: Domain, event: &str, fields: Map<String, Value>) {
    if level < Level::from_env() || !domain.is_enabled() {
        return;
    }

    let mut entry = Map::new();
    entry.insert("ts".to_string(), json!(ts_now()));
    entry.insert("seq".to_string(), json!(next_seq()));
    entry.insert("lvl".to_string(), json!(level.as_str()));
    entry.insert("domain".to_string(), json!(domain.as_str()));
    entry.insert("event".to_string(), json!(event));
    entry.insert("data".to_string(), Value::Object(fields));
    println!("{}", Value::Object(entry));
}

// Domain helpers -------------------------------------------------------------

pub fn log_progress(job_id: &str, progress: u8) {
    log(
        Level::Debug,
        Domain::Job,
        "progress",
        obj(&[("job_id", v_str(job_id)), ("progress", json!(progress))]),
    );
}

pub fn log_gateway_call(endpoint: &str, outcome: &str, elapsed_ms: f64) {
    log(
        Level::Debug,
        Domain::Gateway,
        "call",
        obj(&[
            ("endpoint", v_str(endpoint)),
            ("outcome", v_str(outcome)),
            ("elapsed_ms", v_num(elapsed_ms)),
        ]),
    );
}

// Builders -------------------------------------------------------------------

pub fn obj(pairs: &[(&str, Value)]) -> Map<String, Value> {
    let mut map = Map::new();
    for (k, v) in pairs {
        map.insert((*k).to_string(), v.clone());
    }
    map
}

pub fn v_str(s: &str) -> Value {
    Value::String(s.to_string())
}

pub fn v_num(n: f64) -> Value {
    json!(n)
}
