//! Durable snapshots of saved strategies and terminal jobs.
//!
//! The store itself is in-memory; sqlite only re-hydrates the saved-strategy
//! set and the job history across restarts. Payloads are stored as JSON so
//! the schema survives field additions.

use anyhow::Result;
use rusqlite::{params, Connection};

use crate::job::OptimizationJob;
use crate::strategy::StrategyConfig;

pub struct StateStore {
    conn: Connection,
}

impl StateStore {
    pub fn new(path: &str) -> Result<Self> {
        Ok(Self {
            conn: Connection::open(path)?,
        })
    }

    pub fn init(&mut self) -> Result<()> {
        self.conn.execute_batch(
            "BEGIN;
            CREATE TABLE IF NOT EXISTS strategies (
                id TEXT PRIMARY KEY,
                config TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS job_history (
                job_id TEXT PRIMARY KEY,
                status TEXT NOT NULL,
                end_time INTEGER NOT NULL,
                job TEXT NOT NULL
            );
            COMMIT;",
        )?;
        Ok(())
    }

    pub fn persist_strategy(&mut self, cfg: &StrategyConfig) -> Result<()> {
        let id = cfg.id.clone().unwrap_or_default();
        self.conn.execute(
            "INSERT OR REPLACE INTO strategies (id, config) VALUES (?1, ?2)",
            params![id, serde_json::to_string(cfg)?],
        )?;
        Ok(())
    }

    pub fn delete_strategy(&mut self, id: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM strategies WHERE id = ?1", params![id])?;
        Ok(())
    }

    /// Only terminal jobs land here; the reducer guarantees it.
    pub fn persist_job(&mut self, job: &OptimizationJob) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO job_history (job_id, status, end_time, job)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                job.job_id,
                job.status.as_str(),
                job.end_time.unwrap_or(0) as i64,
                serde_json::to_string(job)?
            ],
        )?;
        Ok(())
    }

    pub fn load_strategies(&self) -> Result<Vec<StrategyConfig>> {
        let mut stmt = self.conn.prepare("SELECT config FROM strategies ORDER BY id")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let mut out = Vec::new();
        for row in rows {
            out.push(serde_json::from_str(&row?)?);
        }
        Ok(out)
    }

    /// Most-recent-first, matching in-memory history order.
    pub fn load_history(&self) -> Result<Vec<OptimizationJob>> {
        let mut stmt = self
            .conn
            .prepare("SELECT job FROM job_history ORDER BY end_time DESC")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let mut out = Vec::new();
        for row in rows {
            out.push(serde_json::from_str(&row?)?);
        }
        Ok(out)
    }
}
