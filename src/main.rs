use anyhow::Result;
use tokio::time::{sleep, Duration};

use optfolio::config::Config;
use optfolio::error::ApiError;
use optfolio::export::{render_csv, ExportFormat};
use optfolio::gateway::retry::{retry_api, RetryConfig};
use optfolio::gateway::GatewayKind;
use optfolio::job::JobStatus;
use optfolio::logging::{self, Domain, Level};
use optfolio::results::ResultsView;
use optfolio::storage::StateStore;
use optfolio::store::Store;
use optfolio::strategy::{StrategyPatch, WeightFunction};

#[tokio::main]
async fn main() -> Result<()> {
    let cfg = Config::from_env();
    logging::log(
        Level::Info,
        Domain::System,
        "startup",
        logging::obj(&[
            ("sqlite", logging::v_str(&cfg.sqlite_path)),
            ("iterations", serde_json::json!(cfg.iterations)),
        ]),
    );

    let mut persistence = StateStore::new(&cfg.sqlite_path)?;
    persistence.init()?;
    let mut store = Store::with_persistence(persistence)?;

    let kind = GatewayKind::from_config(&cfg);
    logging::log(
        Level::Info,
        Domain::System,
        "gateway",
        logging::obj(&[(
            "kind",
            logging::v_str(match kind {
                GatewayKind::Http => "http",
                GatewayKind::Simulated => "simulated",
            }),
        )]),
    );
    let gateway = kind.build(&cfg)?;
    let retry = RetryConfig::from_config(&cfg);

    // Configure the session: a low-vol tilt over a bearish subset.
    store.patch_strategy(StrategyPatch {
        name: Some("Defensive Vol Target".to_string()),
        target_volatility: Some(0.08),
        equity_weight_function: Some(WeightFunction::InverseVolSquared),
        ..Default::default()
    })?;
    let saved_id = store.save_strategy()?;
    logging::log(
        Level::Info,
        Domain::Strategy,
        "saved",
        logging::obj(&[("id", logging::v_str(&saved_id))]),
    );

    store.toggle_scenario("low_volatility")?;
    store.toggle_scenario("bull_market")?;

    // Submit to the optimizer service and mirror its job into the store.
    let submitted = gateway
        .submit_optimization(store.current_strategy(), &store.selection(), cfg.iterations)
        .await?;
    store.start_job(
        &submitted.job_id,
        submitted.strategy_config.clone(),
        submitted.market_scenarios.clone(),
        submitted.iterations,
    )?;

    // Poll until terminal, feeding progress events into the store. Transient
    // gateway failures are retried with backoff; auth expiry aborts.
    let job_id = submitted.job_id.clone();
    loop {
        let polled = match retry_api(&retry, "optimize_status", || {
            gateway.get_optimization_status(&job_id)
        })
        .await
        {
            Ok(job) => job,
            Err(ApiError::AuthExpired) => {
                store.cancel()?;
                anyhow::bail!("optimizer session expired; re-authenticate and retry");
            }
            Err(err) => {
                store.fail_job(&job_id)?;
                return Err(err.into());
            }
        };

        store.update_progress(&job_id, polled.progress as u32)?;
        match polled.status {
            JobStatus::Completed => {
                let results = retry_api(&retry, "optimize_results", || {
                    gateway.get_optimization_results(&job_id)
                })
                .await?;
                store.complete_job(&job_id, results)?;
                break;
            }
            JobStatus::Failed => {
                store.fail_job(&job_id)?;
                break;
            }
            _ => sleep(Duration::from_millis(cfg.poll_interval_ms)).await,
        }
    }

    // Render whatever the store holds for the job.
    match store.results_view(&job_id) {
        ResultsView::Ready(report) => {
            for card in &report.cards {
                println!("{:<20} {}", card.label, card.value);
            }
            if let Some(job) = store.history().first() {
                if let Some(results) = &job.results {
                    let path = format!("{}.csv", job_id);
                    std::fs::write(&path, render_csv(results))?;
                    logging::log(
                        Level::Info,
                        Domain::System,
                        "export_written",
                        logging::obj(&[
                            ("path", logging::v_str(&path)),
                            ("format", logging::v_str(ExportFormat::Csv.as_str())),
                        ]),
                    );
                }
            }
        }
        ResultsView::Failed => println!("job {} did not complete", job_id),
        ResultsView::InProgress { progress } => println!("job {} still running ({}%)", job_id, progress),
        ResultsView::NotFound => println!("job {} not found", job_id),
    }

    logging::log(
        Level::Info,
        Domain::System,
        "shutdown",
        logging::obj(&[("history_len", serde_json::json!(store.history().len()))]),
    );
    Ok(())
}
