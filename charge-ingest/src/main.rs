use anyhow::Result;
use charge_ingest::{config::AppConfig, job, metrics_push, observability};
use time::OffsetDateTime;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    observability::init_tracing();

    // Load configuration
    let cfg = AppConfig::load()?;

    let pusher = metrics_push::init(&cfg.metrics);

    let today = OffsetDateTime::now_local()
        .unwrap_or_else(|_| OffsetDateTime::now_utc())
        .date();

    match job::run(&cfg, today).await {
        Some(outcome) => {
            let failed = outcome.upsert.as_ref().map_or(0, |r| r.failed.len());
            tracing::info!(
                days = outcome.summaries.len(),
                failed,
                monthly_total = ?outcome.monthly_total,
                telegram_sent = outcome.telegram_sent,
                sensor_pushed = outcome.sensor_pushed,
                "run complete"
            );
        }
        None => tracing::warn!("run skipped"),
    }

    if let Some(pusher) = pusher {
        pusher.push().await;
    }

    Ok(())
}
