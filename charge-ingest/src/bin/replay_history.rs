use anyhow::{bail, Result};
use charge_ingest::{
    config::AppConfig,
    job::{normalizer_for, open_store},
    observability,
    pipeline::{Pipeline, Sink},
    sinks::EnergyDbSink,
    sources::HistoryFileSource,
};
use std::env;

/// Summarize a saved history response and print the result as JSON.
/// With `--persist`, also upsert the summaries into the configured store.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    observability::init_tracing();

    let args: Vec<String> = env::args().skip(1).collect();
    let persist = args.iter().any(|a| a == "--persist");
    let Some(file_path) = args.iter().find(|a| !a.starts_with("--")) else {
        bail!("usage: replay_history <history_json_file> [--persist]");
    };

    let cfg = AppConfig::load()?;

    let pipeline = Pipeline {
        source: HistoryFileSource::new(file_path),
        normalizer: normalizer_for(&cfg),
    };
    let summaries = pipeline.summarize().await;

    println!("{}", serde_json::to_string_pretty(&summaries)?);

    if persist {
        let store = open_store(&cfg.database).await?;
        let sink = EnergyDbSink::new(store.clone(), cfg.database.commit_mode);
        let report = sink.write(&summaries).await;
        store.close().await;

        if !report.is_clean() {
            for failed in &report.failed {
                tracing::error!(date = %failed.date, reason = %failed.reason, "summary not persisted");
            }
            bail!("{} of {} summaries failed to persist", report.failed.len(), summaries.len());
        }
    }

    Ok(())
}
