//! One end-to-end run: fetch, summarize, persist, report.

use charge_client::{
    db::{prepare_sqlite_path, DatabaseKind, EnergyStore, StoreError},
    domain::{DailySummary, DateWindow},
};
use time::Date;

use crate::{
    config::{AppConfig, ConfigError, DatabaseConfig},
    notify::{self, HaSensorPublisher, TelegramNotifier},
    pipeline::{Pipeline, Sink},
    sinks::{EnergyDbSink, UpsertReport},
    sources::HaHistorySource,
    transform::EventNormalizer,
};

#[derive(thiserror::Error, Debug)]
pub enum StoreOpenError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// What a run did. Every step is best effort, so each field may be empty.
#[derive(Debug, Default)]
pub struct RunOutcome {
    pub summaries: Vec<DailySummary>,
    pub upsert: Option<UpsertReport>,
    pub monthly_total: Option<f64>,
    pub telegram_sent: bool,
    pub sensor_pushed: bool,
}

pub fn normalizer_for(cfg: &AppConfig) -> EventNormalizer {
    let ha = &cfg.home_assistant;
    EventNormalizer::new(&ha.presence_entity_id, &ha.energy_entity_id).with_home_state(&ha.home_state)
}

/// Connect to the configured store and make sure the table exists.
pub async fn open_store(cfg: &DatabaseConfig) -> Result<EnergyStore, StoreOpenError> {
    let url = cfg.connection_url()?;
    if cfg.kind == DatabaseKind::Sqlite && cfg.url.is_none() {
        prepare_sqlite_path(&cfg.path)?;
    }

    let store = EnergyStore::connect(cfg.kind, &url, cfg.max_connections).await?;
    store.ensure_schema().await?;
    Ok(store)
}

/// Run once for `today`. Returns `None` when the history query cannot be
/// built from the configuration; nothing is fetched or opened in that case.
pub async fn run(cfg: &AppConfig, today: Date) -> Option<RunOutcome> {
    let ha = &cfg.home_assistant;
    let (Some(base_url), Some(start_date)) = (ha.base_url.as_deref(), ha.start_date.as_deref()) else {
        tracing::warn!("home_assistant.base_url or start_date missing, nothing to do");
        return None;
    };

    let mut outcome = RunOutcome {
        summaries: summarize(cfg, base_url, start_date).await,
        ..RunOutcome::default()
    };
    tracing::info!(days = outcome.summaries.len(), "daily summaries computed");

    let store = if cfg.features.use_database {
        match open_store(&cfg.database).await {
            Ok(store) => Some(store),
            Err(e) => {
                tracing::error!(error = %e, kind = %cfg.database.kind, "energy store unavailable, skipping persistence");
                None
            }
        }
    } else {
        None
    };

    if let Some(store) = &store {
        let sink = EnergyDbSink::new(store.clone(), cfg.database.commit_mode);
        let report = sink.write(&outcome.summaries).await;
        for failed in &report.failed {
            tracing::warn!(date = %failed.date, reason = %failed.reason, "summary not persisted");
        }
        outcome.upsert = Some(report);
    }

    if cfg.features.send_telegram {
        send_monthly_report(cfg, store.as_ref(), today, &mut outcome).await;
    }

    if cfg.features.send_home_assistant {
        outcome.sensor_pushed = push_sensor(cfg, &outcome.summaries).await;
    }

    if let Some(store) = store {
        store.close().await;
    }

    Some(outcome)
}

async fn summarize(cfg: &AppConfig, base_url: &str, start_date: &str) -> Vec<DailySummary> {
    let ha = &cfg.home_assistant;
    let source = match HaHistorySource::new(
        base_url,
        ha.api_token.clone(),
        start_date,
        ha.entity_ids(),
        ha.timeout(),
    ) {
        Ok(source) => source.with_end_time(ha.end_time.clone()),
        Err(e) => {
            tracing::error!(error = %e, "cannot build history source");
            return Vec::new();
        }
    };

    let pipeline = Pipeline {
        source,
        normalizer: normalizer_for(cfg),
    };
    pipeline.summarize().await
}

async fn send_monthly_report(
    cfg: &AppConfig,
    store: Option<&EnergyStore>,
    today: Date,
    outcome: &mut RunOutcome,
) {
    if today.day() != 1 {
        tracing::debug!(%today, "not the first of the month, no monthly report");
        return;
    }
    let Some(store) = store else {
        tracing::warn!("monthly report needs the energy store, skipping");
        return;
    };
    let Some(window) = DateWindow::previous_month(today) else {
        return;
    };

    let total = match store.windowed_total(window).await {
        Ok(total) => total,
        Err(e) => {
            tracing::error!(error = %e, %window, "monthly total query failed");
            return;
        }
    };
    outcome.monthly_total = Some(total);
    tracing::info!(%window, total_kwh = total, "previous month total");

    let tg = &cfg.telegram;
    let (Some(token), Some(chat_id)) = (tg.token.as_deref(), tg.chat_id.as_deref()) else {
        tracing::warn!("telegram token or chat_id missing, report not sent");
        return;
    };

    match TelegramNotifier::new(&tg.api_base, token, chat_id, cfg.home_assistant.timeout()) {
        Ok(notifier) => {
            let message = notify::monthly_report_message(total);
            outcome.telegram_sent = notify::deliver("telegram", notifier.send(&message)).await;
        }
        Err(e) => tracing::warn!(error = %e, "cannot build telegram client"),
    }
}

async fn push_sensor(cfg: &AppConfig, summaries: &[DailySummary]) -> bool {
    let ha = &cfg.home_assistant;
    let (Some(base_url), Some(token)) = (ha.base_url.as_deref(), ha.api_token.as_deref()) else {
        tracing::warn!("home_assistant.api_token missing, sensor not updated");
        return false;
    };

    let total: f64 = summaries.iter().map(|s| s.charged_kwh).sum();
    match HaSensorPublisher::new(
        base_url,
        token,
        &ha.sensor_entity_id,
        &ha.sensor_friendly_name,
        ha.timeout(),
    ) {
        Ok(publisher) => notify::deliver("home_assistant", publisher.publish(total)).await,
        Err(e) => {
            tracing::warn!(error = %e, "cannot build Home Assistant client");
            false
        }
    }
}
