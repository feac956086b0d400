use std::str::FromStr;

use charge_client::{
    db::{upsert_summary, EnergyStore, UpsertOutcome},
    domain::DailySummary,
};
use serde::Deserialize;
use time::Date;

use crate::pipeline::Sink;

/// How many summaries share one transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitMode {
    /// One transaction per date; a failing date does not affect the others.
    #[default]
    PerDate,
    /// One transaction for the whole run; any failure rolls everything back.
    Batch,
}

impl FromStr for CommitMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "per_date" => Ok(Self::PerDate),
            "batch" => Ok(Self::Batch),
            other => Err(format!("unknown commit mode '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FailedDate {
    pub date: Date,
    pub reason: String,
}

/// Outcome of one upsert call, date by date.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpsertReport {
    pub inserted: Vec<Date>,
    pub updated: Vec<Date>,
    pub failed: Vec<FailedDate>,
}

impl UpsertReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn persisted(&self) -> usize {
        self.inserted.len() + self.updated.len()
    }

    fn record(&mut self, date: Date, outcome: UpsertOutcome) {
        match outcome {
            UpsertOutcome::Inserted => self.inserted.push(date),
            UpsertOutcome::Updated => self.updated.push(date),
        }
    }

    fn fail(&mut self, date: Date, reason: String) {
        self.failed.push(FailedDate { date, reason });
    }
}

/// Writes daily summaries into `energy_data`, updating dates already stored.
pub struct EnergyDbSink {
    store: EnergyStore,
    commit_mode: CommitMode,
}

impl EnergyDbSink {
    pub fn new(store: EnergyStore, commit_mode: CommitMode) -> Self {
        Self { store, commit_mode }
    }

    pub fn store(&self) -> &EnergyStore {
        &self.store
    }

    /// Upsert `summaries` in order. Never fails as a whole; see the report.
    pub async fn upsert(&self, summaries: &[DailySummary]) -> UpsertReport {
        let report = match self.commit_mode {
            CommitMode::PerDate => self.upsert_per_date(summaries).await,
            CommitMode::Batch => self.upsert_batch(summaries).await,
        };

        metrics::counter!("energy_rows_inserted_total").increment(report.inserted.len() as u64);
        metrics::counter!("energy_rows_updated_total").increment(report.updated.len() as u64);
        metrics::counter!("energy_upsert_failures_total").increment(report.failed.len() as u64);

        tracing::info!(
            inserted = report.inserted.len(),
            updated = report.updated.len(),
            failed = report.failed.len(),
            commit_mode = ?self.commit_mode,
            "energy summaries persisted"
        );
        report
    }

    async fn upsert_per_date(&self, summaries: &[DailySummary]) -> UpsertReport {
        let mut report = UpsertReport::default();

        for summary in summaries {
            match self.upsert_one(summary).await {
                Ok(outcome) => report.record(summary.date, outcome),
                Err(e) => {
                    tracing::warn!(error = %e, date = %summary.date, "energy upsert failed for date");
                    report.fail(summary.date, e.to_string());
                }
            }
        }

        report
    }

    async fn upsert_one(&self, summary: &DailySummary) -> Result<UpsertOutcome, sqlx::Error> {
        let mut tx = self.store.pool().begin().await?;
        let outcome = upsert_summary(&mut tx, summary).await?;
        tx.commit().await?;
        Ok(outcome)
    }

    async fn upsert_batch(&self, summaries: &[DailySummary]) -> UpsertReport {
        let mut report = UpsertReport::default();
        if summaries.is_empty() {
            return report;
        }

        match self.try_batch(summaries).await {
            Ok(outcomes) => {
                for (summary, outcome) in summaries.iter().zip(outcomes) {
                    report.record(summary.date, outcome);
                }
            }
            Err((culprit, e)) => {
                tracing::error!(error = %e, culprit = ?culprit, "energy batch upsert rolled back");
                for summary in summaries {
                    let reason = match culprit {
                        Some(date) if date == summary.date => e.to_string(),
                        Some(date) => format!("rolled back after {date} failed: {e}"),
                        None => format!("rolled back: {e}"),
                    };
                    report.fail(summary.date, reason);
                }
            }
        }

        report
    }

    async fn try_batch(
        &self,
        summaries: &[DailySummary],
    ) -> Result<Vec<UpsertOutcome>, (Option<Date>, sqlx::Error)> {
        let mut tx = self.store.pool().begin().await.map_err(|e| (None, e))?;

        let mut outcomes = Vec::with_capacity(summaries.len());
        for summary in summaries {
            let outcome = upsert_summary(&mut tx, summary)
                .await
                .map_err(|e| (Some(summary.date), e))?;
            outcomes.push(outcome);
        }

        tx.commit().await.map_err(|e| (None, e))?;
        Ok(outcomes)
    }
}

#[async_trait::async_trait]
impl Sink<DailySummary> for EnergyDbSink {
    type Report = UpsertReport;

    async fn write(&self, items: &[DailySummary]) -> UpsertReport {
        self.upsert(items).await
    }
}
