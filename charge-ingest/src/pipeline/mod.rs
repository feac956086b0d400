use std::{pin::Pin, time::SystemTime};

use charge_client::domain::{DailySummary, EventGroup};
use futures::{Stream, StreamExt};

use crate::{aggregate::DailyLedger, transform::Observation};

#[derive(Debug, Clone)]
pub struct Envelope<T> {
    pub payload: T,
    pub received_at: SystemTime,
}

impl<T> Envelope<T> {
    pub fn new(payload: T) -> Self {
        Self {
            payload,
            received_at: SystemTime::now(),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Envelope<U> {
        Envelope {
            payload: f(self.payload),
            received_at: self.received_at,
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error("source error: {0}")]
    Source(String),
}

pub type EnvelopeStream<T> = Pin<Box<dyn Stream<Item = Result<Envelope<T>, PipelineError>> + Send>>;

#[async_trait::async_trait]
pub trait Source<T>: Send + Sync {
    async fn stream(&self) -> EnvelopeStream<T>;
}

#[async_trait::async_trait]
pub trait Transform<I, O>: Send + Sync {
    async fn apply(&self, input: Envelope<I>) -> Result<Envelope<O>, PipelineError>;
}

/// Terminal stage. Failures are carried in the report so one bad item never
/// hides the outcome of the others.
#[async_trait::async_trait]
pub trait Sink<T: Sync>: Send + Sync {
    type Report: Send;

    async fn write(&self, items: &[T]) -> Self::Report;
}

/// One fetch window: history groups in, ordered daily summaries out.
pub struct Pipeline<S, N> {
    pub source: S,
    pub normalizer: N,
}

impl<S, N> Pipeline<S, N>
where
    S: Source<EventGroup>,
    N: Transform<EventGroup, Vec<Observation>>,
{
    /// Fold every observation of the window into a ledger.
    ///
    /// Source and transform errors are logged and skipped; a failed fetch
    /// therefore yields an empty ledger.
    pub async fn aggregate(&self) -> DailyLedger {
        let mut stream = self.source.stream().await;
        let mut ledger = DailyLedger::new();
        let mut groups: u64 = 0;

        while let Some(item) = stream.next().await {
            let normalized = match item {
                Ok(env) => self.normalizer.apply(env).await,
                Err(e) => Err(e),
            };

            match normalized {
                Ok(env) => {
                    groups += 1;
                    ledger.fold(env.payload);
                }
                Err(e) => {
                    tracing::error!(error = %e, "error in upstream pipeline, skipping");
                }
            }
        }

        metrics::counter!("history_groups_total").increment(groups);
        tracing::info!(groups, days = ledger.len(), "history aggregated");
        ledger
    }

    pub async fn summarize(&self) -> Vec<DailySummary> {
        self.aggregate().await.summaries()
    }
}
