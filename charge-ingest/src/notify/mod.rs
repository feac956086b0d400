//! Outbound notifications. Delivery is best effort: failures are logged and
//! counted, never retried, and never stop the run.

pub mod ha_sensor;
pub mod telegram;

use std::future::Future;

pub use ha_sensor::HaSensorPublisher;
pub use telegram::TelegramNotifier;

#[derive(thiserror::Error, Debug)]
pub enum NotifyError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{channel} rejected the request with status {status}: {message}")]
    Rejected {
        channel: &'static str,
        status: u16,
        message: String,
    },
}

pub fn monthly_report_message(total_kwh: f64) -> String {
    format!("Total energy charged last month: {total_kwh:.2} kWh")
}

/// Await a notification and log its outcome. Returns whether it was delivered.
pub async fn deliver<F>(channel: &'static str, notification: F) -> bool
where
    F: Future<Output = Result<(), NotifyError>>,
{
    match notification.await {
        Ok(()) => {
            tracing::info!(channel, "notification delivered");
            true
        }
        Err(e) => {
            tracing::warn!(channel, error = %e, "notification failed");
            metrics::counter!("notifications_failed_total", "channel" => channel).increment(1);
            false
        }
    }
}

async fn rejected(channel: &'static str, response: reqwest::Response) -> NotifyError {
    let status = response.status().as_u16();
    let message = response.text().await.unwrap_or_default();
    NotifyError::Rejected {
        channel,
        status,
        message,
    }
}
