use std::time::Duration;

use reqwest::Client;
use serde_json::json;

use super::{rejected, NotifyError};

pub const DEFAULT_API_BASE: &str = "https://api.telegram.org";

/// Sends plain-text messages to one chat through the Bot API.
#[derive(Clone)]
pub struct TelegramNotifier {
    client: Client,
    api_base: String,
    token: String,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn new(
        api_base: &str,
        token: impl Into<String>,
        chat_id: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, NotifyError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            token: token.into(),
            chat_id: chat_id.into(),
        })
    }

    pub async fn send(&self, text: &str) -> Result<(), NotifyError> {
        let url = format!("{}/bot{}/sendMessage", self.api_base, self.token);
        let response = self
            .client
            .post(&url)
            .json(&json!({ "chat_id": self.chat_id, "text": text }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(rejected("telegram", response).await);
        }

        tracing::debug!(chat_id = %self.chat_id, "telegram message sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    #[tokio::test]
    async fn posts_message_to_chat() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/botT0KEN/sendMessage")
            .match_body(Matcher::Json(json!({
                "chat_id": "42",
                "text": "Total energy charged last month: 10.00 kWh"
            })))
            .with_status(200)
            .with_body(r#"{"ok": true}"#)
            .create_async()
            .await;

        let notifier =
            TelegramNotifier::new(&server.url(), "T0KEN", "42", Duration::from_secs(5)).unwrap();
        notifier
            .send("Total energy charged last month: 10.00 kWh")
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn rejected_request_is_an_error() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/botbad/sendMessage")
            .with_status(400)
            .with_body(r#"{"ok": false, "description": "chat not found"}"#)
            .create_async()
            .await;

        let notifier =
            TelegramNotifier::new(&server.url(), "bad", "1", Duration::from_secs(5)).unwrap();
        let err = notifier.send("hi").await.unwrap_err();

        assert!(matches!(err, NotifyError::Rejected { status: 400, .. }));
    }
}
