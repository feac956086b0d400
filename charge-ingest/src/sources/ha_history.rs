use std::time::Duration;

use charge_client::domain::EventGroup;
use reqwest::Client;

use crate::pipeline::{Envelope, EnvelopeStream, PipelineError, Source};

/// Pulls one window of state history from Home Assistant.
///
/// The request is made once per [`Source::stream`] call and is not retried.
#[derive(Clone)]
pub struct HaHistorySource {
    client: Client,
    base_url: String,
    token: Option<String>,
    start_date: String,
    entity_ids: Vec<String>,
    end_time: Option<String>,
}

impl HaHistorySource {
    pub fn new(
        base_url: &str,
        token: Option<String>,
        start_date: &str,
        entity_ids: Vec<String>,
        timeout: Duration,
    ) -> Result<Self, PipelineError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PipelineError::Source(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            start_date: start_date.trim().to_string(),
            entity_ids,
            end_time: None,
        })
    }

    pub fn with_end_time(mut self, end_time: Option<String>) -> Self {
        self.end_time = end_time;
        self
    }

    pub fn history_url(&self) -> String {
        let mut url = format!(
            "{}/api/history/period/{}?filter_entity_id={}",
            self.base_url,
            self.start_date,
            self.entity_ids.join(",")
        );
        if let Some(end) = &self.end_time {
            url.push_str("&end_time=");
            url.push_str(&urlencoding::encode(end));
        }
        url
    }
}

async fn fetch_history(
    client: &Client,
    url: &str,
    token: Option<&str>,
) -> Result<Vec<EventGroup>, PipelineError> {
    tracing::debug!(%url, "fetching state history");

    let mut request = client.get(url);
    if let Some(token) = token {
        request = request.bearer_auth(token);
    }

    let response = request
        .send()
        .await
        .map_err(|e| PipelineError::Source(format!("history request failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(PipelineError::Source(format!(
            "history request returned {status}: {body}"
        )));
    }

    let groups: Vec<EventGroup> = response
        .json()
        .await
        .map_err(|e| PipelineError::Source(format!("invalid history payload: {e}")))?;

    tracing::info!(
        groups = groups.len(),
        events = groups.iter().map(Vec::len).sum::<usize>(),
        "fetched state history"
    );
    Ok(groups)
}

#[async_trait::async_trait]
impl Source<EventGroup> for HaHistorySource {
    async fn stream(&self) -> EnvelopeStream<EventGroup> {
        let client = self.client.clone();
        let url = self.history_url();
        let token = self.token.clone();

        let s = async_stream::try_stream! {
            let groups = fetch_history(&client, &url, token.as_deref()).await?;
            for group in groups {
                yield Envelope::new(group);
            }
        };

        Box::pin(s)
    }
}
