use std::time::Duration;

use reqwest::Client;
use serde_json::json;

use super::{rejected, NotifyError};

pub const DEFAULT_SENSOR_ENTITY_ID: &str = "sensor.corrosivetesla_charged_at_home";
pub const DEFAULT_SENSOR_FRIENDLY_NAME: &str = "CorrosiveTesla Charged At Home (kWh)";

/// Publishes a kWh figure as the state of a Home Assistant sensor.
#[derive(Clone)]
pub struct HaSensorPublisher {
    client: Client,
    base_url: String,
    token: String,
    entity_id: String,
    friendly_name: String,
}

impl HaSensorPublisher {
    pub fn new(
        base_url: &str,
        token: impl Into<String>,
        entity_id: impl Into<String>,
        friendly_name: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, NotifyError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.into(),
            entity_id: entity_id.into(),
            friendly_name: friendly_name.into(),
        })
    }

    pub async fn publish(&self, kwh: f64) -> Result<(), NotifyError> {
        let url = format!("{}/api/states/{}", self.base_url, self.entity_id);
        let payload = json!({
            "state": kwh,
            "attributes": {
                "unit_of_measurement": "kWh",
                "friendly_name": self.friendly_name,
            }
        });

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(rejected("home_assistant", response).await);
        }

        tracing::info!(entity_id = %self.entity_id, kwh, "sensor state pushed");
        Ok(())
    }
}
