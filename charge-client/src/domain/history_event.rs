use serde::{Deserialize, Deserializer};

/// One state change as returned by the Home Assistant history endpoint.
///
/// Deserialization is lenient: a missing or non-string field never fails the
/// whole response, it just leaves the event unusable for the normalizer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RawEvent {
    #[serde(default, deserialize_with = "lenient_string")]
    pub entity_id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub state: String,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub last_reported: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub last_updated: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub last_changed: Option<String>,
}

impl RawEvent {
    pub fn new(entity_id: &str, state: &str, last_reported: &str) -> Self {
        Self {
            entity_id: entity_id.to_string(),
            state: state.to_string(),
            last_reported: Some(last_reported.to_string()),
            ..Self::default()
        }
    }

    /// Timestamp the event was observed at. Older history payloads carry no
    /// `last_reported`, so fall back to `last_updated`, then `last_changed`.
    pub fn observed_at(&self) -> Option<&str> {
        self.last_reported
            .as_deref()
            .or(self.last_updated.as_deref())
            .or(self.last_changed.as_deref())
    }
}

/// One inner array of the history response.
pub type EventGroup = Vec<RawEvent>;

fn lenient_opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| match v {
        serde_json::Value::String(s) => Some(s),
        _ => None,
    }))
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_opt_string(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_history_response_shape() {
        let body = r#"[
            [
                {"entity_id": "device_tracker.car", "state": "home",
                 "attributes": {"source_type": "gps"},
                 "last_changed": "2024-05-01T09:00:00+00:00",
                 "last_reported": "2024-05-01T10:00:00.123456+00:00",
                 "last_updated": "2024-05-01T09:30:00+00:00"}
            ],
            [
                {"entity_id": "sensor.energy", "state": "5.2", "last_reported": null},
                {"entity_id": "sensor.energy", "state": 3.1, "last_reported": 1714557600}
            ]
        ]"#;

        let groups: Vec<EventGroup> = serde_json::from_str(body).unwrap();
        assert_eq!(groups.len(), 2);

        let tracker = &groups[0][0];
        assert_eq!(tracker.entity_id, "device_tracker.car");
        assert_eq!(tracker.observed_at(), Some("2024-05-01T10:00:00.123456+00:00"));

        // non-string values degrade to empty/absent instead of failing the batch
        let numeric = &groups[1][1];
        assert_eq!(numeric.state, "");
        assert_eq!(numeric.last_reported, None);
        assert_eq!(numeric.observed_at(), None);
    }

    #[test]
    fn observed_at_falls_back_to_last_updated() {
        let ev: RawEvent = serde_json::from_str(
            r#"{"entity_id": "x", "state": "home", "last_updated": "2024-05-02T00:00:00Z",
                "last_changed": "2024-05-01T00:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(ev.observed_at(), Some("2024-05-02T00:00:00Z"));
    }
}
