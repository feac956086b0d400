use charge_client::domain::{EventGroup, RawEvent, DATE_FORMAT};
use time::{
    format_description::{well_known::Rfc3339, FormatItem},
    macros::format_description,
    Date, OffsetDateTime, PrimitiveDateTime,
};

use crate::pipeline::{Envelope, PipelineError, Transform};

pub const DEFAULT_PRESENCE_ENTITY_ID: &str = "device_tracker.corrosivetesla_location";
pub const DEFAULT_ENERGY_ENTITY_ID: &str = "sensor.corrosivetesla_charge_energy_added";
pub const DEFAULT_HOME_STATE: &str = "home";

const OFFSET_T: &[FormatItem<'static>] = format_description!(
    "[year]-[month]-[day]T[hour]:[minute][optional [:[second][optional [.[subsecond]]]]][offset_hour sign:mandatory][optional [:]][offset_minute]"
);
const OFFSET_SPACE: &[FormatItem<'static>] = format_description!(
    "[year]-[month]-[day] [hour]:[minute][optional [:[second][optional [.[subsecond]]]]][offset_hour sign:mandatory][optional [:]][offset_minute]"
);
const NAIVE_T: &[FormatItem<'static>] = format_description!(
    "[year]-[month]-[day]T[hour]:[minute][optional [:[second][optional [.[subsecond]]]]]"
);
const NAIVE_SPACE: &[FormatItem<'static>] = format_description!(
    "[year]-[month]-[day] [hour]:[minute][optional [:[second][optional [.[subsecond]]]]]"
);

/// Calendar date of an ISO-8601 timestamp, in the timestamp's own offset.
///
/// Accepts RFC 3339, minute or second precision with a `Z` or numeric offset
/// (colon optional), naive date-times with a `T` or space separator, and bare
/// dates. Anything else is `None`.
pub fn extract_date(raw: &str) -> Option<Date> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(ts) = OffsetDateTime::parse(s, &Rfc3339) {
        return Some(ts.date());
    }

    let utc;
    let s = match s.strip_suffix(['Z', 'z']) {
        Some(rest) => {
            utc = format!("{rest}+00:00");
            utc.as_str()
        }
        None => s,
    };

    for format in [OFFSET_T, OFFSET_SPACE] {
        if let Ok(ts) = OffsetDateTime::parse(s, format) {
            return Some(ts.date());
        }
    }
    for format in [NAIVE_T, NAIVE_SPACE] {
        if let Ok(ts) = PrimitiveDateTime::parse(s, format) {
            return Some(ts.date());
        }
    }
    Date::parse(s, DATE_FORMAT).ok()
}

/// Typed reading extracted from one [`RawEvent`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Observation {
    Presence { date: Date, is_home: bool },
    Energy { date: Date, kwh: f64 },
}

impl Observation {
    pub fn date(&self) -> Date {
        match self {
            Self::Presence { date, .. } | Self::Energy { date, .. } => *date,
        }
    }
}

/// Classifies history events into presence and energy observations.
#[derive(Debug, Clone)]
pub struct EventNormalizer {
    presence_entity_id: String,
    energy_entity_id: String,
    home_state: String,
}

impl Default for EventNormalizer {
    fn default() -> Self {
        Self::new(DEFAULT_PRESENCE_ENTITY_ID, DEFAULT_ENERGY_ENTITY_ID)
    }
}

impl EventNormalizer {
    pub fn new(presence_entity_id: impl Into<String>, energy_entity_id: impl Into<String>) -> Self {
        Self {
            presence_entity_id: presence_entity_id.into(),
            energy_entity_id: energy_entity_id.into(),
            home_state: DEFAULT_HOME_STATE.to_string(),
        }
    }

    pub fn with_home_state(mut self, home_state: impl Into<String>) -> Self {
        self.home_state = home_state.into();
        self
    }

    /// `None` means the event is skipped: unknown entity, no usable
    /// timestamp, or a non-numeric energy reading.
    pub fn normalize_event(&self, event: &RawEvent) -> Option<Observation> {
        let is_presence = event.entity_id == self.presence_entity_id;
        let is_energy = event.entity_id == self.energy_entity_id;
        if !is_presence && !is_energy {
            tracing::trace!(entity_id = %event.entity_id, "ignoring unrelated entity");
            return None;
        }

        let Some(date) = event.observed_at().and_then(extract_date) else {
            tracing::debug!(
                entity_id = %event.entity_id,
                observed_at = ?event.observed_at(),
                "dropping event without a usable timestamp"
            );
            metrics::counter!("observations_dropped_total", "reason" => "timestamp").increment(1);
            return None;
        };

        if is_presence {
            return Some(Observation::Presence {
                date,
                is_home: event.state == self.home_state,
            });
        }

        match event.state.trim().parse::<f64>() {
            Ok(kwh) if kwh.is_finite() => Some(Observation::Energy { date, kwh }),
            _ => {
                tracing::debug!(state = %event.state, %date, "dropping non-numeric energy reading");
                metrics::counter!("observations_dropped_total", "reason" => "energy_value").increment(1);
                None
            }
        }
    }

    pub fn normalize_group(&self, group: &[RawEvent]) -> Vec<Observation> {
        group.iter().filter_map(|e| self.normalize_event(e)).collect()
    }
}

#[async_trait::async_trait]
impl Transform<EventGroup, Vec<Observation>> for EventNormalizer {
    async fn apply(
        &self,
        input: Envelope<EventGroup>,
    ) -> Result<Envelope<Vec<Observation>>, PipelineError> {
        Ok(input.map(|group| self.normalize_group(&group)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn extract_date_handles_utc_marker_and_fraction() {
        assert_eq!(extract_date("2024-05-01T10:00:00Z"), Some(date!(2024 - 05 - 01)));
        assert_eq!(
            extract_date("2024-05-01T23:59:59.123456+00:00"),
            Some(date!(2024 - 05 - 01))
        );
    }

    #[test]
    fn extract_date_keeps_embedded_offset() {
        // 23:30 at -05:00 is already the next day in UTC; the local date wins.
        assert_eq!(extract_date("2024-05-01T23:30:00-05:00"), Some(date!(2024 - 05 - 01)));
        assert_eq!(extract_date("2024-05-01T00:30:00+0200"), Some(date!(2024 - 05 - 01)));
    }

    #[test]
    fn extract_date_accepts_naive_and_date_only() {
        assert_eq!(extract_date("2024-05-01T10:00:00"), Some(date!(2024 - 05 - 01)));
        assert_eq!(extract_date("2024-05-01 10:00:00.5"), Some(date!(2024 - 05 - 01)));
        assert_eq!(extract_date("2024-05-01"), Some(date!(2024 - 05 - 01)));
    }

    #[test]
    fn extract_date_accepts_minute_precision() {
        assert_eq!(extract_date("2024-05-01T10:00Z"), Some(date!(2024 - 05 - 01)));
        assert_eq!(extract_date("2024-05-01T23:45-04:00"), Some(date!(2024 - 05 - 01)));
        assert_eq!(extract_date("2024-05-01 10:00+0100"), Some(date!(2024 - 05 - 01)));
        assert_eq!(extract_date("2024-05-01T10:00"), Some(date!(2024 - 05 - 01)));
        assert_eq!(extract_date("2024-05-01 10:00:30Z"), Some(date!(2024 - 05 - 01)));
    }

    #[test]
    fn extract_date_fails_softly() {
        assert_eq!(extract_date(""), None);
        assert_eq!(extract_date("   "), None);
        assert_eq!(extract_date("yesterday"), None);
        assert_eq!(extract_date("2024-13-01T00:00:00Z"), None);
    }

    #[test]
    fn presence_event_reports_home_flag() {
        let n = EventNormalizer::default();
        let home = RawEvent::new(DEFAULT_PRESENCE_ENTITY_ID, "home", "2024-05-01T10:00:00Z");
        let away = RawEvent::new(DEFAULT_PRESENCE_ENTITY_ID, "not_home", "2024-05-01T11:00:00Z");

        assert_eq!(
            n.normalize_event(&home),
            Some(Observation::Presence { date: date!(2024 - 05 - 01), is_home: true })
        );
        assert_eq!(
            n.normalize_event(&away),
            Some(Observation::Presence { date: date!(2024 - 05 - 01), is_home: false })
        );
    }

    #[test]
    fn energy_event_parses_value() {
        let n = EventNormalizer::default();
        let ev = RawEvent::new(DEFAULT_ENERGY_ENTITY_ID, " 5.2 ", "2024-05-01T12:00:00Z");
        assert_eq!(
            n.normalize_event(&ev),
            Some(Observation::Energy { date: date!(2024 - 05 - 01), kwh: 5.2 })
        );
    }

    #[test]
    fn unusable_events_are_dropped() {
        let n = EventNormalizer::default();
        let cases = [
            RawEvent::new(DEFAULT_ENERGY_ENTITY_ID, "N/A", "2024-05-01T12:00:00Z"),
            RawEvent::new(DEFAULT_ENERGY_ENTITY_ID, "unavailable", "2024-05-01T12:00:00Z"),
            RawEvent::new(DEFAULT_ENERGY_ENTITY_ID, "NaN", "2024-05-01T12:00:00Z"),
            RawEvent::new(DEFAULT_ENERGY_ENTITY_ID, "3.0", "garbage"),
            RawEvent::new(DEFAULT_PRESENCE_ENTITY_ID, "home", ""),
            RawEvent::new("sensor.outdoor_temperature", "21.5", "2024-05-01T12:00:00Z"),
            RawEvent {
                entity_id: DEFAULT_ENERGY_ENTITY_ID.to_string(),
                state: "1.0".to_string(),
                ..RawEvent::default()
            },
        ];

        for ev in &cases {
            assert_eq!(n.normalize_event(ev), None, "{ev:?}");
        }
    }

    #[test]
    fn custom_entities_and_home_state() {
        let n = EventNormalizer::new("person.alex", "sensor.wallbox_added").with_home_state("garage");
        let group = vec![
            RawEvent::new("person.alex", "garage", "2024-06-01T07:00:00Z"),
            RawEvent::new("sensor.wallbox_added", "2", "2024-06-01T08:00:00Z"),
            RawEvent::new(DEFAULT_PRESENCE_ENTITY_ID, "home", "2024-06-01T08:00:00Z"),
        ];

        assert_eq!(
            n.normalize_group(&group),
            vec![
                Observation::Presence { date: date!(2024 - 06 - 01), is_home: true },
                Observation::Energy { date: date!(2024 - 06 - 01), kwh: 2.0 },
            ]
        );
    }

    #[tokio::test]
    async fn transform_keeps_envelope_timestamp() {
        let n = EventNormalizer::default();
        let env = Envelope::new(vec![RawEvent::new(
            DEFAULT_ENERGY_ENTITY_ID,
            "1.25",
            "2024-05-01T12:00:00Z",
        )]);
        let received_at = env.received_at;

        let out = n.apply(env).await.unwrap();
        assert_eq!(out.received_at, received_at);
        assert_eq!(out.payload.len(), 1);
    }
}
