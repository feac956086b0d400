use serde::{Deserialize, Serialize};
use time::Date;

time::serde::format_description!(iso_date, Date, "[year]-[month]-[day]");

/// Energy added on a day the car was at home.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DailySummary {
    #[serde(with = "iso_date")]
    pub date: Date,
    pub charged_kwh: f64,
}

impl DailySummary {
    pub fn new(date: Date, charged_kwh: f64) -> Self {
        Self { date, charged_kwh }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn serializes_date_as_iso_calendar_date() {
        let s = DailySummary::new(date!(2024 - 05 - 01), 8.5);
        let json = serde_json::to_string(&s).unwrap();
        assert_eq!(json, r#"{"date":"2024-05-01","charged_kwh":8.5}"#);
    }
}
