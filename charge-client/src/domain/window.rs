use std::fmt;

use time::{format_description::FormatItem, macros::format_description, Date};

/// Calendar-date format used for storage and CLI arguments.
pub const DATE_FORMAT: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");

pub fn parse_date(s: &str) -> Result<Date, time::error::Parse> {
    Date::parse(s.trim(), DATE_FORMAT)
}

/// Closed date interval `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub start: Date,
    pub end: Date,
}

impl DateWindow {
    pub fn new(start: Date, end: Date) -> Self {
        Self { start, end }
    }

    /// First to last day of the calendar month preceding `today`.
    ///
    /// Returns `None` only when `today` falls in the first representable month.
    pub fn previous_month(today: Date) -> Option<Self> {
        let end = today.replace_day(1).ok()?.previous_day()?;
        let start = end.replace_day(1).ok()?;
        Some(Self { start, end })
    }
}

impl fmt::Display for DateWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..={}", self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn previous_month_on_first_of_january_is_prior_december() {
        let w = DateWindow::previous_month(date!(2025 - 01 - 01)).unwrap();
        assert_eq!(w.start, date!(2024 - 12 - 01));
        assert_eq!(w.end, date!(2024 - 12 - 31));
    }

    #[test]
    fn previous_month_handles_leap_february() {
        let w = DateWindow::previous_month(date!(2024 - 03 - 17)).unwrap();
        assert_eq!(w.start, date!(2024 - 02 - 01));
        assert_eq!(w.end, date!(2024 - 02 - 29));
    }

    #[test]
    fn parse_date_accepts_iso_calendar_dates() {
        assert_eq!(parse_date(" 2024-05-01 ").unwrap(), date!(2024 - 05 - 01));
        assert!(parse_date("2024-5-1").is_err());
    }
}
