mod daily_summary;
mod energy_record;
mod history_event;
mod window;

pub use daily_summary::DailySummary;
pub use energy_record::EnergyRecord;
pub use history_event::{EventGroup, RawEvent};
pub use window::{parse_date, DateWindow, DATE_FORMAT};
