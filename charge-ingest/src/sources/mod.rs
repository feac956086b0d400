pub mod ha_history;
pub mod history_file;

pub use ha_history::HaHistorySource;
pub use history_file::HistoryFileSource;
