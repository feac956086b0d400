pub mod energy_db;

pub use energy_db::{CommitMode, EnergyDbSink, FailedDate, UpsertReport};
