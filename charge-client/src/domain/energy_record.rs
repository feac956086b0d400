use time::Date;

/// Row of the `energy_data` table.
///
/// `at_home` is fixed when the row is first inserted. Later upserts for the
/// same date only overwrite `charged_kwh`.
#[derive(Debug, Clone, PartialEq)]
pub struct EnergyRecord {
    pub date: Date,
    pub charged_kwh: f64,
    pub at_home: bool,
}
