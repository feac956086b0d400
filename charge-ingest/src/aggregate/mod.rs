//! Per-day folding of observations.

use std::collections::BTreeMap;

use charge_client::domain::DailySummary;
use time::Date;

use crate::transform::Observation;

/// Accumulated state for one calendar date.
#[derive(Debug, Clone, PartialEq)]
pub struct DayTotals {
    /// Set once any presence observation for the date said "home". Never cleared.
    pub at_home: bool,
    /// Every energy reading for the date, kept in ascending order so the total
    /// does not depend on arrival order.
    readings: Vec<f64>,
}

impl Default for DayTotals {
    fn default() -> Self {
        Self {
            at_home: false,
            readings: Vec::new(),
        }
    }
}

impl DayTotals {
    fn add_reading(&mut self, kwh: f64) {
        let at = self.readings.partition_point(|r| r.total_cmp(&kwh).is_le());
        self.readings.insert(at, kwh);
    }

    /// Sum of every energy reading for the date, as reported.
    pub fn charged_kwh(&self) -> f64 {
        self.readings.iter().fold(0.0, |total, kwh| total + kwh)
    }
}

/// Date-keyed totals for one run.
///
/// Energy readings are summed, not differenced. A sensor that reports a
/// running counter would be counted more than once per day.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DailyLedger {
    days: BTreeMap<Date, DayTotals>,
}

impl DailyLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn day_mut(&mut self, date: Date) -> &mut DayTotals {
        self.days.entry(date).or_insert_with(DayTotals::default)
    }

    pub fn observe(&mut self, observation: Observation) {
        match observation {
            Observation::Energy { date, kwh } => self.day_mut(date).add_reading(kwh),
            Observation::Presence { date, is_home: true } => self.day_mut(date).at_home = true,
            Observation::Presence { is_home: false, .. } => {}
        }
    }

    pub fn fold<I>(&mut self, observations: I)
    where
        I: IntoIterator<Item = Observation>,
    {
        for observation in observations {
            self.observe(observation);
        }
    }

    pub fn get(&self, date: Date) -> Option<&DayTotals> {
        self.days.get(&date)
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    /// Dates the car was at home, ascending, with the energy added that day.
    ///
    /// Dates with energy but no "home" observation are left out on purpose.
    pub fn summaries(&self) -> Vec<DailySummary> {
        self.days
            .iter()
            .filter(|(_, totals)| totals.at_home)
            .map(|(date, totals)| DailySummary::new(*date, totals.charged_kwh()))
            .collect()
    }
}
