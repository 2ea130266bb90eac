//! Daily time tables.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::time::{Boundary, ClockTime};

/// One time per boundary. Having a field per boundary keeps the table at
/// exactly five entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timings {
    pub pre_dawn: ClockTime,
    pub dawn: ClockTime,
    pub midday: ClockTime,
    pub sunset: ClockTime,
    pub midnight: ClockTime,
}

impl Timings {
    pub fn get(&self, boundary: Boundary) -> ClockTime {
        match boundary {
            Boundary::PreDawn => self.pre_dawn,
            Boundary::Dawn => self.dawn,
            Boundary::Midday => self.midday,
            Boundary::Sunset => self.sunset,
            Boundary::Midnight => self.midnight,
        }
    }

    pub fn set(&mut self, boundary: Boundary, time: ClockTime) {
        match boundary {
            Boundary::PreDawn => self.pre_dawn = time,
            Boundary::Dawn => self.dawn = time,
            Boundary::Midday => self.midday = time,
            Boundary::Sunset => self.sunset = time,
            Boundary::Midnight => self.midnight = time,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Boundary, ClockTime)> + '_ {
        Boundary::ALL.into_iter().map(move |b| (b, self.get(b)))
    }

    /// Times are non-decreasing in boundary order, except that midnight may
    /// wrap past 00:00.
    pub fn is_ordered(&self) -> bool {
        let day = [self.pre_dawn, self.dawn, self.midday, self.sunset];
        let ordered = day.windows(2).all(|w| w[0] <= w[1]);
        ordered && (self.midnight >= self.sunset || self.midnight < self.pre_dawn)
    }

    /// Plausible tropical times used when the service is unreachable.
    pub fn fallback() -> Self {
        Self {
            pre_dawn: ClockTime::from_minutes(4 * 60 + 30),
            dawn: ClockTime::from_minutes(4 * 60 + 40),
            midday: ClockTime::from_minutes(12 * 60),
            sunset: ClockTime::from_minutes(18 * 60),
            midnight: ClockTime::from_minutes(23 * 60 + 20),
        }
    }
}

/// Provider times for one date, before any user adjustment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyTimeTable {
    pub date: NaiveDate,
    pub timings: Timings,
}

impl DailyTimeTable {
    pub fn new(date: NaiveDate, timings: Timings) -> Self {
        Self { date, timings }
    }

    pub fn fallback(date: NaiveDate) -> Self {
        Self::new(date, Timings::fallback())
    }

    pub fn time(&self, boundary: Boundary) -> ClockTime {
        self.timings.get(boundary)
    }
}
