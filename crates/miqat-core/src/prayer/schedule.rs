//! Adjusted daily schedule and next-boundary lookup.
//!
//! Pre-dawn, dawn, midday and sunset are shifted by their own offset.
//! Midnight is not taken from the provider: it is the floor of the midpoint
//! between adjusted sunset and the following adjusted dawn, then shifted by
//! the midnight offset.

use std::sync::Arc;

use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::adjustments::{AdjustmentSet, AdjustmentStore};
use super::provider::{PrayerTimeProvider, ProviderOutcome};
use super::table::{DailyTimeTable, Timings};
use super::time::{Boundary, ClockTime, MINUTES_PER_DAY};
use crate::error::StorageError;
use crate::geo::Coordinate;

/// Boundaries the countdown targets, in daily order.
const COUNTDOWN_ORDER: [Boundary; 3] = [Boundary::Dawn, Boundary::Midday, Boundary::Sunset];

/// A day's times after user adjustments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjustedTimeTable {
    pub date: NaiveDate,
    pub timings: Timings,
    pub raw: Timings,
    pub adjustments: AdjustmentSet,
    /// True when the provider was unreachable and `raw` is the built-in table.
    pub fallback: bool,
}

impl AdjustedTimeTable {
    pub fn from_raw(raw: &DailyTimeTable, adjustments: AdjustmentSet, fallback: bool) -> Self {
        Self {
            date: raw.date,
            timings: adjust(&raw.timings, &adjustments),
            raw: raw.timings,
            adjustments,
            fallback,
        }
    }

    pub fn time(&self, boundary: Boundary) -> ClockTime {
        self.timings.get(boundary)
    }
}

/// The next boundary the countdown is heading for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NextBoundary {
    pub boundary: Boundary,
    pub time: ClockTime,
    pub target: NaiveDateTime,
}

impl NextBoundary {
    /// Time left until the target; negative once it has passed.
    pub fn remaining(&self, now: NaiveDateTime) -> Duration {
        self.target - now
    }
}

/// Apply offsets to a raw table.
pub fn adjust(raw: &Timings, adjustments: &AdjustmentSet) -> Timings {
    let shifted = |b: Boundary| raw.get(b).shift(adjustments.get(b));
    let dawn = shifted(Boundary::Dawn);
    let sunset = shifted(Boundary::Sunset);
    Timings {
        pre_dawn: shifted(Boundary::PreDawn),
        dawn,
        midday: shifted(Boundary::Midday),
        sunset,
        midnight: solar_midnight(sunset, dawn, adjustments.get(Boundary::Midnight)),
    }
}

/// Floor of the midpoint between `sunset` and the next `dawn`, plus `offset`.
pub fn solar_midnight(sunset: ClockTime, dawn: ClockTime, offset: i32) -> ClockTime {
    let sunset_min = sunset.minutes();
    let mut dawn_min = dawn.minutes();
    if dawn_min < sunset_min {
        dawn_min += MINUTES_PER_DAY;
    }
    let midpoint = (sunset_min + dawn_min).div_euclid(2);
    ClockTime::from_minutes(midpoint + offset)
}

/// The first of dawn, midday, sunset strictly after `now`'s minute, today;
/// otherwise tomorrow's dawn.
pub fn find_next(table: &AdjustedTimeTable, now: NaiveDateTime) -> NextBoundary {
    let now_min = ClockTime::of(now).minutes();
    let today = now.date();
    for boundary in COUNTDOWN_ORDER {
        let time = table.time(boundary);
        if time.minutes() > now_min {
            return NextBoundary {
                boundary,
                time,
                target: time.on(today),
            };
        }
    }
    let dawn = table.time(Boundary::Dawn);
    NextBoundary {
        boundary: Boundary::Dawn,
        time: dawn,
        target: dawn.on(today + Duration::days(1)),
    }
}

/// Builds adjusted tables from the provider and the user's offsets.
#[derive(Clone)]
pub struct PrayerSchedule {
    provider: Arc<dyn PrayerTimeProvider>,
    adjustments: AdjustmentStore,
}

impl PrayerSchedule {
    pub fn new(provider: Arc<dyn PrayerTimeProvider>, adjustments: AdjustmentStore) -> Self {
        Self {
            provider,
            adjustments,
        }
    }

    pub fn adjustments(&self) -> &AdjustmentStore {
        &self.adjustments
    }

    pub async fn build(
        &self,
        date: NaiveDate,
        at: Coordinate,
    ) -> Result<AdjustedTimeTable, StorageError> {
        let outcome = self.provider.fetch(date, at).await;
        let fallback = matches!(outcome, ProviderOutcome::Fallback { .. });
        let raw = outcome.into_table();
        let adjustments = self.adjustments.load()?;
        let table = AdjustedTimeTable::from_raw(&raw, adjustments, fallback);
        tracing::debug!(%date, fallback, "schedule built");
        Ok(table)
    }
}
