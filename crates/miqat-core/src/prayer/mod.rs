//! Prayer boundaries, provider tables, user adjustments and alarm flags.

pub mod adjustments;
pub mod alarms;
pub mod provider;
pub mod schedule;
pub mod table;
pub mod time;

pub use adjustments::{AdjustmentSet, AdjustmentStore, ADJUSTMENT_RANGE};
pub use alarms::{AlarmSet, AlarmStore};
pub use provider::{AladhanProvider, CachingProvider, PrayerTimeProvider, ProviderOutcome};
pub use schedule::{adjust, find_next, solar_midnight, AdjustedTimeTable, NextBoundary, PrayerSchedule};
pub use table::{DailyTimeTable, Timings};
pub use time::{Boundary, ClockTime, MINUTES_PER_DAY};
