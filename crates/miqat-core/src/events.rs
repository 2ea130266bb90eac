use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::geo::Resolution;
use crate::prayer::{Boundary, NextBoundary};

/// Every state change in the system produces an Event.
/// Front ends render them; the CLI prints them as JSON lines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    LocationResolved {
        resolution: Resolution,
        at: NaiveDateTime,
    },
    ScheduleBuilt {
        date: NaiveDate,
        fallback: bool,
        at: NaiveDateTime,
    },
    /// Countdown started or restarted toward a boundary.
    CountdownStarted {
        next: NextBoundary,
        generation: u64,
        at: NaiveDateTime,
    },
    CountdownTick {
        boundary: Boundary,
        remaining_secs: i64,
        display: String,
        at: NaiveDateTime,
    },
    BoundaryArrived {
        boundary: Boundary,
        target: NaiveDateTime,
        at: NaiveDateTime,
    },
    /// Stored target no longer matched the clock or table and was replaced.
    CountdownRetargeted {
        from: NextBoundary,
        to: NextBoundary,
        at: NaiveDateTime,
    },
    AlarmScheduled {
        boundary: Boundary,
        fire_at: NaiveDateTime,
        at: NaiveDateTime,
    },
    AlarmFired {
        boundary: Boundary,
        delivered: bool,
        at: NaiveDateTime,
    },
    /// Alarm came due but had been disabled in the meantime.
    AlarmSkipped {
        boundary: Boundary,
        at: NaiveDateTime,
    },
    /// Notification could not be shown; front ends show this as a toast.
    NotificationSuppressed {
        tag: String,
        reason: String,
        at: NaiveDateTime,
    },
}
