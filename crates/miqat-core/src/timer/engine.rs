//! Countdown engine implementation.
//!
//! The countdown engine is a wall-clock-based state machine. It does not use
//! internal threads - the caller is responsible for calling `tick()` once a
//! second with the current time (see [`super::CountdownRunner`]).
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Running -> Arrived -> Running
//! ```
//!
//! Every transition into `Running` bumps the generation. A tick loop that
//! was started for an older generation must stop; that is how "at most one
//! live tick loop" is enforced.

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::events::Event;
use crate::prayer::{find_next, AdjustedTimeTable, NextBoundary};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CountdownState {
    /// No schedule yet.
    #[default]
    Idle,
    Running,
    /// Target reached; waiting for a rebuilt schedule.
    Arrived,
}

/// Hours, minutes and seconds left, rendered as `HH:MM:SS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Remaining {
    pub hours: i64,
    pub minutes: i64,
    pub seconds: i64,
}

impl Remaining {
    pub fn from_duration(d: Duration) -> Self {
        let total = d.num_seconds().max(0);
        Self {
            hours: total / 3600,
            minutes: (total % 3600) / 60,
            seconds: total % 60,
        }
    }

    pub fn total_secs(&self) -> i64 {
        self.hours * 3600 + self.minutes * 60 + self.seconds
    }
}

impl std::fmt::Display for Remaining {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}:{:02}:{:02}", self.hours, self.minutes, self.seconds)
    }
}

/// Result of one tick.
#[derive(Debug, Clone, PartialEq)]
pub enum Tick {
    /// Not running; nothing to render.
    Inactive,
    Counting { next: NextBoundary, remaining: Remaining },
    /// Target reached. The caller must play the arrival alert, rebuild the
    /// schedule and call [`CountdownEngine::rollover`].
    Arrived(NextBoundary),
    /// The stored target was stale and has been replaced; the tick loop
    /// must restart for the new generation.
    Retargeted { from: NextBoundary, to: NextBoundary },
}

/// Core countdown engine.
#[derive(Debug, Clone, Default)]
pub struct CountdownEngine {
    state: CountdownState,
    table: Option<AdjustedTimeTable>,
    next: Option<NextBoundary>,
    generation: u64,
}

impl CountdownEngine {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> CountdownState {
        self.state
    }

    pub fn next(&self) -> Option<&NextBoundary> {
        self.next.as_ref()
    }

    pub fn table(&self) -> Option<&AdjustedTimeTable> {
        self.table.as_ref()
    }

    /// Identifies the tick loop allowed to drive this engine.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn remaining(&self, now: NaiveDateTime) -> Option<Remaining> {
        self.next
            .map(|next| Remaining::from_duration(next.remaining(now)))
    }

    /// Build a snapshot tick event, if running.
    pub fn snapshot(&self, now: NaiveDateTime) -> Option<Event> {
        let next = self.next?;
        if self.state != CountdownState::Running {
            return None;
        }
        let remaining = Remaining::from_duration(next.remaining(now));
        Some(Event::CountdownTick {
            boundary: next.boundary,
            remaining_secs: remaining.total_secs(),
            display: remaining.to_string(),
            at: now,
        })
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Install a (re)built schedule and start counting toward its next
    /// boundary. Valid from any state.
    pub fn set_schedule(&mut self, table: AdjustedTimeTable, now: NaiveDateTime) -> NextBoundary {
        let next = find_next(&table, now);
        self.table = Some(table);
        self.next = Some(next);
        self.state = CountdownState::Running;
        self.generation += 1;
        tracing::debug!(
            boundary = %next.boundary,
            target = %next.target,
            generation = self.generation,
            "countdown running"
        );
        next
    }

    /// Leave `Arrived` with a freshly built schedule.
    pub fn rollover(&mut self, table: AdjustedTimeTable, now: NaiveDateTime) -> NextBoundary {
        let previous = self.next;
        let next = self.set_schedule(table, now);
        tracing::info!(
            from = ?previous.map(|p| p.boundary),
            to = %next.boundary,
            "countdown rolled over"
        );
        next
    }

    /// Call once per second.
    pub fn tick(&mut self, now: NaiveDateTime) -> Tick {
        if self.state != CountdownState::Running {
            return Tick::Inactive;
        }
        let (Some(next), Some(table)) = (self.next, self.table.as_ref()) else {
            return Tick::Inactive;
        };

        let remaining = next.remaining(now);
        if remaining <= Duration::zero() {
            self.state = CountdownState::Arrived;
            tracing::info!(boundary = %next.boundary, "boundary arrived");
            return Tick::Arrived(next);
        }

        // Clock moved backwards, or the table no longer matches the target:
        // re-derive instead of showing a wrong countdown.
        let fresh = find_next(table, now);
        if fresh.target != next.target {
            self.next = Some(fresh);
            self.generation += 1;
            tracing::warn!(
                from = %next.target,
                to = %fresh.target,
                "countdown target was stale, retargeted"
            );
            return Tick::Retargeted {
                from: next,
                to: fresh,
            };
        }

        Tick::Counting {
            next,
            remaining: Remaining::from_duration(remaining),
        }
    }

    /// Back to `Idle`, invalidating any tick loop.
    pub fn stop(&mut self) {
        self.state = CountdownState::Idle;
        self.next = None;
        self.generation += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prayer::{AdjustmentSet, Boundary, ClockTime, DailyTimeTable, Timings};
    use chrono::NaiveDate;

    fn t(s: &str) -> ClockTime {
        s.parse().unwrap()
    }

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 11)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    fn table() -> AdjustedTimeTable {
        let raw = DailyTimeTable::new(
            NaiveDate::from_ymd_opt(2024, 3, 11).unwrap(),
            Timings {
                pre_dawn: t("05:20"),
                dawn: t("05:30"),
                midday: t("12:15"),
                sunset: t("18:00"),
                midnight: t("23:45"),
            },
        );
        AdjustedTimeTable::from_raw(&raw, AdjustmentSet::default(), false)
    }

    #[test]
    fn idle_until_schedule_installed() {
        let mut engine = CountdownEngine::new();
        assert_eq!(engine.state(), CountdownState::Idle);
        assert_eq!(engine.tick(at(13, 0, 0)), Tick::Inactive);

        engine.set_schedule(table(), at(13, 0, 0));
        assert_eq!(engine.state(), CountdownState::Running);
        assert_eq!(engine.generation(), 1);
    }

    #[test]
    fn counts_down_zero_padded() {
        let mut engine = CountdownEngine::new();
        engine.set_schedule(table(), at(13, 0, 0));
        match engine.tick(at(16, 58, 55)) {
            Tick::Counting { next, remaining } => {
                assert_eq!(next.boundary, Boundary::Sunset);
                assert_eq!(remaining.to_string(), "01:01:05");
            }
            other => panic!("expected counting, got {other:?}"),
        }
    }

    #[test]
    fn arrival_then_single_rollover() {
        let mut engine = CountdownEngine::new();
        engine.set_schedule(table(), at(13, 0, 0));
        let before = engine.generation();

        assert!(matches!(engine.tick(at(18, 0, 0)), Tick::Arrived(n) if n.boundary == Boundary::Sunset));
        assert_eq!(engine.state(), CountdownState::Arrived);
        // Further ticks are inert until the rollover happens.
        assert_eq!(engine.tick(at(18, 0, 1)), Tick::Inactive);

        let next = engine.rollover(table(), at(18, 0, 1));
        assert_eq!(next.boundary, Boundary::Dawn);
        assert_eq!(next.target, at(5, 30, 0) + Duration::days(1));
        assert_eq!(engine.generation(), before + 1);
        assert_eq!(engine.state(), CountdownState::Running);
    }

    #[test]
    fn clock_moving_backwards_retargets() {
        let mut engine = CountdownEngine::new();
        engine.set_schedule(table(), at(13, 0, 0));
        let before = engine.generation();

        match engine.tick(at(9, 0, 0)) {
            Tick::Retargeted { from, to } => {
                assert_eq!(from.boundary, Boundary::Sunset);
                assert_eq!(to.boundary, Boundary::Midday);
            }
            other => panic!("expected retarget, got {other:?}"),
        }
        assert_eq!(engine.generation(), before + 1);
        assert!(matches!(engine.tick(at(9, 0, 1)), Tick::Counting { .. }));
    }

    #[test]
    fn overnight_target_survives_midnight() {
        let mut engine = CountdownEngine::new();
        engine.set_schedule(table(), at(19, 0, 0));
        let after_midnight = at(0, 30, 0) + Duration::days(1);
        assert!(matches!(engine.tick(after_midnight), Tick::Counting { .. }));
    }

    #[test]
    fn snapshot_reports_remaining() {
        let mut engine = CountdownEngine::new();
        assert!(engine.snapshot(at(13, 0, 0)).is_none());
        engine.set_schedule(table(), at(13, 0, 0));
        match engine.snapshot(at(17, 59, 30)) {
            Some(Event::CountdownTick {
                boundary,
                remaining_secs,
                display,
                ..
            }) => {
                assert_eq!(boundary, Boundary::Sunset);
                assert_eq!(remaining_secs, 30);
                assert_eq!(display, "00:00:30");
            }
            other => panic!("expected tick snapshot, got {other:?}"),
        }
    }
}
