//! Drives a [`CountdownEngine`] from a Tokio interval.
//!
//! The runner owns the only handle to the tick task. Every (re)start aborts
//! the previous task before spawning a new one, and the task itself exits
//! as soon as the engine's generation moves past the one it was started for.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::alarm::AlarmScheduler;
use super::engine::{CountdownEngine, Tick};
use super::notify::{Alerts, Delivery, Notification};
use crate::clock::Clock;
use crate::error::StorageError;
use crate::events::Event;
use crate::geo::Coordinate;
use crate::prayer::{AdjustedTimeTable, NextBoundary, PrayerSchedule};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Clone)]
struct LoopContext {
    engine: Arc<Mutex<CountdownEngine>>,
    schedule: PrayerSchedule,
    clock: Arc<dyn Clock>,
    alerts: Alerts,
    alarms: Option<Arc<Mutex<AlarmScheduler>>>,
    events: Option<UnboundedSender<Event>>,
    coordinate: Coordinate,
    tick: Duration,
}

impl LoopContext {
    fn emit(&self, event: Event) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event);
        }
    }

    async fn build(&self) -> Option<AdjustedTimeTable> {
        let now = self.clock.now();
        match self.schedule.build(now.date(), self.coordinate).await {
            Ok(table) => {
                self.emit(Event::ScheduleBuilt {
                    date: table.date,
                    fallback: table.fallback,
                    at: now,
                });
                if let Some(alarms) = &self.alarms {
                    if let Err(e) = lock(alarms).schedule_all(&table) {
                        tracing::warn!(error = %e, "could not reschedule alarms");
                    }
                }
                Some(table)
            }
            Err(e) => {
                tracing::warn!(error = %e, "schedule rebuild failed");
                None
            }
        }
    }
}

pub struct CountdownRunner {
    ctx: LoopContext,
    handle: Option<JoinHandle<()>>,
}

impl CountdownRunner {
    pub fn new(
        schedule: PrayerSchedule,
        clock: Arc<dyn Clock>,
        alerts: Alerts,
        coordinate: Coordinate,
    ) -> Self {
        Self {
            ctx: LoopContext {
                engine: Arc::new(Mutex::new(CountdownEngine::new())),
                schedule,
                clock,
                alerts,
                alarms: None,
                events: None,
                coordinate,
                tick: Duration::from_secs(1),
            },
            handle: None,
        }
    }

    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.ctx.tick = tick;
        self
    }

    pub fn with_events(mut self, events: UnboundedSender<Event>) -> Self {
        self.ctx.events = Some(events);
        self
    }

    /// Alarms to re-arm whenever the schedule is rebuilt.
    pub fn with_alarms(mut self, alarms: Arc<Mutex<AlarmScheduler>>) -> Self {
        self.ctx.alarms = Some(alarms);
        self
    }

    pub fn engine(&self) -> Arc<Mutex<CountdownEngine>> {
        self.ctx.engine.clone()
    }

    pub fn coordinate(&self) -> Coordinate {
        self.ctx.coordinate
    }

    /// Takes effect on the next [`CountdownRunner::start`].
    pub fn set_coordinate(&mut self, coordinate: Coordinate) {
        self.ctx.coordinate = coordinate;
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Build today's schedule and (re)start the tick loop.
    ///
    /// Also used after an adjustment or location change.
    pub async fn start(&mut self) -> Result<NextBoundary, StorageError> {
        let now = self.ctx.clock.now();
        let table = self.ctx.schedule.build(now.date(), self.ctx.coordinate).await?;
        self.ctx.emit(Event::ScheduleBuilt {
            date: table.date,
            fallback: table.fallback,
            at: now,
        });
        if let Some(alarms) = &self.ctx.alarms {
            lock(alarms).schedule_all(&table)?;
        }

        let (next, generation) = {
            let mut engine = lock(&self.ctx.engine);
            let next = engine.set_schedule(table, now);
            (next, engine.generation())
        };
        self.ctx.emit(Event::CountdownStarted {
            next,
            generation,
            at: now,
        });
        self.spawn_loop(generation);
        Ok(next)
    }

    /// Stop ticking. The engine returns to idle.
    pub fn stop(&mut self) {
        lock(&self.ctx.engine).stop();
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    fn spawn_loop(&mut self, generation: u64) {
        if let Some(previous) = self.handle.take() {
            previous.abort();
        }
        self.handle = Some(tokio::spawn(run_loop(self.ctx.clone(), generation)));
    }
}

impl Drop for CountdownRunner {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

async fn run_loop(ctx: LoopContext, mut generation: u64) {
    let mut interval = tokio::time::interval(ctx.tick);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        interval.tick().await;
        let now = ctx.clock.now();
        let tick = {
            let mut engine = lock(&ctx.engine);
            if engine.generation() != generation {
                tracing::debug!(generation, "tick loop superseded");
                return;
            }
            engine.tick(now)
        };

        match tick {
            Tick::Inactive => return,
            Tick::Counting { next, remaining } => {
                ctx.emit(Event::CountdownTick {
                    boundary: next.boundary,
                    remaining_secs: remaining.total_secs(),
                    display: remaining.to_string(),
                    at: now,
                });
            }
            Tick::Retargeted { from, to } => {
                ctx.emit(Event::CountdownRetargeted { from, to, at: now });
                generation = lock(&ctx.engine).generation();
                interval.reset_immediately();
            }
            Tick::Arrived(arrived) => {
                ctx.emit(Event::BoundaryArrived {
                    boundary: arrived.boundary,
                    target: arrived.target,
                    at: now,
                });
                let notification = Notification::for_boundary(arrived.boundary, arrived.time);
                if let Delivery::Suppressed(reason) = ctx.alerts.announce(&notification) {
                    ctx.emit(Event::NotificationSuppressed {
                        tag: notification.tag,
                        reason: reason.to_string(),
                        at: now,
                    });
                }

                // Rebuild: picks up a new date after midnight and any
                // adjustment changed while counting.
                let rebuilt = ctx.build().await;
                let now = ctx.clock.now();
                let next = {
                    let mut engine = lock(&ctx.engine);
                    if engine.generation() != generation {
                        return;
                    }
                    let Some(table) = rebuilt.or_else(|| engine.table().cloned()) else {
                        return;
                    };
                    let next = engine.rollover(table, now);
                    generation = engine.generation();
                    next
                };
                ctx.emit(Event::CountdownStarted {
                    next,
                    generation,
                    at: now,
                });
                interval.reset_immediately();
            }
        }
    }
}
