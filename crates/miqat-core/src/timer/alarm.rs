//! Deferred alarms for dawn, midday and sunset.
//!
//! Each enabled boundary owns at most one pending task. Scheduling a
//! boundary again drops (and so aborts) the previous task first. When a task
//! comes due it re-reads the alarm flag, since the user may have switched it
//! off while it was pending, then announces and re-arms for the next day.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{Duration, NaiveDateTime};
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;

use super::notify::{Alerts, Delivery, Notification};
use crate::clock::Clock;
use crate::error::{CoreError, StorageError};
use crate::events::Event;
use crate::prayer::{AdjustedTimeTable, AlarmSet, AlarmStore, Boundary, ClockTime};

/// A pending alarm task. Dropping the handle cancels the task.
pub struct AlarmHandle {
    fire_at: Arc<Mutex<NaiveDateTime>>,
    task: JoinHandle<()>,
}

impl AlarmHandle {
    pub fn fire_at(&self) -> NaiveDateTime {
        *self.fire_at.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_pending(&self) -> bool {
        !self.task.is_finished()
    }

    pub fn cancel(&self) {
        self.task.abort();
    }
}

impl Drop for AlarmHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[derive(Clone)]
struct AlarmContext {
    alarms: AlarmStore,
    alerts: Alerts,
    clock: Arc<dyn Clock>,
    events: Option<UnboundedSender<Event>>,
}

impl AlarmContext {
    fn emit(&self, event: Event) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event);
        }
    }
}

pub struct AlarmScheduler {
    ctx: AlarmContext,
    pending: HashMap<Boundary, AlarmHandle>,
}

impl AlarmScheduler {
    pub fn new(alarms: AlarmStore, alerts: Alerts, clock: Arc<dyn Clock>) -> Self {
        Self {
            ctx: AlarmContext {
                alarms,
                alerts,
                clock,
                events: None,
            },
            pending: HashMap::new(),
        }
    }

    pub fn with_events(mut self, events: UnboundedSender<Event>) -> Self {
        self.ctx.events = Some(events);
        self
    }

    pub fn alarms(&self) -> &AlarmStore {
        &self.ctx.alarms
    }

    /// (Re)arm every alarmable boundary according to the stored flags.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn schedule_all(
        &mut self,
        table: &AdjustedTimeTable,
    ) -> Result<Vec<(Boundary, NaiveDateTime)>, StorageError> {
        let set = self.ctx.alarms.load()?;
        Ok(self.apply(table, &set))
    }

    /// Store a new flag for one boundary and re-arm it.
    pub fn set_enabled(
        &mut self,
        boundary: Boundary,
        enabled: bool,
        table: &AdjustedTimeTable,
    ) -> Result<Option<NaiveDateTime>, CoreError> {
        let set = self.ctx.alarms.set(boundary, enabled)?;
        Ok(self.schedule(boundary, table.time(boundary), set.is_enabled(boundary)))
    }

    fn apply(&mut self, table: &AdjustedTimeTable, set: &AlarmSet) -> Vec<(Boundary, NaiveDateTime)> {
        Boundary::ALARMABLE
            .into_iter()
            .filter_map(|b| {
                self.schedule(b, table.time(b), set.is_enabled(b))
                    .map(|at| (b, at))
            })
            .collect()
    }

    /// Arm one boundary, replacing whatever was pending for it.
    fn schedule(&mut self, boundary: Boundary, time: ClockTime, enabled: bool) -> Option<NaiveDateTime> {
        self.cancel(boundary);
        if !enabled {
            return None;
        }

        let now = self.ctx.clock.now();
        let fire_at = time.next_after(now);
        let delay = fire_at - now;
        if delay <= Duration::zero() || delay >= Duration::days(1) {
            tracing::debug!(%boundary, %fire_at, "alarm outside scheduling window");
            return None;
        }
        let delay = delay.to_std().unwrap_or_default();

        let shared_fire_at = Arc::new(Mutex::new(fire_at));
        let task = tokio::spawn(run_alarm(
            self.ctx.clone(),
            boundary,
            time,
            shared_fire_at.clone(),
            delay,
        ));
        self.pending.insert(
            boundary,
            AlarmHandle {
                fire_at: shared_fire_at,
                task,
            },
        );
        tracing::info!(%boundary, %fire_at, "alarm scheduled");
        self.ctx.emit(Event::AlarmScheduled {
            boundary,
            fire_at,
            at: now,
        });
        Some(fire_at)
    }

    pub fn cancel(&mut self, boundary: Boundary) {
        if let Some(handle) = self.pending.remove(&boundary) {
            handle.cancel();
        }
    }

    pub fn cancel_all(&mut self) {
        self.pending.clear();
    }

    /// Alarms still waiting to fire, in daily order.
    pub fn pending(&self) -> Vec<(Boundary, NaiveDateTime)> {
        Boundary::ALARMABLE
            .into_iter()
            .filter_map(|b| {
                self.pending
                    .get(&b)
                    .filter(|h| h.is_pending())
                    .map(|h| (b, h.fire_at()))
            })
            .collect()
    }
}

async fn run_alarm(
    ctx: AlarmContext,
    boundary: Boundary,
    time: ClockTime,
    fire_at: Arc<Mutex<NaiveDateTime>>,
    first_delay: std::time::Duration,
) {
    let mut delay = first_delay;
    loop {
        tokio::time::sleep(delay).await;
        let now = ctx.clock.now();

        match ctx.alarms.is_enabled(boundary) {
            Ok(true) => {}
            Ok(false) => {
                tracing::info!(%boundary, "alarm disabled while pending, not firing");
                ctx.emit(Event::AlarmSkipped { boundary, at: now });
                return;
            }
            Err(e) => {
                tracing::warn!(%boundary, error = %e, "cannot read alarm setting, not firing");
                return;
            }
        }

        let notification = Notification::for_boundary(boundary, time);
        let delivery = ctx.alerts.announce(&notification);
        if let Delivery::Suppressed(reason) = &delivery {
            ctx.emit(Event::NotificationSuppressed {
                tag: notification.tag.clone(),
                reason: reason.to_string(),
                at: now,
            });
        }
        tracing::info!(%boundary, "alarm fired");
        ctx.emit(Event::AlarmFired {
            boundary,
            delivered: delivery == Delivery::Delivered,
            at: now,
        });

        let next = {
            let mut guard = fire_at.lock().unwrap_or_else(PoisonError::into_inner);
            *guard += Duration::days(1);
            *guard
        };
        let now = ctx.clock.now();
        delay = (next - now).to_std().unwrap_or_default();
        ctx.emit(Event::AlarmScheduled {
            boundary,
            fire_at: next,
            at: now,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::prayer::{AdjustmentSet, DailyTimeTable, Timings};
    use crate::storage::MemoryStore;
    use crate::timer::MemoryNotifier;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 11)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn table() -> AdjustedTimeTable {
        let raw = DailyTimeTable::new(at(0, 0).date(), Timings::fallback());
        AdjustedTimeTable::from_raw(&raw, AdjustmentSet::default(), false)
    }

    fn scheduler(now: NaiveDateTime) -> (AlarmScheduler, Arc<MemoryNotifier>) {
        let tray = Arc::new(MemoryNotifier::new());
        let alerts = Alerts::new(tray.clone(), None, true);
        let alarms = AlarmStore::new(Arc::new(MemoryStore::new()));
        let scheduler = AlarmScheduler::new(alarms, alerts, Arc::new(ManualClock::new(now)));
        (scheduler, tray)
    }

    #[tokio::test(start_paused = true)]
    async fn only_enabled_boundaries_are_armed() {
        let (mut scheduler, _tray) = scheduler(at(13, 0));
        scheduler.alarms().set(Boundary::Dawn, true).unwrap();
        scheduler.alarms().set(Boundary::Sunset, true).unwrap();

        let armed = scheduler.schedule_all(&table()).unwrap();
        assert_eq!(
            armed,
            vec![
                (Boundary::Dawn, at(4, 40) + Duration::days(1)),
                (Boundary::Sunset, at(18, 0)),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn rescheduling_keeps_one_task_per_boundary() {
        let (mut scheduler, tray) = scheduler(at(17, 0));
        scheduler.alarms().set(Boundary::Sunset, true).unwrap();
        for _ in 0..3 {
            scheduler.schedule_all(&table()).unwrap();
        }
        assert_eq!(scheduler.pending().len(), 1);

        tokio::time::sleep(std::time::Duration::from_secs(61 * 60)).await;
        assert_eq!(tray.delivered().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn disabling_via_scheduler_cancels_pending() {
        let (mut scheduler, _tray) = scheduler(at(11, 0));
        let tbl = table();
        assert!(scheduler
            .set_enabled(Boundary::Midday, true, &tbl)
            .unwrap()
            .is_some());
        assert_eq!(scheduler.pending().len(), 1);
        assert!(scheduler
            .set_enabled(Boundary::Midday, false, &tbl)
            .unwrap()
            .is_none());
        assert!(scheduler.pending().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn boundary_at_now_is_outside_window() {
        let (mut scheduler, _tray) = scheduler(at(12, 0));
        scheduler.alarms().set(Boundary::Midday, true).unwrap();
        // 12:00 rolls to tomorrow, exactly 24h away.
        assert!(scheduler.schedule_all(&table()).unwrap().is_empty());
    }
}
