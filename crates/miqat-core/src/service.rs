//! Wires the components together for one front-end lifetime.
//!
//! Nothing here is global: the caller builds a [`PrayerService`] from its
//! store, provider, locator and sinks, and owns it for as long as the
//! countdown should run.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::NaiveDateTime;
use tokio::sync::mpsc::UnboundedSender;

use crate::clock::Clock;
use crate::error::CoreError;
use crate::events::Event;
use crate::geo::{DeviceLocator, GeoResolver, Resolution};
use crate::prayer::{
    AdjustmentStore, AlarmStore, Boundary, NextBoundary, PrayerSchedule, PrayerTimeProvider,
};
use crate::storage::{Config, KeyValueStore};
use crate::timer::{AlarmScheduler, Alerts, CountdownRunner};

pub struct PrayerService {
    resolver: GeoResolver,
    schedule: PrayerSchedule,
    alarms: Arc<Mutex<AlarmScheduler>>,
    runner: CountdownRunner,
    clock: Arc<dyn Clock>,
    events: Option<UnboundedSender<Event>>,
}

impl PrayerService {
    pub fn new(
        config: &Config,
        store: Arc<dyn KeyValueStore>,
        provider: Arc<dyn PrayerTimeProvider>,
        locator: Arc<dyn DeviceLocator>,
        alerts: Alerts,
        clock: Arc<dyn Clock>,
        events: Option<UnboundedSender<Event>>,
    ) -> Self {
        let resolver = GeoResolver::new(store.clone(), locator, &config.location);
        let schedule = PrayerSchedule::new(provider, AdjustmentStore::new(store.clone()));

        let mut scheduler = AlarmScheduler::new(AlarmStore::new(store), alerts.clone(), clock.clone());
        if let Some(tx) = &events {
            scheduler = scheduler.with_events(tx.clone());
        }
        let alarms = Arc::new(Mutex::new(scheduler));

        let mut runner = CountdownRunner::new(
            schedule.clone(),
            clock.clone(),
            alerts,
            resolver.fallback(),
        )
        .with_tick(Duration::from_millis(config.countdown.tick_ms.max(1)))
        .with_alarms(alarms.clone());
        if let Some(tx) = &events {
            runner = runner.with_events(tx.clone());
        }

        Self {
            resolver,
            schedule,
            alarms,
            runner,
            clock,
            events,
        }
    }

    fn emit(&self, event: Event) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event);
        }
    }

    pub fn resolver(&self) -> &GeoResolver {
        &self.resolver
    }

    pub fn runner(&self) -> &CountdownRunner {
        &self.runner
    }

    pub fn schedule(&self) -> &PrayerSchedule {
        &self.schedule
    }

    pub fn alarms(&self) -> Arc<Mutex<AlarmScheduler>> {
        self.alarms.clone()
    }

    /// Resolve the location, build today's schedule, arm alarms and start
    /// the countdown.
    pub async fn start(&mut self) -> Result<NextBoundary, CoreError> {
        let resolution = self.resolver.resolve().await?;
        self.use_location(resolution).await
    }

    /// Ask the device for a new position and restart everything with it.
    pub async fn redetect_location(&mut self) -> Result<NextBoundary, CoreError> {
        let resolution = self.resolver.redetect().await?;
        self.use_location(resolution).await
    }

    /// Save an adjustment and rebuild the schedule, countdown and alarms.
    pub async fn set_adjustment(
        &mut self,
        boundary: Boundary,
        minutes: i32,
    ) -> Result<NextBoundary, CoreError> {
        self.schedule.adjustments().set(boundary, minutes)?;
        Ok(self.runner.start().await?)
    }

    /// Toggle an alarm and re-arm just that boundary.
    pub fn set_alarm(
        &mut self,
        boundary: Boundary,
        enabled: bool,
    ) -> Result<Option<NaiveDateTime>, CoreError> {
        let table = self
            .runner
            .engine()
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .table()
            .cloned();
        let mut alarms = self.alarms.lock().unwrap_or_else(PoisonError::into_inner);
        match table {
            Some(table) => alarms.set_enabled(boundary, enabled, &table),
            None => {
                alarms.alarms().set(boundary, enabled)?;
                Ok(None)
            }
        }
    }

    pub fn stop(&mut self) {
        self.runner.stop();
        self.alarms
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .cancel_all();
    }

    async fn use_location(&mut self, resolution: Resolution) -> Result<NextBoundary, CoreError> {
        if let Some(notice) = resolution.notice() {
            tracing::info!(%notice, "using fallback location");
        }
        self.runner.set_coordinate(resolution.coordinate);
        self.emit(Event::LocationResolved {
            resolution,
            at: self.clock.now(),
        });
        Ok(self.runner.start().await?)
    }
}
