//! Integration tests for the countdown loop, alarms and the service wiring.
//!
//! Tokio time is paused, so sleeps complete instantly in virtual time while
//! the wall clock is driven separately through a `ManualClock`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};

use miqat_core::geo::NoLocator;
use miqat_core::prayer::{DailyTimeTable, Timings};
use miqat_core::timer::MemoryNotifier;
use miqat_core::{
    AdjustmentStore, AlarmStore, Alerts, Boundary, ClockTime, Config, Coordinate, CountdownRunner,
    Event, KeyValueStore, LocationSource, ManualClock, MemoryStore, PrayerSchedule, PrayerService,
    PrayerTimeProvider, ProviderOutcome,
};

struct FixedProvider(Timings);

#[async_trait]
impl PrayerTimeProvider for FixedProvider {
    async fn fetch(&self, date: NaiveDate, _at: Coordinate) -> ProviderOutcome {
        ProviderOutcome::Fetched(DailyTimeTable::new(date, self.0))
    }
}

fn t(s: &str) -> ClockTime {
    s.parse().unwrap()
}

fn timings() -> Timings {
    Timings {
        pre_dawn: t("05:20"),
        dawn: t("05:30"),
        midday: t("12:15"),
        sunset: t("18:00"),
        midnight: t("23:00"),
    }
}

fn at(day: u32, h: u32, m: u32, s: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, day)
        .unwrap()
        .and_hms_opt(h, m, s)
        .unwrap()
}

fn drain(rx: &mut UnboundedReceiver<Event>) -> Vec<Event> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

fn runner(clock: ManualClock, tray: Arc<MemoryNotifier>) -> CountdownRunner {
    let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    let schedule = PrayerSchedule::new(
        Arc::new(FixedProvider(timings())),
        AdjustmentStore::new(store),
    );
    CountdownRunner::new(
        schedule,
        Arc::new(clock),
        Alerts::new(tray, None, true),
        Coordinate::new(-6.2088, 106.8456),
    )
}

fn service(
    clock: ManualClock,
    tray: Arc<MemoryNotifier>,
    store: Arc<dyn KeyValueStore>,
) -> (PrayerService, UnboundedReceiver<Event>) {
    let mut config = Config::default();
    config.countdown.tick_ms = 60_000;
    let (tx, rx) = unbounded_channel();
    let service = PrayerService::new(
        &config,
        store,
        Arc::new(FixedProvider(timings())),
        Arc::new(NoLocator),
        Alerts::new(tray, None, true),
        Arc::new(clock),
        Some(tx),
    );
    (service, rx)
}

#[tokio::test(start_paused = true)]
async fn test_arrival_fires_once_and_rolls_to_tomorrows_dawn() {
    let clock = ManualClock::new(at(11, 17, 59, 58));
    let tray = Arc::new(MemoryNotifier::new());
    let (tx, mut rx) = unbounded_channel();
    let mut runner = runner(clock.clone(), tray.clone()).with_events(tx);

    let next = runner.start().await.unwrap();
    assert_eq!(next.boundary, Boundary::Sunset);
    let generation = runner.engine().lock().unwrap().generation();

    clock.set(at(11, 18, 0, 3));
    tokio::time::sleep(Duration::from_millis(3500)).await;

    let events = drain(&mut rx);
    let arrivals = events
        .iter()
        .filter(|e| matches!(e, Event::BoundaryArrived { .. }))
        .count();
    assert_eq!(arrivals, 1);
    assert_eq!(tray.delivered().len(), 1);
    assert_eq!(tray.delivered()[0].tag, "sunset");

    let engine = runner.engine();
    let engine = engine.lock().unwrap();
    assert_eq!(engine.generation(), generation + 1);
    let next = engine.next().copied().unwrap();
    assert_eq!(next.boundary, Boundary::Dawn);
    assert_eq!(next.target, at(12, 5, 30, 0));
}

#[tokio::test(start_paused = true)]
async fn test_restart_does_not_duplicate_ticks() {
    let clock = ManualClock::new(at(11, 13, 0, 0));
    let tray = Arc::new(MemoryNotifier::new());
    let (tx, mut rx) = unbounded_channel();
    let mut runner = runner(clock, tray).with_events(tx);

    runner.start().await.unwrap();
    tokio::time::sleep(Duration::from_millis(1500)).await;
    drain(&mut rx);

    runner.start().await.unwrap();
    tokio::time::sleep(Duration::from_millis(1500)).await;
    let ticks = drain(&mut rx)
        .into_iter()
        .filter(|e| matches!(e, Event::CountdownTick { .. }))
        .count();
    // One loop: the immediate tick plus one after a second.
    assert_eq!(ticks, 2);
    assert!(runner.is_running());

    runner.stop();
    tokio::time::sleep(Duration::from_secs(3)).await;
    assert!(drain(&mut rx).is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_clock_moved_back_retargets_within_one_loop() {
    let clock = ManualClock::new(at(11, 13, 0, 0));
    let tray = Arc::new(MemoryNotifier::new());
    let (tx, mut rx) = unbounded_channel();
    let mut runner = runner(clock.clone(), tray).with_events(tx);

    let next = runner.start().await.unwrap();
    assert_eq!(next.boundary, Boundary::Sunset);
    tokio::time::sleep(Duration::from_millis(1500)).await;
    drain(&mut rx);
    let generation = runner.engine().lock().unwrap().generation();

    clock.set(at(11, 9, 0, 0));
    tokio::time::sleep(Duration::from_millis(2200)).await;
    let events = drain(&mut rx);

    let retargets: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            Event::CountdownRetargeted { from, to, .. } => Some((from.boundary, to.boundary)),
            _ => None,
        })
        .collect();
    assert_eq!(retargets, vec![(Boundary::Sunset, Boundary::Midday)]);

    // The retargeted loop keeps running: an immediate tick, then one a second later.
    let ticks: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            Event::CountdownTick { boundary, .. } => Some(*boundary),
            _ => None,
        })
        .collect();
    assert_eq!(ticks, vec![Boundary::Midday, Boundary::Midday]);

    assert!(runner.is_running());
    let engine = runner.engine();
    let engine = engine.lock().unwrap();
    assert_eq!(engine.generation(), generation + 1);
    assert_eq!(engine.next().map(|n| n.boundary), Some(Boundary::Midday));
}

#[tokio::test(start_paused = true)]
async fn test_service_falls_back_and_applies_adjustments() {
    let clock = ManualClock::new(at(11, 13, 0, 0));
    let tray = Arc::new(MemoryNotifier::new());
    let (mut service, mut rx) = service(clock, tray, Arc::new(MemoryStore::new()));

    let next = service.start().await.unwrap();
    assert_eq!(next.time, t("18:00"));
    let resolved = drain(&mut rx).into_iter().find_map(|e| match e {
        Event::LocationResolved { resolution, .. } => Some(resolution),
        _ => None,
    });
    let resolved = resolved.expect("location event");
    assert!(matches!(resolved.source, LocationSource::Fallback { .. }));

    let next = service.set_adjustment(Boundary::Sunset, -5).await.unwrap();
    assert_eq!(next.boundary, Boundary::Sunset);
    assert_eq!(next.time, t("17:55"));

    let table = service
        .runner()
        .engine()
        .lock()
        .unwrap()
        .table()
        .cloned()
        .unwrap();
    // (17:55 + 05:30 next day) / 2
    assert_eq!(table.time(Boundary::Midnight), t("23:42"));

    assert!(service.set_adjustment(Boundary::Sunset, 30).await.is_err());
    service.stop();
}

#[tokio::test(start_paused = true)]
async fn test_enabled_alarm_fires_and_rearms() {
    let clock = ManualClock::new(at(11, 17, 0, 0));
    let tray = Arc::new(MemoryNotifier::new());
    let (mut service, mut rx) = service(clock, tray.clone(), Arc::new(MemoryStore::new()));
    service.start().await.unwrap();

    let fire_at = service.set_alarm(Boundary::Sunset, true).unwrap();
    assert_eq!(fire_at, Some(at(11, 18, 0, 0)));

    tokio::time::sleep(Duration::from_secs(61 * 60)).await;
    assert_eq!(tray.delivered().len(), 1);
    assert_eq!(tray.delivered()[0].title, "Maghrib 18:00");

    let events = drain(&mut rx);
    assert!(events.iter().any(|e| matches!(
        e,
        Event::AlarmFired { boundary: Boundary::Sunset, delivered: true, .. }
    )));
    let alarms = service.alarms();
    let pending = alarms.lock().unwrap().pending();
    assert_eq!(pending, vec![(Boundary::Sunset, at(12, 18, 0, 0))]);
    service.stop();
}

#[tokio::test(start_paused = true)]
async fn test_alarm_disabled_while_pending_does_not_fire() {
    let clock = ManualClock::new(at(11, 17, 0, 0));
    let tray = Arc::new(MemoryNotifier::new());
    let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    let (mut service, mut rx) = service(clock, tray.clone(), store.clone());
    service.start().await.unwrap();
    service.set_alarm(Boundary::Sunset, true).unwrap();

    // Another front end flips the stored flag without touching the task.
    AlarmStore::new(store).set(Boundary::Sunset, false).unwrap();

    tokio::time::sleep(Duration::from_secs(61 * 60)).await;
    assert!(tray.delivered().is_empty());
    let events = drain(&mut rx);
    assert!(events
        .iter()
        .any(|e| matches!(e, Event::AlarmSkipped { boundary: Boundary::Sunset, .. })));
    assert!(!events.iter().any(|e| matches!(e, Event::AlarmFired { .. })));
    assert!(service.alarms().lock().unwrap().pending().is_empty());
    service.stop();
}

#[tokio::test(start_paused = true)]
async fn test_alarm_toggled_off_is_cancelled() {
    let clock = ManualClock::new(at(11, 11, 0, 0));
    let tray = Arc::new(MemoryNotifier::new());
    let (mut service, _rx) = service(clock, tray.clone(), Arc::new(MemoryStore::new()));
    service.start().await.unwrap();

    assert!(service.set_alarm(Boundary::Midday, true).unwrap().is_some());
    assert_eq!(service.set_alarm(Boundary::Midday, false).unwrap(), None);
    assert!(service.set_alarm(Boundary::Midnight, true).is_err());

    tokio::time::sleep(Duration::from_secs(2 * 60 * 60)).await;
    assert!(tray.delivered().is_empty());
    service.stop();
}
