//! # Miqat Core Library
//!
//! Prayer-time resolution and alarm scheduling. Front ends (the `miqat-cli`
//! binary, or any GUI shell) are thin layers over the same core.
//!
//! ## Architecture
//!
//! - **Location**: stored coordinate, then a device fix, then a fallback city
//! - **Schedule**: a daily table from an external service with per-boundary
//!   minute offsets and a derived midnight
//! - **Countdown Engine**: a wall-clock-based state machine that requires the
//!   caller to periodically invoke `tick()`, driven by a Tokio task
//! - **Alarms**: one deferred task per enabled boundary, re-checked on fire
//! - **Storage**: a string key-value store (SQLite or in-memory), scoped per
//!   signed-in user, and TOML-based configuration
//!
//! ## Key Components
//!
//! - [`PrayerService`]: wires everything together for one front-end lifetime
//! - [`CountdownEngine`]: countdown state machine
//! - [`AlarmScheduler`]: per-boundary alarm tasks
//! - [`SessionKeyScope`]: per-user key isolation over any [`KeyValueStore`]
//! - [`Config`]: application configuration management

pub mod clock;
pub mod error;
pub mod events;
pub mod geo;
pub mod prayer;
pub mod service;
pub mod storage;
pub mod timer;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{
    ConfigError, CoreError, LocationError, NotifyError, ProviderError, StorageError,
    ValidationError,
};
pub use events::Event;
pub use geo::{Coordinate, GeoResolver, LocationSource, Resolution};
pub use prayer::{
    AdjustedTimeTable, AdjustmentStore, AladhanProvider, AlarmStore, Boundary, CachingProvider,
    ClockTime, NextBoundary, PrayerSchedule, PrayerTimeProvider, ProviderOutcome,
};
pub use service::PrayerService;
pub use storage::{Config, Database, KeyValueStore, MemoryStore, SessionKeyScope};
pub use timer::{AlarmScheduler, Alerts, CountdownEngine, CountdownRunner, CountdownState};
