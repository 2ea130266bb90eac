mod alarm;
mod engine;
mod notify;
mod runner;

pub use alarm::{AlarmHandle, AlarmScheduler};
pub use engine::{CountdownEngine, CountdownState, Remaining, Tick};
pub use notify::{Alerts, AudioCue, Delivery, MemoryNotifier, Notification, Notifier};
pub use runner::CountdownRunner;
