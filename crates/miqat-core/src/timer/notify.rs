//! Notification and audio sinks for boundary alerts.

use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::error::NotifyError;
use crate::prayer::{Boundary, ClockTime};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
    /// A new notification with the same tag replaces the previous one.
    pub tag: String,
}

impl Notification {
    pub fn for_boundary(boundary: Boundary, time: ClockTime) -> Self {
        Self {
            title: format!("{} {}", boundary.label(), time),
            body: format!("It is time for {} ({time}).", boundary.label()),
            tag: boundary.name().to_string(),
        }
    }
}

/// Local notification capability.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: &Notification) -> Result<(), NotifyError>;
}

/// Short audio cue. Failures are ignored by the caller.
pub trait AudioCue: Send + Sync {
    fn play(&self) -> Result<(), NotifyError>;
}

/// Outcome of announcing a boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Delivered,
    /// Notifications are turned off in the config.
    Disabled,
    /// The platform refused; the caller should surface a toast instead.
    Suppressed(NotifyError),
}

/// Notification plus optional sound, as one unit.
#[derive(Clone)]
pub struct Alerts {
    notifier: Arc<dyn Notifier>,
    audio: Option<Arc<dyn AudioCue>>,
    enabled: bool,
}

impl Alerts {
    pub fn new(notifier: Arc<dyn Notifier>, audio: Option<Arc<dyn AudioCue>>, enabled: bool) -> Self {
        Self {
            notifier,
            audio,
            enabled,
        }
    }

    pub fn announce(&self, notification: &Notification) -> Delivery {
        if !self.enabled {
            return Delivery::Disabled;
        }
        if let Some(audio) = &self.audio {
            if let Err(e) = audio.play() {
                tracing::debug!(error = %e, "audio cue failed");
            }
        }
        match self.notifier.notify(notification) {
            Ok(()) => Delivery::Delivered,
            Err(e) => {
                tracing::warn!(tag = %notification.tag, error = %e, "notification not shown");
                Delivery::Suppressed(e)
            }
        }
    }
}

/// Notifier that keeps what it was given, keyed by tag like a
/// notification tray.
#[derive(Debug, Default)]
pub struct MemoryNotifier {
    delivered: Mutex<Vec<Notification>>,
    deny: bool,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// A notifier whose permission has been refused.
    pub fn denied() -> Self {
        Self {
            delivered: Mutex::new(Vec::new()),
            deny: true,
        }
    }

    /// Every notification delivered, in order.
    pub fn delivered(&self) -> Vec<Notification> {
        self.delivered
            .lock()
            .map(|d| d.clone())
            .unwrap_or_default()
    }

    /// What the tray shows now: the latest notification per tag.
    pub fn visible(&self) -> Vec<Notification> {
        let mut visible: Vec<Notification> = Vec::new();
        for n in self.delivered() {
            visible.retain(|v| v.tag != n.tag);
            visible.push(n);
        }
        visible
    }
}

impl Notifier for MemoryNotifier {
    fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        if self.deny {
            return Err(NotifyError::PermissionDenied);
        }
        self.delivered
            .lock()
            .map_err(|e| NotifyError::Delivery(e.to_string()))?
            .push(notification.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct BrokenSpeaker;

    impl AudioCue for BrokenSpeaker {
        fn play(&self) -> Result<(), NotifyError> {
            Err(NotifyError::Delivery("no output device".into()))
        }
    }

    #[test]
    fn audio_failure_does_not_block_notification() {
        let tray = Arc::new(MemoryNotifier::new());
        let alerts = Alerts::new(tray.clone(), Some(Arc::new(BrokenSpeaker)), true);
        let n = Notification::for_boundary(Boundary::Dawn, "04:35".parse().unwrap());
        assert_eq!(alerts.announce(&n), Delivery::Delivered);
        assert_eq!(tray.delivered().len(), 1);
        assert_eq!(tray.delivered()[0].title, "Fajr 04:35");
    }

    #[test]
    fn permission_denied_is_suppressed() {
        let alerts = Alerts::new(Arc::new(MemoryNotifier::denied()), None, true);
        let n = Notification::for_boundary(Boundary::Sunset, "18:00".parse().unwrap());
        assert_eq!(
            alerts.announce(&n),
            Delivery::Suppressed(NotifyError::PermissionDenied)
        );
    }

    #[test]
    fn same_tag_replaces_in_tray() {
        let tray = MemoryNotifier::new();
        let dawn = Notification::for_boundary(Boundary::Dawn, "04:35".parse().unwrap());
        let sunset = Notification::for_boundary(Boundary::Sunset, "18:00".parse().unwrap());
        tray.notify(&dawn).unwrap();
        tray.notify(&sunset).unwrap();
        tray.notify(&dawn).unwrap();
        assert_eq!(tray.delivered().len(), 3);
        assert_eq!(tray.visible().len(), 2);
    }

    #[test]
    fn disabled_alerts_do_nothing() {
        let tray = Arc::new(MemoryNotifier::new());
        let alerts = Alerts::new(tray.clone(), None, false);
        let n = Notification::for_boundary(Boundary::Midday, "12:00".parse().unwrap());
        assert_eq!(alerts.announce(&n), Delivery::Disabled);
        assert!(tray.delivered().is_empty());
    }
}
