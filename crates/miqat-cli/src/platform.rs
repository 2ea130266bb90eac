//! Terminal stand-ins for the platform capabilities the core asks for.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use miqat_core::geo::{DeviceLocator, Fix, LocateRequest};
use miqat_core::storage::NotificationsConfig;
use miqat_core::timer::{AudioCue, Notification, Notifier};
use miqat_core::{Alerts, Coordinate, LocationError, NotifyError};

/// Environment variable holding a device position as `LAT,LNG`, or
/// `denied` to simulate a refused permission.
pub const POSITION_VAR: &str = "MIQAT_POSITION";

/// Reads the device position from [`POSITION_VAR`].
pub struct EnvLocator;

#[async_trait]
impl DeviceLocator for EnvLocator {
    async fn locate(&self, _request: &LocateRequest) -> Result<Fix, LocationError> {
        let raw = std::env::var(POSITION_VAR).map_err(|_| LocationError::Unavailable)?;
        if raw.trim().eq_ignore_ascii_case("denied") {
            return Err(LocationError::PermissionDenied);
        }
        let (lat, lng) = raw.split_once(',').ok_or(LocationError::Unavailable)?;
        let parse = |s: &str| s.trim().parse::<f64>().map_err(|_| LocationError::Unavailable);
        Ok(Fix {
            coordinate: Coordinate::new(parse(lat)?, parse(lng)?),
            age: Duration::ZERO,
        })
    }
}

/// Prints notifications to stderr.
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        writeln!(
            std::io::stderr(),
            "[{}] {}",
            notification.title,
            notification.body
        )
        .map_err(|e| NotifyError::Delivery(e.to_string()))
    }
}

/// Rings the terminal bell.
pub struct TerminalBell;

impl AudioCue for TerminalBell {
    fn play(&self) -> Result<(), NotifyError> {
        let mut out = std::io::stdout();
        out.write_all(b"\x07")
            .and_then(|()| out.flush())
            .map_err(|e| NotifyError::Delivery(e.to_string()))
    }
}

pub fn alerts(config: &NotificationsConfig) -> Alerts {
    let audio: Option<Arc<dyn AudioCue>> = if config.sound {
        Some(Arc::new(TerminalBell))
    } else {
        None
    };
    Alerts::new(Arc::new(ConsoleNotifier), audio, config.enabled)
}
