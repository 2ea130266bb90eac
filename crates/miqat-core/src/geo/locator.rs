//! Device positioning capability.

use std::time::Duration;

use async_trait::async_trait;

use super::Coordinate;
use crate::error::LocationError;

/// Parameters for a single location request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocateRequest {
    pub timeout: Duration,
    /// Oldest cached fix the caller will accept.
    pub max_age: Duration,
    pub high_accuracy: bool,
}

impl Default for LocateRequest {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(20),
            max_age: Duration::from_secs(60),
            high_accuracy: false,
        }
    }
}

/// A position reported by the device.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fix {
    pub coordinate: Coordinate,
    /// How long ago the platform acquired this fix.
    pub age: Duration,
}

#[async_trait]
pub trait DeviceLocator: Send + Sync {
    async fn locate(&self, request: &LocateRequest) -> Result<Fix, LocationError>;
}

/// Platform without positioning hardware.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLocator;

#[async_trait]
impl DeviceLocator for NoLocator {
    async fn locate(&self, _request: &LocateRequest) -> Result<Fix, LocationError> {
        Err(LocationError::Unavailable)
    }
}

/// Locator that reports a known position, e.g. one typed in by the user.
#[derive(Debug, Clone, Copy)]
pub struct FixedLocator {
    coordinate: Coordinate,
}

impl FixedLocator {
    pub fn new(coordinate: Coordinate) -> Self {
        Self { coordinate }
    }
}

#[async_trait]
impl DeviceLocator for FixedLocator {
    async fn locate(&self, _request: &LocateRequest) -> Result<Fix, LocationError> {
        Ok(Fix {
            coordinate: self.coordinate,
            age: Duration::ZERO,
        })
    }
}
