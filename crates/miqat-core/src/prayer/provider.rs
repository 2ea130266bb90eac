//! Prayer time service client.
//!
//! The service is queried once per (date, coordinate) with a fixed
//! calculation method. Any transport or parse failure yields the hardcoded
//! fallback table instead of an error; there is no retry.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;
use url::Url;

use super::table::{DailyTimeTable, Timings};
use super::time::{Boundary, ClockTime};
use crate::error::ProviderError;
use crate::geo::Coordinate;
use crate::storage::ProviderConfig;

/// Result of a provider call. The fallback path is an ordinary variant.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderOutcome {
    Fetched(DailyTimeTable),
    Fallback { table: DailyTimeTable, reason: String },
}

impl ProviderOutcome {
    pub fn table(&self) -> &DailyTimeTable {
        match self {
            ProviderOutcome::Fetched(table) | ProviderOutcome::Fallback { table, .. } => table,
        }
    }

    pub fn into_table(self) -> DailyTimeTable {
        match self {
            ProviderOutcome::Fetched(table) | ProviderOutcome::Fallback { table, .. } => table,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, ProviderOutcome::Fallback { .. })
    }
}

#[async_trait]
pub trait PrayerTimeProvider: Send + Sync {
    async fn fetch(&self, date: NaiveDate, at: Coordinate) -> ProviderOutcome;
}

#[derive(Debug, Deserialize)]
struct TimingsResponse {
    data: TimingsData,
}

#[derive(Debug, Deserialize)]
struct TimingsData {
    timings: HashMap<String, String>,
}

/// Client for an Aladhan-compatible `/timings/{DD-MM-YYYY}` endpoint.
pub struct AladhanProvider {
    client: Client,
    base_url: String,
    method: u32,
}

impl AladhanProvider {
    pub fn new(config: &ProviderConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            method: config.method,
        })
    }

    fn url(&self, date: NaiveDate, at: Coordinate) -> Result<Url, ProviderError> {
        let mut url = Url::parse(&format!(
            "{}/timings/{}",
            self.base_url,
            date.format("%d-%m-%Y")
        ))?;
        url.query_pairs_mut()
            .append_pair("latitude", &at.latitude.to_string())
            .append_pair("longitude", &at.longitude.to_string())
            .append_pair("method", &self.method.to_string());
        Ok(url)
    }

    async fn request(&self, date: NaiveDate, at: Coordinate) -> Result<Timings, ProviderError> {
        let url = self.url(date, at)?;
        tracing::debug!(%url, "requesting prayer times");
        let resp = self.client.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(ProviderError::Status(status.as_u16()));
        }
        let body = resp.text().await?;
        parse_timings(&body)
    }
}

#[async_trait]
impl PrayerTimeProvider for AladhanProvider {
    async fn fetch(&self, date: NaiveDate, at: Coordinate) -> ProviderOutcome {
        match self.request(date, at).await {
            Ok(timings) => ProviderOutcome::Fetched(DailyTimeTable::new(date, timings)),
            Err(e) => {
                tracing::warn!(%date, coordinate = %at, error = %e, "prayer times unavailable, using fallback table");
                ProviderOutcome::Fallback {
                    table: DailyTimeTable::fallback(date),
                    reason: e.to_string(),
                }
            }
        }
    }
}

/// Extract the five boundaries from a timings response body.
///
/// Values may carry a timezone suffix such as `"04:35 (WIB)"`.
fn parse_timings(body: &str) -> Result<Timings, ProviderError> {
    let resp: TimingsResponse =
        serde_json::from_str(body).map_err(|e| ProviderError::Malformed(e.to_string()))?;
    let lookup = |boundary: Boundary| -> Result<ClockTime, ProviderError> {
        let raw = resp
            .data
            .timings
            .get(boundary.label())
            .ok_or_else(|| ProviderError::Malformed(format!("missing {}", boundary.label())))?;
        let hhmm = raw.split_whitespace().next().unwrap_or_default();
        hhmm.parse()
            .map_err(|_| ProviderError::Malformed(format!("bad {} value '{raw}'", boundary.label())))
    };
    Ok(Timings {
        pre_dawn: lookup(Boundary::PreDawn)?,
        dawn: lookup(Boundary::Dawn)?,
        midday: lookup(Boundary::Midday)?,
        sunset: lookup(Boundary::Sunset)?,
        midnight: lookup(Boundary::Midnight)?,
    })
}

/// Memoises successful fetches per (date, coordinate). Fallback tables are
/// not cached so the next call asks the service again.
pub struct CachingProvider<P> {
    inner: P,
    cache: Mutex<HashMap<(NaiveDate, i64, i64), DailyTimeTable>>,
}

impl<P: PrayerTimeProvider> CachingProvider<P> {
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            cache: Mutex::new(HashMap::new()),
        }
    }

    fn key(date: NaiveDate, at: Coordinate) -> (NaiveDate, i64, i64) {
        // 1e-4 degrees is roughly 11 m.
        (
            date,
            (at.latitude * 10_000.0).round() as i64,
            (at.longitude * 10_000.0).round() as i64,
        )
    }
}

#[async_trait]
impl<P: PrayerTimeProvider> PrayerTimeProvider for CachingProvider<P> {
    async fn fetch(&self, date: NaiveDate, at: Coordinate) -> ProviderOutcome {
        let key = Self::key(date, at);
        if let Some(hit) = self.cache.lock().ok().and_then(|c| c.get(&key).cloned()) {
            return ProviderOutcome::Fetched(hit);
        }
        let outcome = self.inner.fetch(date, at).await;
        if let ProviderOutcome::Fetched(table) = &outcome {
            if let Ok(mut cache) = self.cache.lock() {
                cache.insert(key, table.clone());
            }
        }
        outcome
    }
}
