//! Boundary names and minute-of-day arithmetic.

use std::fmt;
use std::str::FromStr;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

pub const MINUTES_PER_DAY: i32 = 1440;

/// A named daily prayer boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Boundary {
    /// Imsak, shortly before dawn.
    PreDawn,
    /// Fajr.
    Dawn,
    /// Dhuhr.
    Midday,
    /// Maghrib.
    Sunset,
    /// Midpoint between sunset and the next dawn.
    Midnight,
}

impl Boundary {
    pub const ALL: [Boundary; 5] = [
        Boundary::PreDawn,
        Boundary::Dawn,
        Boundary::Midday,
        Boundary::Sunset,
        Boundary::Midnight,
    ];

    /// Boundaries that can carry an alarm, in daily order.
    pub const ALARMABLE: [Boundary; 3] = [Boundary::Dawn, Boundary::Midday, Boundary::Sunset];

    pub fn name(self) -> &'static str {
        match self {
            Boundary::PreDawn => "pre_dawn",
            Boundary::Dawn => "dawn",
            Boundary::Midday => "midday",
            Boundary::Sunset => "sunset",
            Boundary::Midnight => "midnight",
        }
    }

    /// Display name, also the key used by the timings service.
    pub fn label(self) -> &'static str {
        match self {
            Boundary::PreDawn => "Imsak",
            Boundary::Dawn => "Fajr",
            Boundary::Midday => "Dhuhr",
            Boundary::Sunset => "Maghrib",
            Boundary::Midnight => "Midnight",
        }
    }

    pub fn is_alarmable(self) -> bool {
        Self::ALARMABLE.contains(&self)
    }
}

impl fmt::Display for Boundary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Boundary {
    type Err = ValidationError;

    /// Accepts the snake_case name, the display label, or the hyphenated
    /// form (`pre-dawn`, `solar-midnight`), case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        let boundary = match normalized.as_str() {
            "pre_dawn" | "imsak" => Boundary::PreDawn,
            "dawn" | "fajr" | "subuh" => Boundary::Dawn,
            "midday" | "dhuhr" | "zuhur" => Boundary::Midday,
            "sunset" | "maghrib" => Boundary::Sunset,
            "midnight" | "solar_midnight" => Boundary::Midnight,
            _ => return Err(ValidationError::UnknownBoundary(s.to_string())),
        };
        Ok(boundary)
    }
}

/// Local wall-clock time of day with minute resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ClockTime {
    minutes: u16,
}

impl ClockTime {
    pub fn new(hour: u32, minute: u32) -> Option<Self> {
        if hour < 24 && minute < 60 {
            Some(Self {
                minutes: (hour * 60 + minute) as u16,
            })
        } else {
            None
        }
    }

    /// Fold any minute count into 00:00..=23:59.
    pub fn from_minutes(minutes: i32) -> Self {
        Self {
            minutes: minutes.rem_euclid(MINUTES_PER_DAY) as u16,
        }
    }

    pub fn minutes(self) -> i32 {
        i32::from(self.minutes)
    }

    pub fn hour(self) -> u32 {
        u32::from(self.minutes / 60)
    }

    pub fn minute(self) -> u32 {
        u32::from(self.minutes % 60)
    }

    /// Shift by a signed number of minutes, wrapping around midnight.
    pub fn shift(self, minutes: i32) -> Self {
        Self::from_minutes(self.minutes() + minutes)
    }

    pub fn of(time: NaiveDateTime) -> Self {
        Self::from_minutes((time.hour() * 60 + time.minute()) as i32)
    }

    pub fn to_naive_time(self) -> NaiveTime {
        NaiveTime::from_hms_opt(self.hour(), self.minute(), 0).unwrap_or(NaiveTime::MIN)
    }

    pub fn on(self, date: NaiveDate) -> NaiveDateTime {
        date.and_time(self.to_naive_time())
    }

    /// The first instant at this time of day strictly after `now`.
    pub fn next_after(self, now: NaiveDateTime) -> NaiveDateTime {
        let today = self.on(now.date());
        if today > now {
            today
        } else {
            today + Duration::days(1)
        }
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

impl FromStr for ClockTime {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ValidationError::InvalidTime(s.to_string());
        let (h, m) = s.trim().split_once(':').ok_or_else(invalid)?;
        if h.is_empty() || h.len() > 2 || m.len() != 2 {
            return Err(invalid());
        }
        let hour = h.parse::<u32>().map_err(|_| invalid())?;
        let minute = m.parse::<u32>().map_err(|_| invalid())?;
        Self::new(hour, minute).ok_or_else(invalid)
    }
}

impl TryFrom<String> for ClockTime {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ClockTime> for String {
    fn from(value: ClockTime) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 11)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    #[test]
    fn parses_and_formats() {
        let t: ClockTime = "05:30".parse().unwrap();
        assert_eq!(t.minutes(), 330);
        assert_eq!(t.to_string(), "05:30");
        assert_eq!("4:07".parse::<ClockTime>().unwrap().to_string(), "04:07");
    }

    #[test]
    fn rejects_malformed_times() {
        for bad in ["", "24:00", "12:60", "12", "ab:cd", "12:5", "-1:30"] {
            assert!(bad.parse::<ClockTime>().is_err(), "{bad} should fail");
        }
    }

    #[test]
    fn shift_wraps_both_ways() {
        let t: ClockTime = "23:50".parse().unwrap();
        assert_eq!(t.shift(15).to_string(), "00:05");
        let t: ClockTime = "00:10".parse().unwrap();
        assert_eq!(t.shift(-25).to_string(), "23:45");
    }

    #[test]
    fn next_after_rolls_to_tomorrow_when_not_in_future() {
        let dawn: ClockTime = "05:30".parse().unwrap();
        assert_eq!(dawn.next_after(at(5, 0, 0)), at(5, 30, 0));
        assert_eq!(
            dawn.next_after(at(5, 30, 0)),
            at(5, 30, 0) + Duration::days(1)
        );
    }

    #[test]
    fn boundary_names_parse() {
        assert_eq!("Fajr".parse::<Boundary>().unwrap(), Boundary::Dawn);
        assert_eq!("pre-dawn".parse::<Boundary>().unwrap(), Boundary::PreDawn);
        assert_eq!(
            "solar-midnight".parse::<Boundary>().unwrap(),
            Boundary::Midnight
        );
        assert!("asr".parse::<Boundary>().is_err());
        assert!(!Boundary::PreDawn.is_alarmable());
        assert!(Boundary::Sunset.is_alarmable());
    }

    #[test]
    fn serde_uses_hh_mm_strings() {
        let t: ClockTime = serde_json::from_str("\"18:00\"").unwrap();
        assert_eq!(serde_json::to_string(&t).unwrap(), "\"18:00\"");
        assert!(serde_json::from_str::<ClockTime>("\"25:00\"").is_err());
    }
}
