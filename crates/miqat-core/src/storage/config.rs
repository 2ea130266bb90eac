//! TOML-based application configuration.
//!
//! Stores:
//! - Prayer time service endpoint and calculation method
//! - Fallback location and device location limits
//! - Notification and sound preferences
//! - Countdown tick interval
//!
//! Configuration is stored at `<data dir>/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::data_dir;
use crate::error::ConfigError;
use crate::geo::Coordinate;

/// External prayer time service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Calculation convention identifier understood by the service.
    #[serde(default = "default_method")]
    pub method: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Location resolution settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationConfig {
    #[serde(default = "default_fallback_latitude")]
    pub fallback_latitude: f64,
    #[serde(default = "default_fallback_longitude")]
    pub fallback_longitude: f64,
    #[serde(default = "default_fallback_label")]
    pub fallback_label: String,
    #[serde(default = "default_detect_timeout_secs")]
    pub detect_timeout_secs: u64,
    #[serde(default = "default_max_fix_age_secs")]
    pub max_fix_age_secs: u64,
}

/// Notification configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Play the audio cue alongside the notification.
    #[serde(default = "default_true")]
    pub sound: bool,
}

/// Countdown configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountdownConfig {
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
}

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub location: LocationConfig,
    #[serde(default)]
    pub notifications: NotificationsConfig,
    #[serde(default)]
    pub countdown: CountdownConfig,
}

fn default_base_url() -> String {
    "https://api.aladhan.com/v1".into()
}
fn default_method() -> u32 {
    20
}
fn default_timeout_secs() -> u64 {
    10
}
fn default_fallback_latitude() -> f64 {
    -6.2088
}
fn default_fallback_longitude() -> f64 {
    106.8456
}
fn default_fallback_label() -> String {
    "Jakarta".into()
}
fn default_detect_timeout_secs() -> u64 {
    20
}
fn default_max_fix_age_secs() -> u64 {
    60
}
fn default_true() -> bool {
    true
}
fn default_tick_ms() -> u64 {
    1000
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            method: default_method(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            fallback_latitude: default_fallback_latitude(),
            fallback_longitude: default_fallback_longitude(),
            fallback_label: default_fallback_label(),
            detect_timeout_secs: default_detect_timeout_secs(),
            max_fix_age_secs: default_max_fix_age_secs(),
        }
    }
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            sound: true,
        }
    }
}

impl Default for CountdownConfig {
    fn default() -> Self {
        Self {
            tick_ms: default_tick_ms(),
        }
    }
}

impl LocationConfig {
    pub fn fallback(&self) -> Coordinate {
        Coordinate::new(self.fallback_latitude, self.fallback_longitude)
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let (parent_path, leaf) = match key.rsplit_once('.') {
            Some((parent, leaf)) => (Some(parent), leaf),
            None => (None, key),
        };
        if leaf.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        if let Some(parent_path) = parent_path {
            for part in parent_path.split('.') {
                current = current.get_mut(part).ok_or_else(unknown)?;
            }
        }

        let obj = current.as_object_mut().ok_or_else(unknown)?;
        let existing = obj.get(leaf).ok_or_else(unknown)?;

        let new_value = match existing {
            serde_json::Value::Bool(_) => serde_json::Value::Bool(
                value
                    .parse::<bool>()
                    .map_err(|e| invalid(e.to_string()))?,
            ),
            serde_json::Value::Number(n) if n.is_u64() => serde_json::Value::Number(
                value
                    .parse::<u64>()
                    .map_err(|e| invalid(e.to_string()))?
                    .into(),
            ),
            serde_json::Value::Number(_) => {
                let parsed = value.parse::<f64>().map_err(|e| invalid(e.to_string()))?;
                serde_json::Number::from_f64(parsed)
                    .map(serde_json::Value::Number)
                    .ok_or_else(|| invalid(format!("cannot parse '{value}' as number")))?
            }
            serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
            }
            _ => serde_json::Value::String(value.into()),
        };

        obj.insert(leaf.to_string(), new_value);
        Ok(())
    }

    fn path() -> Result<PathBuf, ConfigError> {
        let dir = data_dir().map_err(|e| ConfigError::LoadFailed {
            path: PathBuf::from("config.toml"),
            message: e.to_string(),
        })?;
        Ok(dir.join("config.toml"))
    }

    /// Load from disk, writing defaults when no file exists yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::path()?;
        match std::fs::read_to_string(&path) {
            Ok(content) => toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                path,
                message: e.to_string(),
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save()?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path,
                message: e.to_string(),
            }),
        }
    }

    /// Persist to disk.
    pub fn save(&self) -> Result<(), ConfigError> {
        let path = Self::path()?;
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::SaveFailed {
            path: path.clone(),
            message: e.to_string(),
        })?;
        std::fs::write(&path, content).map_err(|e| ConfigError::SaveFailed {
            path,
            message: e.to_string(),
        })
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by key in memory. Call [`Config::save`] to persist.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json = serde_json::to_value(&*self).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        *self = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Ok(())
    }

    /// All leaf keys with their current values, dot-separated and sorted.
    pub fn entries(&self) -> Vec<(String, String)> {
        fn walk(prefix: &str, value: &serde_json::Value, out: &mut Vec<(String, String)>) {
            match value {
                serde_json::Value::Object(map) => {
                    for (k, v) in map {
                        let path = if prefix.is_empty() {
                            k.clone()
                        } else {
                            format!("{prefix}.{k}")
                        };
                        walk(&path, v, out);
                    }
                }
                serde_json::Value::String(s) => out.push((prefix.to_string(), s.clone())),
                other => out.push((prefix.to_string(), other.to_string())),
            }
        }

        let mut out = Vec::new();
        if let Ok(json) = serde_json::to_value(self) {
            walk("", &json, &mut out);
        }
        out.sort();
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.provider.method, 20);
        assert_eq!(parsed.location.fallback_label, "Jakarta");
    }

    #[test]
    fn partial_file_fills_defaults() {
        let parsed: Config = toml::from_str("[provider]\nmethod = 3\n").unwrap();
        assert_eq!(parsed.provider.method, 3);
        assert_eq!(parsed.provider.timeout_secs, 10);
        assert_eq!(parsed.countdown.tick_ms, 1000);
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("notifications.sound").as_deref(), Some("true"));
        assert_eq!(cfg.get("location.detect_timeout_secs").as_deref(), Some("20"));
        assert!(cfg.get("location.missing_key").is_none());
    }

    #[test]
    fn set_updates_typed_values() {
        let mut cfg = Config::default();
        cfg.set("notifications.enabled", "false").unwrap();
        cfg.set("provider.method", "11").unwrap();
        cfg.set("location.fallback_latitude", "21.4225").unwrap();
        cfg.set("provider.base_url", "http://127.0.0.1:9").unwrap();
        assert!(!cfg.notifications.enabled);
        assert_eq!(cfg.provider.method, 11);
        assert!((cfg.location.fallback_latitude - 21.4225).abs() < 1e-9);
        assert_eq!(cfg.provider.base_url, "http://127.0.0.1:9");
    }

    #[test]
    fn set_rejects_unknown_key_and_bad_type() {
        let mut cfg = Config::default();
        assert!(matches!(
            cfg.set("provider.nonexistent", "1"),
            Err(ConfigError::UnknownKey(_))
        ));
        assert!(matches!(
            cfg.set("notifications.enabled", "maybe"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            cfg.set("provider.method", "-1"),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn entries_lists_every_leaf() {
        let entries = Config::default().entries();
        assert!(entries.iter().any(|(k, v)| k == "countdown.tick_ms" && v == "1000"));
        assert!(entries.iter().any(|(k, _)| k == "provider.base_url"));
    }
}
