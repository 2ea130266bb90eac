//! Per-user key scoping over any [`KeyValueStore`].
//!
//! While a session is active every non-global logical key `k` is stored as
//! `user_<id>_k`. Global keys (auth token, identity, theme, language,
//! app-wide settings) always keep their bare name.
//!
//! Values written under a bare key before any session existed are migrated
//! into the active user's scope the first time that key is touched: copied
//! only if the scoped key is still empty, then the bare key is deleted. A
//! bare key shaped like another user's scoped key is never migrated.
//!
//! User ids are restricted to ASCII letters, digits and `-`, so the `_`
//! after the id always ends the prefix.

use std::sync::RwLock;

use super::KeyValueStore;
use crate::error::{CoreError, StorageError, ValidationError};

/// Logical keys that are never scoped.
pub const GLOBAL_KEYS: &[&str] = &["auth_token", "user", "theme", "language", "app_settings"];

/// Global key that remembers the active user between processes.
const SESSION_KEY: &str = "user";

/// Prefixes of throwaway data cleared at session start.
const EPHEMERAL_PREFIXES: &[&str] = &["guest_", "temp_"];

const SCOPE_PREFIX: &str = "user_";

/// Decorator that namespaces keys by the active user.
pub struct SessionKeyScope<S> {
    inner: S,
    user: RwLock<Option<String>>,
}

impl<S: KeyValueStore> SessionKeyScope<S> {
    /// Wrap a store with no active session.
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            user: RwLock::new(None),
        }
    }

    /// Wrap a store and resume the session recorded in it, if any.
    pub fn restore(inner: S) -> Result<Self, StorageError> {
        let user = inner.get(SESSION_KEY)?.filter(|id| !id.is_empty());
        let user = match user {
            Some(id) if validate_user_id(&id).is_err() => {
                tracing::warn!(user = %id, "ignoring stored session with invalid user id");
                None
            }
            other => other,
        };
        if let Some(id) = &user {
            tracing::debug!(user = %id, "restored session");
        }
        Ok(Self {
            inner,
            user: RwLock::new(user),
        })
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn active_user(&self) -> Option<String> {
        self.user.read().ok().and_then(|u| u.clone())
    }

    /// Begin a session for `user_id`.
    ///
    /// Clears `guest_*` and `temp_*` keys. Existing `user_*` data of any
    /// user is left untouched.
    pub fn start_session(&self, user_id: &str) -> Result<(), CoreError> {
        validate_user_id(user_id)?;
        let mut cleared = 0usize;
        for key in self.inner.keys()? {
            if EPHEMERAL_PREFIXES.iter().any(|p| key.starts_with(p)) {
                self.inner.remove(&key)?;
                cleared += 1;
            }
        }
        self.inner.set(SESSION_KEY, user_id)?;
        *self.user.write().map_err(StorageError::from)? = Some(user_id.to_string());
        tracing::info!(user = %user_id, cleared, "session started");
        Ok(())
    }

    /// End the active session. Scoped data stays for the next login.
    pub fn end_session(&self) -> Result<(), StorageError> {
        self.inner.remove(SESSION_KEY)?;
        let previous = self.user.write()?.take();
        if let Some(id) = previous {
            tracing::info!(user = %id, "session ended");
        }
        Ok(())
    }

    /// The physical key a logical key maps to right now.
    pub fn scoped_key(&self, key: &str) -> String {
        match self.active_user() {
            Some(id) if !GLOBAL_KEYS.contains(&key) => format!("{SCOPE_PREFIX}{id}_{key}"),
            _ => key.to_string(),
        }
    }

    /// Move a legacy bare value into the user's scope.
    fn migrate_legacy(&self, key: &str, scoped: &str) -> Result<(), StorageError> {
        if scope_owner(key).is_some() {
            return Ok(());
        }
        let Some(legacy) = self.inner.get(key)? else {
            return Ok(());
        };
        if self.inner.get(scoped)?.is_none() {
            self.inner.set(scoped, &legacy)?;
            tracing::info!(key, scoped, "migrated legacy key into user scope");
        } else {
            tracing::debug!(key, scoped, "scoped value exists; dropping legacy key");
        }
        self.inner.remove(key)
    }

    /// Resolve the physical key, migrating a legacy value on the way.
    fn resolve(&self, key: &str) -> Result<String, StorageError> {
        let scoped = self.scoped_key(key);
        if scoped != key {
            self.migrate_legacy(key, &scoped)?;
        }
        Ok(scoped)
    }
}

fn validate_user_id(user_id: &str) -> Result<(), ValidationError> {
    let valid = !user_id.is_empty()
        && user_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-');
    if valid {
        Ok(())
    } else {
        Err(ValidationError::InvalidValue {
            field: "user".into(),
            message: format!("'{user_id}' may only contain ASCII letters, digits and '-'"),
        })
    }
}

/// The user a physical key is scoped to, if it has the `user_<id>_<key>` shape.
fn scope_owner(key: &str) -> Option<&str> {
    let (id, rest) = key.strip_prefix(SCOPE_PREFIX)?.split_once('_')?;
    (validate_user_id(id).is_ok() && !rest.is_empty()).then_some(id)
}

impl<S: KeyValueStore> KeyValueStore for SessionKeyScope<S> {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let physical = self.resolve(key)?;
        self.inner.get(&physical)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let physical = self.resolve(key)?;
        self.inner.set(&physical, value)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let physical = self.resolve(key)?;
        self.inner.remove(&physical)
    }

    /// Logical keys visible to the active user.
    fn keys(&self) -> Result<Vec<String>, StorageError> {
        let all = self.inner.keys()?;
        let Some(id) = self.active_user() else {
            return Ok(all);
        };
        let own = format!("{SCOPE_PREFIX}{id}_");
        Ok(all
            .into_iter()
            .filter_map(|k| {
                if let Some(logical) = k.strip_prefix(&own) {
                    Some(logical.to_string())
                } else if GLOBAL_KEYS.contains(&k.as_str()) {
                    Some(k)
                } else {
                    None
                }
            })
            .collect())
    }
}
