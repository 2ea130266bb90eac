//! Integration tests for per-user scoping over the SQLite store.

use std::sync::Arc;

use miqat_core::storage::Database;
use miqat_core::{AdjustmentStore, AlarmStore, Boundary, KeyValueStore, SessionKeyScope};

fn open(dir: &tempfile::TempDir) -> Arc<SessionKeyScope<Database>> {
    let db = Database::open_at(&dir.path().join("miqat.db")).unwrap();
    Arc::new(SessionKeyScope::restore(db).unwrap())
}

#[test]
fn test_users_never_see_each_others_settings() {
    let dir = tempfile::tempdir().unwrap();
    let scope = open(&dir);
    let adjustments = AdjustmentStore::new(scope.clone());
    let alarms = AlarmStore::new(scope.clone());

    scope.start_session("alice").unwrap();
    adjustments.set(Boundary::Dawn, 3).unwrap();
    alarms.set(Boundary::Sunset, true).unwrap();
    scope.end_session().unwrap();

    scope.start_session("bob").unwrap();
    assert_eq!(adjustments.get(Boundary::Dawn).unwrap(), 0);
    assert!(!alarms.is_enabled(Boundary::Sunset).unwrap());
    adjustments.set(Boundary::Dawn, -7).unwrap();
    scope.end_session().unwrap();

    scope.start_session("alice").unwrap();
    assert_eq!(adjustments.get(Boundary::Dawn).unwrap(), 3);
    assert!(alarms.is_enabled(Boundary::Sunset).unwrap());

    let physical = scope.inner().keys().unwrap();
    assert!(physical.contains(&"user_alice_prayer_adjustments".to_string()));
    assert!(physical.contains(&"user_bob_prayer_adjustments".to_string()));
    assert!(!physical.contains(&"prayer_adjustments".to_string()));
}

#[test]
fn test_legacy_settings_migrate_on_first_login() {
    let dir = tempfile::tempdir().unwrap();
    let scope = open(&dir);
    let adjustments = AdjustmentStore::new(scope.clone());

    // Written before any session existed.
    adjustments.set(Boundary::Midday, 2).unwrap();
    scope.inner().set("temp_draft", "x").unwrap();

    scope.start_session("carol").unwrap();
    assert_eq!(adjustments.get(Boundary::Midday).unwrap(), 2);
    assert!(scope.inner().get("prayer_adjustments").unwrap().is_none());
    assert!(scope.inner().get("temp_draft").unwrap().is_none());
}

#[test]
fn test_session_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    {
        let scope = open(&dir);
        scope.start_session("dina").unwrap();
        AdjustmentStore::new(scope.clone())
            .set(Boundary::Sunset, 4)
            .unwrap();
    }

    let scope = open(&dir);
    assert_eq!(scope.active_user().as_deref(), Some("dina"));
    assert_eq!(
        AdjustmentStore::new(scope.clone())
            .get(Boundary::Sunset)
            .unwrap(),
        4
    );
    // Global keys stay bare.
    assert_eq!(scope.get("user").unwrap().as_deref(), Some("dina"));
}
