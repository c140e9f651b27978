//! Integration test: profile lifecycle, activity log, sled persistence across reopen, and
//! behaviour over an unreliable store.

use chrono::{Duration, FixedOffset, TimeZone};
use forest_core::{
    ActivityKind, Clock, EngineError, FixedClock, KeyValueStore, MemoryStore, NewActivity,
    ProfileDraft, ProfilePatch, ProgressWindow, SledStore, StorageError, StoreHandle,
    UnconfiguredAiService, ValidationError, WellnessEngine, ZeroNoise, PROFILE_KEY,
    RECENT_ACTIVITY_LIMIT, RECOMMENDATION_HISTORY_KEY, STRESS_MAX, STRESS_MIN,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::tempdir;

/// In-memory store whose next N reads fail and which can refuse writes to one key.
#[derive(Default)]
struct UnreliableStore {
    inner: MemoryStore,
    failing_gets: AtomicUsize,
    read_only_key: Option<&'static str>,
}

impl UnreliableStore {
    fn fail_next_get(&self) {
        self.failing_gets.store(1, Ordering::SeqCst);
    }
}

impl KeyValueStore for UnreliableStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        if self
            .failing_gets
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(StorageError::Backend("connection reset".to_string()));
        }
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<(), StorageError> {
        if self.read_only_key == Some(key) {
            return Err(StorageError::Backend("disk full".to_string()));
        }
        self.inner.set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.inner.remove(key)
    }
}

fn clock() -> Arc<FixedClock> {
    let kst = FixedOffset::east_opt(9 * 3600).unwrap();
    Arc::new(FixedClock::new(kst.with_ymd_and_hms(2026, 10, 18, 10, 0, 0).unwrap()))
}

fn engine(store: StoreHandle, clock: Arc<FixedClock>) -> WellnessEngine {
    WellnessEngine::new(store, clock, Arc::new(UnconfiguredAiService), Arc::new(ZeroNoise))
}

fn draft() -> ProfileDraft {
    ProfileDraft {
        name: "Seo-yeon".to_string(),
        age: 29,
        location: "Seoul".to_string(),
        stress_level: 6,
        preferred_activities: ["meditation".to_string()].into_iter().collect(),
        ..Default::default()
    }
}

#[test]
fn onboarding_sets_flag_and_profile() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let engine = engine(MemoryStore::handle(), clock());
    assert!(!engine.profiles().is_onboarding_completed());
    assert!(engine.profiles().load().is_none());

    let profile = engine.onboard(draft()).unwrap();
    assert!(profile.id.starts_with("user_"));
    assert!(engine.profiles().is_onboarding_completed());
    assert_eq!(engine.profiles().load(), Some(profile));
}

#[test]
fn stress_update_accepts_only_the_valid_range() {
    let engine = engine(MemoryStore::handle(), clock());
    engine.onboard(draft()).unwrap();

    for level in -5i64..=15 {
        let before = engine.profiles().load().unwrap();
        let result = engine.update_stress(level);
        let after = engine.profiles().load().unwrap();
        if (STRESS_MIN as i64..=STRESS_MAX as i64).contains(&level) {
            assert_eq!(result.unwrap().stress_level as i64, level);
            assert_eq!(after.stress_level as i64, level);
        } else {
            assert!(matches!(
                result,
                Err(EngineError::Validation(ValidationError::StressOutOfRange { .. }))
            ));
            assert_eq!(after, before, "rejected update must leave the profile untouched");
        }
    }
}

#[test]
fn patch_keeps_id_and_creation_time() {
    let engine = engine(MemoryStore::handle(), clock());
    let original = engine.onboard(draft()).unwrap();
    let patch = ProfilePatch {
        location: Some("Busan".to_string()),
        ..Default::default()
    };
    let updated = engine.update_profile(&patch).unwrap();
    assert_eq!(updated.location, "Busan");
    assert_eq!(updated.id, original.id);
    assert_eq!(updated.created_at, original.created_at);
    assert_eq!(updated.stress_level, original.stress_level);
}

#[test]
fn update_without_profile_is_missing() {
    let engine = engine(MemoryStore::handle(), clock());
    assert!(matches!(engine.update_stress(4), Err(EngineError::ProfileMissing)));
}

#[test]
fn invalid_activity_is_rejected_and_not_stored() {
    let engine = engine(MemoryStore::handle(), clock());
    assert!(engine
        .log_activity(NewActivity::new(ActivityKind::Meditation, -3, 4))
        .is_err());
    assert!(engine
        .log_activity(NewActivity::new(ActivityKind::Meditation, 10, 0))
        .is_err());
    assert!(engine.activities().is_empty());
}

#[test]
fn recent_activities_are_newest_first() {
    let clock = clock();
    let engine = engine(MemoryStore::handle(), clock.clone());
    for i in 0..8 {
        engine
            .log_activity(
                NewActivity::new(ActivityKind::ForestVisit, 30, 5)
                    .with_id(format!("act_{}", i))
                    .at(clock.now_utc() - Duration::hours(8 - i)),
            )
            .unwrap();
    }
    let recent = engine.recent_activities(RECENT_ACTIVITY_LIMIT);
    let ids: Vec<&str> = recent.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["act_7", "act_6", "act_5", "act_4", "act_3"]);
    assert_eq!(engine.recent_activities(0), vec![]);
    assert_eq!(engine.recent_activities(100).len(), 8);
}

#[tokio::test]
async fn logout_wipes_everything() {
    let engine = engine(MemoryStore::handle(), clock());
    engine.onboard(draft()).unwrap();
    engine
        .log_activity(NewActivity::new(ActivityKind::ArExperience, 20, 5))
        .unwrap();
    engine.daily_recommendation().await.unwrap();

    engine.logout().unwrap();
    assert!(engine.profiles().load().is_none());
    assert!(!engine.profiles().is_onboarding_completed());
    assert!(engine.activities().is_empty());
    assert!(engine.recommendations().history().is_empty());
}

#[tokio::test]
async fn sled_store_survives_reopen() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let dir = tempdir().unwrap();
    let path = dir.path().join("forest_store");
    let clock = clock();

    let (profile_id, daily_id) = {
        let store: StoreHandle = Arc::new(SledStore::open_path(&path).unwrap());
        let engine = engine(store, clock.clone());
        let profile = engine.onboard(draft()).unwrap();
        engine
            .log_activity(NewActivity::new(ActivityKind::Meditation, 25, 3))
            .unwrap();
        let daily = engine.daily_recommendation().await.unwrap();
        assert!(daily.is_fallback);
        (profile.id, daily.id)
    };

    let store: StoreHandle = Arc::new(SledStore::open_path(&path).unwrap());
    let engine = engine(store, clock.clone());
    assert_eq!(engine.profiles().load().unwrap().id, profile_id);
    assert!(engine.profiles().is_onboarding_completed());
    assert_eq!(engine.activities().len(), 1);
    // Same day after restart: the stored daily is reused.
    assert_eq!(engine.daily_recommendation().await.unwrap().id, daily_id);

    let report = engine.progress(ProgressWindow::Week).unwrap();
    assert_eq!(report.summary.total_duration_minutes, 25);
    assert_eq!(report.snapshots.last().unwrap().date, clock.today());
}

#[test]
fn corrupt_stored_profile_reads_as_absent() {
    let store = MemoryStore::handle();
    store.set(PROFILE_KEY, b"{not json").unwrap();
    let engine = engine(store, clock());
    assert!(engine.profiles().load().is_none());
}

#[tokio::test]
async fn transient_read_error_never_truncates_stored_arrays() {
    let store = Arc::new(UnreliableStore::default());
    let engine = engine(store.clone(), clock());
    engine.onboard(draft()).unwrap();
    for _ in 0..5 {
        engine
            .log_activity(NewActivity::new(ActivityKind::ForestVisit, 30, 4))
            .unwrap();
    }
    for _ in 0..3 {
        engine.weekly_recommendation().await.unwrap();
    }

    store.fail_next_get();
    let err = engine
        .log_activity(NewActivity::new(ActivityKind::ForestVisit, 30, 4))
        .unwrap_err();
    assert!(matches!(err, EngineError::Storage(_)));
    assert_eq!(engine.activities().len(), 5);

    // The engine reads the profile from its in-process copy, so the failing read hits history.
    store.fail_next_get();
    let emergency = engine.emergency_recommendation().await.unwrap();
    assert!(emergency.is_fallback);
    assert_eq!(engine.recommendations().history().len(), 3);

    engine
        .log_activity(NewActivity::new(ActivityKind::ForestVisit, 30, 4))
        .unwrap();
    assert_eq!(engine.activities().len(), 6);
}

#[tokio::test]
async fn one_daily_per_day_even_when_history_write_fails() {
    let store = Arc::new(UnreliableStore {
        read_only_key: Some(RECOMMENDATION_HISTORY_KEY),
        ..Default::default()
    });
    let engine = engine(store, clock());
    engine.onboard(draft()).unwrap();

    let first = engine.daily_recommendation().await.unwrap();
    let second = engine.daily_recommendation().await.unwrap();
    assert_eq!(second.id, first.id);
    assert_eq!(second.content, first.content);
    assert!(engine.recommendations().history().is_empty());
}
