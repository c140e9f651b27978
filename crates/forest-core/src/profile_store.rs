//! Profile store: the single current user profile plus the onboarding flag.
//!
//! Reads are defensive (corrupt or out-of-range stored profiles read as absent). Writes
//! validate the whole record first and keep an in-process copy so a later `load` always
//! sees the last successful write, whatever the backend hands back.

use crate::clock::Clock;
use crate::error::{EngineError, EngineResult};
use crate::persistence::StoreHandle;
use crate::shared::{ProfileDraft, ProfilePatch, UserProfile, ONBOARDING_FLAG_KEY, PROFILE_KEY};
use std::sync::{Arc, RwLock};

pub struct ProfileStore {
    store: StoreHandle,
    clock: Arc<dyn Clock>,
    current: RwLock<Option<UserProfile>>,
}

impl ProfileStore {
    pub fn new(store: StoreHandle, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            current: RwLock::new(None),
        }
    }

    /// Current profile, or `None` when nothing valid has been saved.
    pub fn load(&self) -> Option<UserProfile> {
        if let Some(p) = self.current.read().unwrap_or_else(|e| e.into_inner()).as_ref() {
            return Some(p.clone());
        }
        let profile = self.read_persisted()?;
        *self.current.write().unwrap_or_else(|e| e.into_inner()) = Some(profile.clone());
        Some(profile)
    }

    fn read_persisted(&self) -> Option<UserProfile> {
        let bytes = match self.store.get(PROFILE_KEY) {
            Ok(Some(b)) => b,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(target: "forest::profile", error = %e, "profile read failed; treating as absent");
                return None;
            }
        };
        let profile: UserProfile = match serde_json::from_slice(&bytes) {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!(target: "forest::profile", error = %e, "corrupt stored profile; treating as absent");
                return None;
            }
        };
        if let Err(e) = profile.validate() {
            tracing::warn!(target: "forest::profile", error = %e, "stored profile fails validation; treating as absent");
            return None;
        }
        Some(profile)
    }

    /// Validates and persists `profile`, replacing any existing one.
    pub fn save(&self, profile: &UserProfile) -> EngineResult<()> {
        profile.validate()?;
        let bytes = serde_json::to_vec(profile).map_err(crate::error::StorageError::from)?;
        self.store.set(PROFILE_KEY, &bytes)?;
        *self.current.write().unwrap_or_else(|e| e.into_inner()) = Some(profile.clone());
        tracing::info!(
            target: "forest::profile",
            user_id = %profile.id,
            stress_level = profile.stress_level,
            "profile saved"
        );
        Ok(())
    }

    /// Merges `patch` onto the current profile. On any validation error nothing changes.
    pub fn update(&self, patch: &ProfilePatch) -> EngineResult<UserProfile> {
        let base = self.load().ok_or(EngineError::ProfileMissing)?;
        let merged = patch.apply(&base)?;
        self.save(&merged)?;
        Ok(merged)
    }

    pub fn set_stress_level(&self, level: i64) -> EngineResult<UserProfile> {
        self.update(&ProfilePatch::stress_level(level))
    }

    /// Builds a profile from onboarding answers, saves it, and marks onboarding complete.
    pub fn create(&self, draft: ProfileDraft) -> EngineResult<UserProfile> {
        let profile = draft.into_profile(self.clock.now_utc())?;
        self.save(&profile)?;
        self.set_onboarding_completed(true)?;
        Ok(profile)
    }

    pub fn set_onboarding_completed(&self, completed: bool) -> EngineResult<()> {
        let bytes = serde_json::to_vec(&completed).map_err(crate::error::StorageError::from)?;
        self.store.set(ONBOARDING_FLAG_KEY, &bytes)?;
        Ok(())
    }

    /// Absent or unreadable flag counts as not completed.
    pub fn is_onboarding_completed(&self) -> bool {
        match self.store.get(ONBOARDING_FLAG_KEY) {
            Ok(Some(bytes)) => serde_json::from_slice::<bool>(&bytes).unwrap_or(false),
            Ok(None) => false,
            Err(e) => {
                tracing::warn!(target: "forest::profile", error = %e, "onboarding flag read failed");
                false
            }
        }
    }

    /// Logout: wipes every key the core owns and forgets the cached profile.
    pub fn clear_all(&self) -> EngineResult<()> {
        self.store.clear_all()?;
        *self.current.write().unwrap_or_else(|e| e.into_inner()) = None;
        tracing::info!(target: "forest::profile", "all user data cleared");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;
    use crate::error::ValidationError;
    use crate::persistence::{KeyValueStore, MemoryStore};

    fn draft(stress: i64) -> ProfileDraft {
        ProfileDraft {
            name: "Jiho".to_string(),
            age: 41,
            location: "Daejeon".to_string(),
            stress_level: stress,
            ..Default::default()
        }
    }

    fn new_store() -> (Arc<MemoryStore>, ProfileStore) {
        let mem = Arc::new(MemoryStore::new());
        let store = ProfileStore::new(mem.clone(), Arc::new(SystemClock));
        (mem, store)
    }

    #[test]
    fn load_on_empty_store_is_none() {
        let (_, store) = new_store();
        assert!(store.load().is_none());
        assert!(!store.is_onboarding_completed());
    }

    #[test]
    fn create_saves_and_flags_onboarding() {
        let (_, store) = new_store();
        let profile = store.create(draft(7)).unwrap();
        assert_eq!(store.load(), Some(profile));
        assert!(store.is_onboarding_completed());
    }

    #[test]
    fn update_out_of_range_leaves_profile_unchanged() {
        let (_, store) = new_store();
        let before = store.create(draft(4)).unwrap();
        let err = store.set_stress_level(0).unwrap_err();
        assert!(matches!(
            err,
            EngineError::Validation(ValidationError::StressOutOfRange { value: 0, .. })
        ));
        assert_eq!(store.load(), Some(before));
    }

    #[test]
    fn update_without_profile_is_missing() {
        let (_, store) = new_store();
        assert!(matches!(store.set_stress_level(5), Err(EngineError::ProfileMissing)));
    }

    #[test]
    fn corrupt_profile_reads_as_absent() {
        let (mem, store) = new_store();
        mem.set(PROFILE_KEY, b"{\"id\": 12").unwrap();
        assert!(store.load().is_none());
    }

    #[test]
    fn stored_out_of_range_profile_reads_as_absent() {
        let (mem, store) = new_store();
        let raw = serde_json::json!({
            "id": "user_x",
            "stress_level": 42,
            "created_at": "2026-10-01T09:00:00Z"
        });
        mem.set(PROFILE_KEY, raw.to_string().as_bytes()).unwrap();
        assert!(store.load().is_none());
    }

    #[test]
    fn save_rejects_empty_id() {
        let (_, store) = new_store();
        let mut profile = draft(5).into_profile(chrono::Utc::now()).unwrap();
        profile.id = "  ".to_string();
        assert!(matches!(
            store.save(&profile),
            Err(EngineError::Validation(ValidationError::EmptyId))
        ));
    }

    #[test]
    fn read_after_write_ignores_stale_backend() {
        let (mem, store) = new_store();
        store.create(draft(5)).unwrap();
        let updated = store.set_stress_level(8).unwrap();
        // Backend regresses to garbage; the process still sees its own write.
        mem.set(PROFILE_KEY, b"garbage").unwrap();
        assert_eq!(store.load(), Some(updated));
    }

    #[test]
    fn clear_all_forgets_profile() {
        let (mem, store) = new_store();
        store.create(draft(5)).unwrap();
        store.clear_all().unwrap();
        assert!(store.load().is_none());
        assert!(!store.is_onboarding_completed());
        assert!(mem.is_empty());
    }
}
