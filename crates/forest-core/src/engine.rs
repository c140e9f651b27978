//! `WellnessEngine`: the four components wired over one store, clock and AI handle.

use crate::activity_log::ActivityLog;
use crate::ai_service::{AiTextService, OpenRouterAiService, UnconfiguredAiService};
use crate::analytics::{AnalyticsAggregator, NoiseSource, ProgressReport, ProgressWindow, RandomNoise};
use crate::clock::{Clock, SystemClock};
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::persistence::{SledStore, StoreHandle};
use crate::profile_store::ProfileStore;
use crate::recommendation::RecommendationEngine;
use crate::shared::{
    ActivityKind, ActivityRecord, NewActivity, ProfileDraft, ProfilePatch, Recommendation,
    RecommendationKind, UserProfile, STRESS_MIN,
};
use std::sync::Arc;

/// Minutes credited when a recommendation is marked completed.
const COMPLETED_RECOMMENDATION_MINUTES: i64 = 10;
const COMPLETION_NOTE_CHARS: usize = 50;
/// How many activities the dashboard lists.
pub const RECENT_ACTIVITY_LIMIT: usize = 5;

pub struct WellnessEngine {
    profiles: Arc<ProfileStore>,
    activities: Arc<ActivityLog>,
    recommendations: RecommendationEngine,
    analytics: AnalyticsAggregator,
}

impl WellnessEngine {
    pub fn new(
        store: StoreHandle,
        clock: Arc<dyn Clock>,
        ai: Arc<dyn AiTextService>,
        noise: Arc<dyn NoiseSource>,
    ) -> Self {
        let profiles = Arc::new(ProfileStore::new(store.clone(), clock.clone()));
        let activities = Arc::new(ActivityLog::new(store.clone(), clock.clone()));
        let recommendations = RecommendationEngine::new(store, clock.clone(), ai);
        let analytics = AnalyticsAggregator::new(activities.clone(), profiles.clone(), clock, noise);
        Self {
            profiles,
            activities,
            recommendations,
            analytics,
        }
    }

    /// Production wiring: sled at `data_path`, system clock, random mood noise, and the
    /// OpenRouter service when a key is configured (otherwise every recommendation falls back).
    pub fn from_config(config: &EngineConfig) -> EngineResult<Self> {
        let store: StoreHandle = Arc::new(SledStore::open_path(&config.data_path)?);
        let ai: Arc<dyn AiTextService> = match OpenRouterAiService::from_config(config) {
            Some(service) => Arc::new(service),
            None => {
                tracing::warn!(
                    target: "forest::ai",
                    "no AI API key configured; recommendations will use the offline fallback"
                );
                Arc::new(UnconfiguredAiService)
            }
        };
        Ok(Self::new(store, Arc::new(SystemClock), ai, Arc::new(RandomNoise))
            .with_ai_timeout(config.ai_timeout()))
    }

    pub fn with_ai_timeout(mut self, timeout: std::time::Duration) -> Self {
        self.recommendations = self.recommendations.with_timeout(timeout);
        self
    }

    pub fn profiles(&self) -> &ProfileStore {
        &self.profiles
    }

    pub fn activities(&self) -> &ActivityLog {
        &self.activities
    }

    pub fn recommendations(&self) -> &RecommendationEngine {
        &self.recommendations
    }

    pub fn analytics(&self) -> &AnalyticsAggregator {
        &self.analytics
    }

    /// Finishes onboarding: creates and saves the profile, sets the onboarding flag.
    pub fn onboard(&self, draft: ProfileDraft) -> EngineResult<UserProfile> {
        self.profiles.create(draft)
    }

    pub fn update_profile(&self, patch: &ProfilePatch) -> EngineResult<UserProfile> {
        self.profiles.update(patch)
    }

    pub fn update_stress(&self, level: i64) -> EngineResult<UserProfile> {
        self.profiles.set_stress_level(level)
    }

    /// The daily recommendation for the current profile (cached for the rest of the day).
    pub async fn daily_recommendation(&self) -> EngineResult<Recommendation> {
        self.recommend(RecommendationKind::Daily, None).await
    }

    pub async fn weekly_recommendation(&self) -> EngineResult<Recommendation> {
        self.recommend(RecommendationKind::Weekly, None).await
    }

    pub async fn emergency_recommendation(&self) -> EngineResult<Recommendation> {
        self.recommend(RecommendationKind::Emergency, None).await
    }

    /// Only a missing profile can fail here; AI trouble yields a fallback recommendation.
    pub async fn recommend(
        &self,
        kind: RecommendationKind,
        custom_prompt: Option<&str>,
    ) -> EngineResult<Recommendation> {
        let profile = self.profiles.load().ok_or(EngineError::ProfileMissing)?;
        Ok(self.recommendations.generate(&profile, kind, custom_prompt).await)
    }

    pub fn log_activity(&self, activity: NewActivity) -> EngineResult<ActivityRecord> {
        self.activities.append(activity)
    }

    /// Logs a short virtual-tour activity for a completed recommendation, assuming a
    /// one-point stress improvement over the profile baseline.
    pub fn complete_recommendation(&self, recommendation: &Recommendation) -> EngineResult<ActivityRecord> {
        let profile = self.profiles.load().ok_or(EngineError::ProfileMissing)?;
        let stress = (profile.stress_level.saturating_sub(1)).max(STRESS_MIN);
        let excerpt: String = recommendation.content.chars().take(COMPLETION_NOTE_CHARS).collect();
        let activity = NewActivity::new(
            ActivityKind::VirtualTour,
            COMPLETED_RECOMMENDATION_MINUTES,
            stress as i64,
        )
        .with_note(format!("Completed recommendation: {}...", excerpt));
        let record = self.activities.append(activity)?;
        tracing::info!(
            target: "forest::activity",
            recommendation_id = %recommendation.id,
            activity_id = %record.id,
            "recommendation marked completed"
        );
        Ok(record)
    }

    /// Newest first, for the dashboard.
    pub fn recent_activities(&self, n: usize) -> Vec<ActivityRecord> {
        let mut recent = self.activities.recent_n(n);
        recent.reverse();
        recent
    }

    pub fn progress(&self, window: ProgressWindow) -> EngineResult<ProgressReport> {
        self.analytics.recompute(window)
    }

    /// Wipes profile, activity log, recommendation history and the onboarding flag.
    pub fn logout(&self) -> EngineResult<()> {
        self.profiles.clear_all()?;
        self.recommendations.forget_issued();
        Ok(())
    }
}
