//! Recommendation engine: profile + horizon -> `Recommendation`.
//!
//! - `Daily` is generated at most once per local calendar day per user; later calls that
//!   day return the stored one without touching the AI service.
//! - `Weekly` and `Emergency` always generate fresh, each with a fixed prompt.
//! - One AI attempt, bounded by a timeout, no retry. Any failure (transport, timeout,
//!   `success=false`, missing text) is logged and replaced by the stress-bucket fallback.
//!   Callers only ever see `is_fallback`.
//! - Every generated recommendation is appended to the history; nothing is overwritten.
//!   The last daily issued to each user is also kept in process, so the daily anchor holds
//!   even when the history write fails.

use crate::ai_service::{AiRequest, AiTextService, ProfileContext};
use crate::clock::{Clock, TimeOfDay};
use crate::error::AiServiceError;
use crate::persistence::{read_json_array, try_read_json_array, write_json_array, StoreHandle};
use crate::prompts::{daily_prompt, fallback_for_stress, EMERGENCY_PROMPT, WEEKLY_PROMPT};
use crate::shared::{Recommendation, RecommendationKind, UserProfile, RECOMMENDATION_HISTORY_KEY};
use chrono::{DateTime, FixedOffset, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;

/// Default bound on the single AI attempt.
pub const DEFAULT_AI_TIMEOUT: Duration = Duration::from_secs(20);

pub struct RecommendationEngine {
    store: StoreHandle,
    clock: Arc<dyn Clock>,
    ai: Arc<dyn AiTextService>,
    timeout: Duration,
    /// Last daily issued per user id, checked before the persisted history.
    issued_daily: DashMap<String, Recommendation>,
}

impl RecommendationEngine {
    pub fn new(store: StoreHandle, clock: Arc<dyn Clock>, ai: Arc<dyn AiTextService>) -> Self {
        Self {
            store,
            clock,
            ai,
            timeout: DEFAULT_AI_TIMEOUT,
            issued_daily: DashMap::new(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Produces a recommendation. Never fails: the fallback is the terminal safety net.
    pub async fn generate(
        &self,
        profile: &UserProfile,
        kind: RecommendationKind,
        custom_prompt: Option<&str>,
    ) -> Recommendation {
        if kind == RecommendationKind::Daily {
            if let Some(cached) = self.today_daily(profile) {
                tracing::debug!(
                    target: "forest::recommendation",
                    id = %cached.id,
                    "daily recommendation already issued today; reusing"
                );
                return cached;
            }
        }

        let now = self.clock.now();
        let prompt = custom_prompt
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| default_prompt(kind, now));
        let request = AiRequest {
            prompt,
            profile_context: ProfileContext::from_profile(profile, now),
        };

        let (content, is_fallback) = match self.call_ai(&request).await {
            Ok(text) => (text, false),
            Err(e) => {
                tracing::warn!(
                    target: "forest::recommendation",
                    kind = %kind,
                    error = %e,
                    stress_level = profile.stress_level,
                    "AI service unavailable; using fallback recommendation"
                );
                (fallback_for_stress(profile.stress_level).to_string(), true)
            }
        };

        let recommendation = Recommendation {
            id: format!("rec_{}", uuid::Uuid::new_v4().simple()),
            user_id: profile.id.clone(),
            content,
            kind,
            created_at: now.with_timezone(&Utc),
            is_fallback,
        };
        if kind == RecommendationKind::Daily {
            self.issued_daily
                .insert(recommendation.user_id.clone(), recommendation.clone());
        }
        self.append_history(&recommendation);
        tracing::info!(
            target: "forest::recommendation",
            id = %recommendation.id,
            kind = %kind,
            is_fallback,
            chars = recommendation.content.chars().count(),
            "recommendation issued"
        );
        recommendation
    }

    pub async fn daily(&self, profile: &UserProfile) -> Recommendation {
        self.generate(profile, RecommendationKind::Daily, None).await
    }

    pub async fn weekly(&self, profile: &UserProfile) -> Recommendation {
        self.generate(profile, RecommendationKind::Weekly, None).await
    }

    pub async fn emergency(&self, profile: &UserProfile) -> Recommendation {
        self.generate(profile, RecommendationKind::Emergency, None).await
    }

    /// Today's daily recommendation for this user, if one was already issued.
    pub fn today_daily(&self, profile: &UserProfile) -> Option<Recommendation> {
        let today = self.clock.today();
        let is_today = |r: &Recommendation| self.clock.local_date(&r.created_at) == today;
        if let Some(issued) = self.issued_daily.get(&profile.id) {
            if is_today(issued.value()) {
                return Some(issued.value().clone());
            }
        }
        self.history().into_iter().rev().find(|r| {
            r.kind == RecommendationKind::Daily && r.user_id == profile.id && is_today(r)
        })
    }

    /// Drops the in-process daily anchors. Called on logout together with the store wipe.
    pub fn forget_issued(&self) {
        self.issued_daily.clear();
    }

    /// Every stored recommendation, oldest first. Malformed entries are dropped.
    pub fn history(&self) -> Vec<Recommendation> {
        let mut history: Vec<Recommendation> =
            read_json_array(self.store.as_ref(), RECOMMENDATION_HISTORY_KEY, |_| true);
        history.sort_by_key(|r| r.created_at);
        history
    }

    pub fn latest(&self) -> Option<Recommendation> {
        self.history().pop()
    }

    async fn call_ai(&self, request: &AiRequest) -> Result<String, AiServiceError> {
        match tokio::time::timeout(self.timeout, self.ai.complete(request)).await {
            Ok(Ok(response)) => response.into_text(),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(AiServiceError::Timeout(self.timeout)),
        }
    }

    // Best effort: a failed read or write is logged and the recommendation is still returned.
    // An unreadable history is never rewritten.
    fn append_history(&self, recommendation: &Recommendation) {
        let mut history: Vec<Recommendation> =
            match try_read_json_array(self.store.as_ref(), RECOMMENDATION_HISTORY_KEY, |_| true) {
                Ok(history) => history,
                Err(e) => {
                    tracing::error!(
                        target: "forest::recommendation",
                        id = %recommendation.id,
                        error = %e,
                        "recommendation history unreadable; not persisted"
                    );
                    return;
                }
            };
        history.push(recommendation.clone());
        if let Err(e) = write_json_array(self.store.as_ref(), RECOMMENDATION_HISTORY_KEY, &history) {
            tracing::error!(
                target: "forest::recommendation",
                id = %recommendation.id,
                error = %e,
                "failed to persist recommendation"
            );
        }
    }
}

fn default_prompt(kind: RecommendationKind, now: DateTime<FixedOffset>) -> String {
    match kind {
        RecommendationKind::Daily => daily_prompt(TimeOfDay::of(&now)),
        RecommendationKind::Weekly => WEEKLY_PROMPT.to_string(),
        RecommendationKind::Emergency => EMERGENCY_PROMPT.to_string(),
    }
}
