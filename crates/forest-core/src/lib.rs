//! forest-core: recommendation and progress engine for a forest-therapy wellness app.
//!
//! Turns a self-reported profile and an append-only activity log into a once-per-day
//! personalized recommendation (with a deterministic offline fallback when the AI service is
//! unavailable) and rolling progress analytics (daily stress/mood series, activity mix,
//! achievements). Persistence, the AI backend, the clock and the mood noise are all injected.

mod activity_log;
mod ai_service;
mod analytics;
mod clock;
mod config;
mod engine;
mod error;
mod persistence;
mod profile_store;
mod recommendation;
mod shared;
pub mod prompts;

pub use shared::{
    validate_stress, ActivityKind, ActivityRecord, Gender, NewActivity, ProfileDraft, ProfilePatch,
    Recommendation, RecommendationKind, UserProfile, ACTIVITY_LOG_KEY, ONBOARDING_FLAG_KEY,
    PROFILE_KEY, RECOMMENDATION_HISTORY_KEY, STORAGE_KEYS, STRESS_MAX, STRESS_MIN,
};

pub use error::{AiServiceError, EngineError, EngineResult, StorageError, ValidationError};

pub use clock::{Clock, FixedClock, Season, SystemClock, TimeOfDay};

pub use config::EngineConfig;

// Persistence seam (SledStore for production, MemoryStore for tests)
pub use persistence::{KeyValueStore, MemoryStore, SledStore, StoreHandle};

pub use profile_store::ProfileStore;
pub use activity_log::ActivityLog;

pub use ai_service::{
    AiRequest, AiResponse, AiTextService, OpenRouterAiService, ProfileContext, UnconfiguredAiService,
};
pub use recommendation::{RecommendationEngine, DEFAULT_AI_TIMEOUT};

pub use analytics::{
    build_snapshots, evaluate_achievements, summarize, Achievement, AchievementRule,
    ActivitySummary, AnalyticsAggregator, FixedNoise, NoiseSource, ProgressReport,
    ProgressSnapshot, ProgressWindow, RandomNoise, StressTrend, ZeroNoise, ACHIEVEMENT_RULES,
    MAX_MOOD_NOISE,
};

pub use engine::{WellnessEngine, RECENT_ACTIVITY_LIMIT};
