//! Shared data model: user profile, activity records, recommendations, and the storage keys
//! each component owns.

use crate::error::ValidationError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Lowest valid stress score (profile baseline and post-activity).
pub const STRESS_MIN: u8 = 1;
/// Highest valid stress score.
pub const STRESS_MAX: u8 = 10;

/// Storage key owned by `ProfileStore`.
pub const PROFILE_KEY: &str = "forest_user_profile";
/// Storage key owned by `ActivityLog`.
pub const ACTIVITY_LOG_KEY: &str = "forest_activities";
/// Storage key owned by `RecommendationEngine`.
pub const RECOMMENDATION_HISTORY_KEY: &str = "forest_recommendations";
/// Storage key for the onboarding-completed flag (owned by `ProfileStore`).
pub const ONBOARDING_FLAG_KEY: &str = "forest_onboarding_completed";

/// Every key the core writes. `clear_all` on a store removes exactly these.
pub const STORAGE_KEYS: [&str; 4] = [
    PROFILE_KEY,
    ACTIVITY_LOG_KEY,
    RECOMMENDATION_HISTORY_KEY,
    ONBOARDING_FLAG_KEY,
];

/// Checks a raw stress score and narrows it to the stored representation.
pub fn validate_stress(field: &'static str, value: i64) -> Result<u8, ValidationError> {
    if (STRESS_MIN as i64..=STRESS_MAX as i64).contains(&value) {
        Ok(value as u8)
    } else {
        Err(ValidationError::StressOutOfRange { field, value })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    #[default]
    Other,
}

/// The current user. Owned by `ProfileStore`; every mutation is re-validated as a whole.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub age: u32,
    #[serde(default)]
    pub gender: Gender,
    #[serde(default)]
    pub location: String,
    /// Self-reported baseline, 1–10.
    pub stress_level: u8,
    /// Activity tags chosen during onboarding (e.g. "forest bathing", "meditation").
    #[serde(default)]
    pub preferred_activities: BTreeSet<String>,
    /// Free-text health notes. Never logged.
    #[serde(default)]
    pub health_notes: String,
    /// Has the user done forest therapy before.
    #[serde(default)]
    pub forest_experience: bool,
    pub created_at: DateTime<Utc>,
}

impl UserProfile {
    /// Checks the invariants a stored profile must hold.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.id.trim().is_empty() {
            return Err(ValidationError::EmptyId);
        }
        validate_stress("stress_level", self.stress_level as i64)?;
        Ok(())
    }
}

/// Onboarding answers before an id and creation time are assigned.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileDraft {
    pub name: String,
    pub age: u32,
    pub gender: Gender,
    pub location: String,
    pub stress_level: i64,
    pub preferred_activities: BTreeSet<String>,
    pub health_notes: String,
    pub forest_experience: bool,
}

impl ProfileDraft {
    /// Assigns a `user_<uuid>` id and the creation timestamp, then validates.
    pub fn into_profile(self, created_at: DateTime<Utc>) -> Result<UserProfile, ValidationError> {
        let stress_level = validate_stress("stress_level", self.stress_level)?;
        let profile = UserProfile {
            id: format!("user_{}", uuid::Uuid::new_v4().simple()),
            name: self.name,
            age: self.age,
            gender: self.gender,
            location: self.location,
            stress_level,
            preferred_activities: self.preferred_activities,
            health_notes: self.health_notes,
            forest_experience: self.forest_experience,
            created_at,
        };
        profile.validate()?;
        Ok(profile)
    }
}

/// Partial profile update. `None` leaves the field as it is.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfilePatch {
    pub name: Option<String>,
    pub age: Option<u32>,
    pub gender: Option<Gender>,
    pub location: Option<String>,
    pub stress_level: Option<i64>,
    pub preferred_activities: Option<BTreeSet<String>>,
    pub health_notes: Option<String>,
    pub forest_experience: Option<bool>,
}

impl ProfilePatch {
    pub fn stress_level(level: i64) -> Self {
        Self {
            stress_level: Some(level),
            ..Default::default()
        }
    }

    /// Merges onto `base` and validates the merged record. `base` is never touched.
    pub fn apply(&self, base: &UserProfile) -> Result<UserProfile, ValidationError> {
        let mut merged = base.clone();
        if let Some(name) = &self.name {
            merged.name = name.clone();
        }
        if let Some(age) = self.age {
            merged.age = age;
        }
        if let Some(gender) = self.gender {
            merged.gender = gender;
        }
        if let Some(location) = &self.location {
            merged.location = location.clone();
        }
        if let Some(level) = self.stress_level {
            merged.stress_level = validate_stress("stress_level", level)?;
        }
        if let Some(activities) = &self.preferred_activities {
            merged.preferred_activities = activities.clone();
        }
        if let Some(notes) = &self.health_notes {
            merged.health_notes = notes.clone();
        }
        if let Some(experience) = self.forest_experience {
            merged.forest_experience = experience;
        }
        merged.validate()?;
        Ok(merged)
    }
}

/// Closed set of activity types the log accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    ForestVisit,
    Meditation,
    ArExperience,
    VirtualTour,
}

impl ActivityKind {
    pub const ALL: [ActivityKind; 4] = [
        ActivityKind::ForestVisit,
        ActivityKind::Meditation,
        ActivityKind::ArExperience,
        ActivityKind::VirtualTour,
    ];

    /// Wire tag, as stored.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ForestVisit => "forest_visit",
            Self::Meditation => "meditation",
            Self::ArExperience => "ar_experience",
            Self::VirtualTour => "virtual_tour",
        }
    }
}

impl fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One completed wellness activity. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityRecord {
    pub id: String,
    pub occurred_at: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: ActivityKind,
    pub duration_minutes: u32,
    /// Stress reported after the activity, 1–10.
    pub stress_level: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl ActivityRecord {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_stress("stress_level", self.stress_level as i64)?;
        Ok(())
    }
}

/// Activity as submitted by a caller: id and timestamp may be omitted, numbers are unchecked.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewActivity {
    pub id: Option<String>,
    pub occurred_at: Option<DateTime<Utc>>,
    pub kind: ActivityKind,
    pub duration_minutes: i64,
    pub stress_level: i64,
    pub note: Option<String>,
}

impl NewActivity {
    pub fn new(kind: ActivityKind, duration_minutes: i64, stress_level: i64) -> Self {
        Self {
            id: None,
            occurred_at: None,
            kind,
            duration_minutes,
            stress_level,
            note: None,
        }
    }

    pub fn at(mut self, occurred_at: DateTime<Utc>) -> Self {
        self.occurred_at = Some(occurred_at);
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    /// Validates and fills in missing id (`activity_<uuid>`) and timestamp (`now`).
    pub fn into_record(self, now: DateTime<Utc>) -> Result<ActivityRecord, ValidationError> {
        if self.duration_minutes < 0 {
            return Err(ValidationError::NegativeDuration(self.duration_minutes));
        }
        let stress_level = validate_stress("stress_level", self.stress_level)?;
        let duration_minutes = u32::try_from(self.duration_minutes)
            .map_err(|_| ValidationError::DurationTooLong(self.duration_minutes))?;
        Ok(ActivityRecord {
            id: self
                .id
                .filter(|id| !id.trim().is_empty())
                .unwrap_or_else(|| format!("activity_{}", uuid::Uuid::new_v4().simple())),
            occurred_at: self.occurred_at.unwrap_or(now),
            kind: self.kind,
            duration_minutes,
            stress_level,
            note: self.note,
        })
    }
}

/// Horizon a recommendation was generated for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecommendationKind {
    Daily,
    Weekly,
    Emergency,
}

impl RecommendationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Emergency => "emergency",
        }
    }
}

impl fmt::Display for RecommendationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable recommendation. Newer entries supersede older ones; none is ever edited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub id: String,
    pub user_id: String,
    pub content: String,
    #[serde(rename = "type")]
    pub kind: RecommendationKind,
    pub created_at: DateTime<Utc>,
    /// True when the AI service failed and the content came from the stress-bucket fallback.
    #[serde(default)]
    pub is_fallback: bool,
}
