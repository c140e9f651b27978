//! Progress analytics over the activity log.
//!
//! Everything here is derived on demand and never stored: daily snapshots for a 7/30/90-day
//! window, an all-time summary, and achievement flags re-evaluated from that summary.
//!
//! The mood score adds a small random term (0–2) purely to smooth the chart. It is cosmetic,
//! not a measurement; inject `ZeroNoise` or `FixedNoise` wherever exact values matter.

use crate::activity_log::ActivityLog;
use crate::clock::Clock;
use crate::error::{EngineError, EngineResult, ValidationError};
use crate::profile_store::ProfileStore;
use crate::shared::{ActivityKind, ActivityRecord};
use chrono::{DateTime, Duration, FixedOffset, NaiveDate};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

/// Upper bound (exclusive) of the mood smoothing term.
pub const MAX_MOOD_NOISE: f64 = 2.0;
const MOOD_FLOOR: f64 = 1.0;
const MOOD_CEILING_BASE: f64 = 10.0;

/// Source of the mood smoothing term, in `[0, MAX_MOOD_NOISE)`.
pub trait NoiseSource: Send + Sync {
    fn sample(&self) -> f64;
}

/// Production noise from the thread-local RNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomNoise;

impl NoiseSource for RandomNoise {
    fn sample(&self) -> f64 {
        rand::thread_rng().gen_range(0.0..MAX_MOOD_NOISE)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ZeroNoise;

impl NoiseSource for ZeroNoise {
    fn sample(&self) -> f64 {
        0.0
    }
}

/// Constant noise, clamped into the valid range.
#[derive(Debug, Clone, Copy)]
pub struct FixedNoise(pub f64);

impl NoiseSource for FixedNoise {
    fn sample(&self) -> f64 {
        self.0.clamp(0.0, MAX_MOOD_NOISE)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressWindow {
    Week,
    Month,
    All,
}

impl ProgressWindow {
    pub fn days(&self) -> u32 {
        match self {
            Self::Week => 7,
            Self::Month => 30,
            Self::All => 90,
        }
    }

    pub fn from_days(days: u32) -> Result<Self, ValidationError> {
        match days {
            7 => Ok(Self::Week),
            30 => Ok(Self::Month),
            90 => Ok(Self::All),
            other => Err(ValidationError::UnsupportedWindow(other)),
        }
    }
}

/// One day of the chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub date: NaiveDate,
    /// Mean post-activity stress that day (one decimal), or the profile baseline if idle.
    pub stress_level: f64,
    pub activity_count: u32,
    pub mood_score: f64,
}

/// All-time aggregates over the full log (not windowed).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActivitySummary {
    pub total_activities: u32,
    /// `None` when the log is empty.
    pub mean_stress: Option<f64>,
    pub total_duration_minutes: u64,
    /// Distinct local calendar days with at least one activity.
    pub days_active: u32,
    /// Only kinds that occur are present.
    pub by_kind: BTreeMap<ActivityKind, u32>,
}

impl ActivitySummary {
    pub fn count_of(&self, kind: ActivityKind) -> u32 {
        self.by_kind.get(&kind).copied().unwrap_or(0)
    }

    pub fn average_duration_minutes(&self) -> u64 {
        let n = self.total_activities.max(1) as f64;
        (self.total_duration_minutes as f64 / n).round() as u64
    }

    pub fn mean_stress_or(&self, baseline: u8) -> f64 {
        self.mean_stress.unwrap_or(baseline as f64)
    }
}

/// Static achievement definition.
#[derive(Debug, Clone, Copy)]
pub struct AchievementRule {
    pub id: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub icon: &'static str,
    pub predicate: fn(&ActivitySummary) -> bool,
}

/// Rule evaluated against the current summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Achievement {
    pub id: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub icon: &'static str,
    pub achieved: bool,
}

pub const ACHIEVEMENT_RULES: [AchievementRule; 4] = [
    AchievementRule {
        id: "first_week",
        title: "First Week Complete",
        description: "Active on 7 different days",
        icon: "🎯",
        predicate: |s| s.days_active >= 7,
    },
    AchievementRule {
        id: "stress_reducer",
        title: "Stress Relief Master",
        description: "Average stress of 5 or lower",
        icon: "😌",
        predicate: |s| s.mean_stress.is_some_and(|m| m <= 5.0),
    },
    AchievementRule {
        id: "ar_explorer",
        title: "AR Explorer",
        description: "10 or more AR experiences",
        icon: "📱",
        predicate: |s| s.count_of(ActivityKind::ArExperience) >= 10,
    },
    AchievementRule {
        id: "time_keeper",
        title: "Time Keeper",
        description: "300 or more minutes of activity in total",
        icon: "⏰",
        predicate: |s| s.total_duration_minutes >= 300,
    },
];

/// Pure and idempotent: same summary, same flags.
pub fn evaluate_achievements(summary: &ActivitySummary) -> Vec<Achievement> {
    ACHIEVEMENT_RULES
        .iter()
        .map(|rule| Achievement {
            id: rule.id,
            title: rule.title,
            description: rule.description,
            icon: rule.icon,
            achieved: (rule.predicate)(summary),
        })
        .collect()
}

/// All-time mean stress compared with the profile baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StressTrend {
    Improving,
    NotImproving,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressReport {
    pub window: ProgressWindow,
    pub snapshots: Vec<ProgressSnapshot>,
    pub summary: ActivitySummary,
    pub achievements: Vec<Achievement>,
    /// Mean post-activity stress, or the baseline when the log is empty (one decimal).
    pub average_stress: f64,
    pub trend: StressTrend,
}

impl ProgressReport {
    pub fn achieved_count(&self) -> usize {
        self.achievements.iter().filter(|a| a.achieved).count()
    }
}

fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

/// Snapshot series for `window`, oldest day first, ending on `now`'s local date.
pub fn build_snapshots(
    records: &[ActivityRecord],
    baseline_stress: u8,
    window: ProgressWindow,
    now: DateTime<FixedOffset>,
    noise: &dyn NoiseSource,
) -> Vec<ProgressSnapshot> {
    let offset = *now.offset();
    let mut by_day: HashMap<NaiveDate, Vec<u8>> = HashMap::new();
    for r in records {
        let day = r.occurred_at.with_timezone(&offset).date_naive();
        by_day.entry(day).or_default().push(r.stress_level);
    }

    let today = now.date_naive();
    (0..window.days() as i64)
        .rev()
        .map(|days_ago| {
            let date = today - Duration::days(days_ago);
            let day_stress = by_day.get(&date).map(Vec::as_slice).unwrap_or(&[]);
            let avg = if day_stress.is_empty() {
                baseline_stress as f64
            } else {
                day_stress.iter().map(|&s| s as f64).sum::<f64>() / day_stress.len() as f64
            };
            let mood = (MOOD_CEILING_BASE - avg + noise.sample()).max(MOOD_FLOOR);
            ProgressSnapshot {
                date,
                stress_level: round1(avg),
                activity_count: day_stress.len() as u32,
                mood_score: round1(mood),
            }
        })
        .collect()
}

/// All-time aggregates; days are counted in `offset`'s local calendar.
pub fn summarize(records: &[ActivityRecord], offset: &FixedOffset) -> ActivitySummary {
    let mut summary = ActivitySummary::default();
    let mut days = BTreeSet::new();
    let mut stress_sum = 0u64;
    for r in records {
        summary.total_activities += 1;
        summary.total_duration_minutes += r.duration_minutes as u64;
        stress_sum += r.stress_level as u64;
        *summary.by_kind.entry(r.kind).or_insert(0) += 1;
        days.insert(r.occurred_at.with_timezone(offset).date_naive());
    }
    if summary.total_activities > 0 {
        summary.mean_stress = Some(stress_sum as f64 / summary.total_activities as f64);
    }
    summary.days_active = days.len() as u32;
    summary
}

/// Recomputes progress from the activity log and profile on every call.
pub struct AnalyticsAggregator {
    log: Arc<ActivityLog>,
    profiles: Arc<ProfileStore>,
    clock: Arc<dyn Clock>,
    noise: Arc<dyn NoiseSource>,
}

impl AnalyticsAggregator {
    pub fn new(
        log: Arc<ActivityLog>,
        profiles: Arc<ProfileStore>,
        clock: Arc<dyn Clock>,
        noise: Arc<dyn NoiseSource>,
    ) -> Self {
        Self {
            log,
            profiles,
            clock,
            noise,
        }
    }

    pub fn recompute(&self, window: ProgressWindow) -> EngineResult<ProgressReport> {
        let profile = self.profiles.load().ok_or(EngineError::ProfileMissing)?;
        let records = self.log.all();
        let now = self.clock.now();

        let snapshots = build_snapshots(
            &records,
            profile.stress_level,
            window,
            now,
            self.noise.as_ref(),
        );
        let summary = summarize(&records, now.offset());
        let achievements = evaluate_achievements(&summary);
        let trend = match summary.mean_stress {
            Some(mean) if mean < profile.stress_level as f64 => StressTrend::Improving,
            _ => StressTrend::NotImproving,
        };
        let report = ProgressReport {
            window,
            average_stress: round1(summary.mean_stress_or(profile.stress_level)),
            snapshots,
            summary,
            achievements,
            trend,
        };
        tracing::debug!(
            target: "forest::analytics",
            window_days = window.days(),
            activities = report.summary.total_activities,
            achieved = report.achieved_count(),
            "progress recomputed"
        );
        Ok(report)
    }

    /// Achievements only, from the full log.
    pub fn achievements(&self) -> Vec<Achievement> {
        let records = self.log.all();
        evaluate_achievements(&summarize(&records, self.clock.now().offset()))
    }
}
