//! Deterministic fallback recommendations, chosen only by stress level.

/// Stress 8 and above: calm, low-exertion.
pub const FALLBACK_CALMING: &str = "🧘 Your stress is running high. Today, try ten minutes of meditation in a quiet park. \
Sit under a tree, slow your breathing and let your mind empty; it should take the edge off.";

/// Stress 5–7: an easy walk.
pub const FALLBACK_MODERATE: &str = "🚶 Take an unhurried 20-minute walk on a trail near you. \
Notice the trees and flowers as you go and give yourself time to settle into nature.";

/// Stress below 5: something more active.
pub const FALLBACK_ACTIVE: &str = "🌲 You're in good shape today! How about a more active hike or a nature outing? \
Visiting a forest-bathing site you haven't been to yet is a great option too.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StressBucket {
    High,
    Moderate,
    Low,
}

impl StressBucket {
    pub fn from_stress(stress_level: u8) -> Self {
        if stress_level >= 8 {
            Self::High
        } else if stress_level >= 5 {
            Self::Moderate
        } else {
            Self::Low
        }
    }

    pub fn content(&self) -> &'static str {
        match self {
            Self::High => FALLBACK_CALMING,
            Self::Moderate => FALLBACK_MODERATE,
            Self::Low => FALLBACK_ACTIVE,
        }
    }
}

pub fn fallback_for_stress(stress_level: u8) -> &'static str {
    StressBucket::from_stress(stress_level).content()
}
