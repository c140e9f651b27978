//! Prompt templates for the AI text service and the offline fallback texts.

pub mod fallback;
pub mod wellness;

pub use fallback::{
    fallback_for_stress, StressBucket, FALLBACK_ACTIVE, FALLBACK_CALMING, FALLBACK_MODERATE,
};
pub use wellness::{
    daily_prompt, WELLNESS_EXPERT_SYSTEM, DAILY_PROMPT_TEMPLATE, EMERGENCY_PROMPT, WEEKLY_PROMPT,
};
