//! Forest-therapy expert persona and the request prompts for each recommendation horizon.

use crate::clock::TimeOfDay;

/// System instruction for the recommendation model.
pub const WELLNESS_EXPERT_SYSTEM: &str = r#"You are a Korean forest-wellness expert. Using the user's personal details, give warm and practical advice.

Response guidelines:
1. Write in a friendly, warm tone
2. Give concrete advice the user can actually carry out
3. Take Korean forest-welfare facilities and the natural surroundings into account
4. Reflect the user's stress level and preferences
5. Keep it concise, around 200-300 characters
6. Use emoji sparingly to keep it friendly"#;

/// Default daily request; `{time_of_day}` and `{weather}` are filled in.
pub const DAILY_PROMPT_TEMPLATE: &str =
    "Please suggest a forest-therapy activity I can do this {time_of_day}. The weather is {weather}.";

/// Week-long plan.
pub const WEEKLY_PROMPT: &str = "Please put together a forest-therapy plan for this whole week. \
Suggest specific activities I can practise over the next seven days.";

/// Immediate de-stress action: under five minutes and possible indoors.
pub const EMERGENCY_PROMPT: &str = "Tell me an emergency forest-therapy technique that relieves stress right now \
in under 5 minutes. Include something I can do indoors.";

const DEFAULT_WEATHER: &str = "clear";

/// Daily prompt for the given time of day.
pub fn daily_prompt(time_of_day: TimeOfDay) -> String {
    DAILY_PROMPT_TEMPLATE
        .replace("{time_of_day}", time_of_day.as_str())
        .replace("{weather}", DEFAULT_WEATHER)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn daily_prompt_fills_placeholders() {
        let p = daily_prompt(TimeOfDay::Evening);
        assert!(p.contains("this evening"));
        assert!(!p.contains('{'));
    }
}
