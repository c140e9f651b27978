//! AI text service seam and its OpenRouter (OpenAI-compatible) implementation.
//!
//! Contract: request = prompt + structured profile context; response = success flag with
//! optional text or error. The recommendation engine makes exactly one bounded attempt and
//! treats anything other than non-empty text as a failure.

use crate::clock::{Season, TimeOfDay};
use crate::config::EngineConfig;
use crate::error::AiServiceError;
use crate::prompts::WELLNESS_EXPERT_SYSTEM;
use crate::shared::UserProfile;
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};

/// Profile summary sent alongside the prompt. Carries no identity fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileContext {
    pub age: u32,
    pub location: String,
    pub stress_level: u8,
    pub preferred_activities: Vec<String>,
    pub health_notes: Option<String>,
    pub forest_experience: bool,
    pub date: NaiveDate,
    pub season: String,
    pub time_of_day: String,
}

impl ProfileContext {
    pub fn from_profile(profile: &UserProfile, now: DateTime<FixedOffset>) -> Self {
        let health_notes = Some(profile.health_notes.trim().to_string()).filter(|n| !n.is_empty());
        Self {
            age: profile.age,
            location: profile.location.clone(),
            stress_level: profile.stress_level,
            preferred_activities: profile.preferred_activities.iter().cloned().collect(),
            health_notes,
            forest_experience: profile.forest_experience,
            date: now.date_naive(),
            season: Season::of(&now).as_str().to_string(),
            time_of_day: TimeOfDay::of(&now).as_str().to_string(),
        }
    }

    /// Plain-text block placed ahead of the request in the user message.
    pub fn render(&self) -> String {
        let activities = if self.preferred_activities.is_empty() {
            "none selected".to_string()
        } else {
            self.preferred_activities.join(", ")
        };
        format!(
            "User details:\n\
             - Age: {}\n\
             - Location: {}\n\
             - Stress level: {}/10\n\
             - Preferred activities: {}\n\
             - Health: {}\n\
             - Forest-therapy experience: {}\n\
             \n\
             Current date: {}\n\
             Season: {}",
            self.age,
            self.location,
            self.stress_level,
            activities,
            self.health_notes.as_deref().unwrap_or("no particular health issues"),
            if self.forest_experience { "yes" } else { "no" },
            self.date.format("%Y-%m-%d"),
            self.season,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiRequest {
    pub prompt: String,
    pub profile_context: ProfileContext,
}

impl AiRequest {
    pub fn user_message(&self) -> String {
        format!("{}\n\nRequest: {}", self.profile_context.render(), self.prompt)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AiResponse {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            success: true,
            content: Some(content.into()),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            content: None,
            error: Some(error.into()),
        }
    }

    /// The usable text, or why there is none.
    pub fn into_text(self) -> Result<String, AiServiceError> {
        if !self.success {
            return Err(AiServiceError::Unsuccessful(
                self.error.unwrap_or_else(|| "no error given".to_string()),
            ));
        }
        match self.content {
            Some(text) if !text.trim().is_empty() => Ok(text),
            _ => Err(AiServiceError::MalformedResponse("no text content".to_string())),
        }
    }
}

/// External AI text generator.
#[async_trait]
pub trait AiTextService: Send + Sync {
    async fn complete(&self, request: &AiRequest) -> Result<AiResponse, AiServiceError>;
}

/// Stand-in used when no API key is configured. Always fails, so the fallback is used.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnconfiguredAiService;

#[async_trait]
impl AiTextService for UnconfiguredAiService {
    async fn complete(&self, _request: &AiRequest) -> Result<AiResponse, AiServiceError> {
        Err(AiServiceError::NotConfigured)
    }
}

// OpenAI-compatible request/response for OpenRouter
#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Deserialize)]
struct ChatMessageResponse {
    // Null or non-string content (tool calls, images) is not usable text.
    #[serde(default)]
    content: Option<serde_json::Value>,
}

/// Chat-completion client against OpenRouter or any OpenAI-compatible endpoint.
pub struct OpenRouterAiService {
    api_key: String,
    model: String,
    base_url: String,
    max_tokens: u32,
    client: reqwest::Client,
}

impl OpenRouterAiService {
    /// Builds the service from config. `None` when no API key is set.
    pub fn from_config(config: &EngineConfig) -> Option<Self> {
        let key = config.ai_api_key.as_deref()?.trim().to_string();
        if key.is_empty() {
            return None;
        }
        let client = reqwest::Client::builder()
            .timeout(config.ai_timeout())
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Some(Self {
            api_key: key,
            model: config.ai_model.clone(),
            base_url: config.ai_api_url.clone(),
            max_tokens: config.ai_max_tokens,
            client,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl AiTextService for OpenRouterAiService {
    async fn complete(&self, request: &AiRequest) -> Result<AiResponse, AiServiceError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: WELLNESS_EXPERT_SYSTEM.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: request.user_message(),
                },
            ],
            temperature: Some(0.7),
            max_tokens: Some(self.max_tokens),
        };

        let res = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("X-Title", "forest-core")
            .json(&body)
            .send()
            .await
            .map_err(|e| AiServiceError::Transport(e.to_string()))?;

        if !res.status().is_success() {
            let status = res.status().as_u16();
            let body = res.text().await.unwrap_or_default();
            return Err(AiServiceError::Status { status, body });
        }

        let parsed: ChatResponse = res
            .json()
            .await
            .map_err(|e| AiServiceError::MalformedResponse(e.to_string()))?;

        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .and_then(|v| v.as_str().map(str::to_string));

        Ok(match text {
            Some(t) if !t.trim().is_empty() => AiResponse::text(t),
            _ => AiResponse::failure("completion contained no text"),
        })
    }
}
