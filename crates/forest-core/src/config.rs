//! Engine configuration: defaults, then an optional `forest_config.toml`, then `FOREST_*`
//! environment variables.
//!
//! | Env | Default | Description |
//! |-----|---------|-------------|
//! | FOREST_CONFIG | forest_config.toml | Config file path. Skipped if missing. |
//! | FOREST_AI_API_KEY / OPENROUTER_API_KEY | unset | AI service key. Unset => every recommendation uses the offline fallback. |
//! | FOREST_AI_MODEL | anthropic/claude-3.5-sonnet | Chat model id. |
//! | FOREST_AI_API_URL | https://openrouter.ai/api/v1 | OpenAI-compatible base URL. |
//! | FOREST_AI_TIMEOUT_SECS | 20 | Bounded wait for the single AI attempt (clamped to 1–120). |
//! | FOREST_AI_MAX_TOKENS | 1024 | Response token cap. |
//! | FOREST_DATA_PATH | ./data/forest_store | Sled directory. |

use config::{Config, ConfigError, Environment, Map};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_CONFIG_FILE: &str = "forest_config.toml";
const DEFAULT_MODEL: &str = "anthropic/claude-3.5-sonnet";
const DEFAULT_API_URL: &str = "https://openrouter.ai/api/v1";
const DEFAULT_TIMEOUT_SECS: u64 = 20;
const DEFAULT_MAX_TOKENS: u32 = 1024;
const DEFAULT_DATA_PATH: &str = "./data/forest_store";
const MIN_TIMEOUT_SECS: u64 = 1;
const MAX_TIMEOUT_SECS: u64 = 120;
/// Accepted when `FOREST_AI_API_KEY` is unset.
const OPENROUTER_KEY_VAR: &str = "OPENROUTER_API_KEY";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub ai_api_key: Option<String>,
    pub ai_model: String,
    pub ai_api_url: String,
    pub ai_timeout_secs: u64,
    pub ai_max_tokens: u32,
    pub data_path: PathBuf,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ai_api_key: None,
            ai_model: DEFAULT_MODEL.to_string(),
            ai_api_url: DEFAULT_API_URL.to_string(),
            ai_timeout_secs: DEFAULT_TIMEOUT_SECS,
            ai_max_tokens: DEFAULT_MAX_TOKENS,
            data_path: PathBuf::from(DEFAULT_DATA_PATH),
        }
    }
}

impl EngineConfig {
    /// Loads `.env`, then the file named by `FOREST_CONFIG` (default `forest_config.toml`),
    /// then the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        let path = std::env::var("FOREST_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        Self::layered(Path::new(&path), None)
    }

    /// Same layering with an explicit environment map instead of the process environment.
    pub fn load_with_env(path: &Path, env: Map<String, String>) -> Result<Self, ConfigError> {
        Self::layered(path, Some(env))
    }

    fn layered(path: &Path, env: Option<Map<String, String>>) -> Result<Self, ConfigError> {
        let builder = Config::builder()
            .set_default("ai_model", DEFAULT_MODEL)?
            .set_default("ai_api_url", DEFAULT_API_URL)?
            .set_default("ai_timeout_secs", DEFAULT_TIMEOUT_SECS)?
            .set_default("ai_max_tokens", DEFAULT_MAX_TOKENS as u64)?
            .set_default("data_path", DEFAULT_DATA_PATH)?;

        let builder = if path.exists() {
            builder.add_source(config::File::from(path))
        } else {
            builder
        };

        let fallback_key = match &env {
            Some(map) => map.get(OPENROUTER_KEY_VAR).cloned(),
            None => std::env::var(OPENROUTER_KEY_VAR).ok(),
        };

        let built = builder
            .add_source(
                Environment::with_prefix("FOREST")
                    .prefix_separator("_")
                    .source(env),
            )
            .build()?;

        let mut config: Self = built.try_deserialize()?;
        let has_key = config
            .ai_api_key
            .as_deref()
            .is_some_and(|k| !k.trim().is_empty());
        if !has_key {
            config.ai_api_key = fallback_key;
        }
        let config = config.normalized();
        tracing::debug!(
            target: "forest::config",
            model = %config.ai_model,
            api_url = %config.ai_api_url,
            timeout_secs = config.ai_timeout_secs,
            data_path = %config.data_path.display(),
            ai_configured = config.has_ai_key(),
            "engine config loaded"
        );
        Ok(config)
    }

    fn normalized(mut self) -> Self {
        self.ai_timeout_secs = self.ai_timeout_secs.clamp(MIN_TIMEOUT_SECS, MAX_TIMEOUT_SECS);
        self.ai_api_key = self
            .ai_api_key
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty());
        self.ai_api_url = self.ai_api_url.trim_end_matches('/').to_string();
        self
    }

    pub fn ai_timeout(&self) -> Duration {
        Duration::from_secs(self.ai_timeout_secs)
    }

    pub fn has_ai_key(&self) -> bool {
        self.ai_api_key.is_some()
    }
}
