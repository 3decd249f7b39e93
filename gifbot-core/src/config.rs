//! Bot configuration: a TOML file with credential overrides from the
//! environment.
//!
//! ```toml
//! subreddits = ["test"]
//!
//! [reddit]
//! client_id = "..."
//! client_secret = "..."
//! username = "gif_bot"
//! password = "..."
//!
//! [giphy]
//! api_key = "..."
//!
//! [[triggers]]
//! phrase = "gif me"
//! search = "funny"
//! ```

use crate::error::{ConfigError, CoreError};
use crate::types::{TriggerRule, TriggerTable};
use serde::Deserialize;
use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use tracing::{debug, info};

pub const DEFAULT_CONFIG_PATH: &str = "gifbot.toml";
pub const CONFIG_PATH_ENV: &str = "GIFBOT_CONFIG";

const MAX_PAGE_SIZE: u32 = 100;
/// One week.
const MAX_WINDOW_MINUTES: i64 = 7 * 24 * 60;

#[derive(Clone, Default, Deserialize)]
#[serde(default)]
pub struct RedditCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub username: String,
    pub password: String,
    pub user_agent: Option<String>,
}

impl RedditCredentials {
    pub fn user_agent(&self) -> String {
        self.user_agent.clone().unwrap_or_else(|| {
            format!(
                "rust:gifbot:v{} (by /u/{})",
                env!("CARGO_PKG_VERSION"),
                self.username
            )
        })
    }
}

impl fmt::Debug for RedditCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedditCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct GiphySettings {
    pub api_key: String,
    pub rating: String,
    pub limit: u32,
    pub timeout_secs: u64,
}

impl Default for GiphySettings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            rating: "pg-13".to_string(),
            limit: 1,
            timeout_secs: 10,
        }
    }
}

impl fmt::Debug for GiphySettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GiphySettings")
            .field("api_key", &"<redacted>")
            .field("rating", &self.rating)
            .field("limit", &self.limit)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    pub window_minutes: i64,
    pub page_size: u32,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            window_minutes: 15,
            page_size: MAX_PAGE_SIZE,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BotConfig {
    #[serde(default)]
    pub reddit: RedditCredentials,
    #[serde(default)]
    pub giphy: GiphySettings,
    #[serde(default)]
    pub pipeline: PipelineSettings,
    #[serde(default)]
    pub subreddits: Vec<String>,
    #[serde(default)]
    pub triggers: Vec<TriggerRule>,
}

impl BotConfig {
    /// Reads, overrides from the process environment, and validates.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                CoreError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                CoreError::Io(e)
            }
        })?;

        let mut config = Self::from_toml(&contents)?;
        config.apply_env_overrides(|name| std::env::var(name).ok());
        config.validate()?;

        info!(
            "Loaded configuration from {} ({} triggers, {} subreddits)",
            path.display(),
            config.triggers.len(),
            config.subreddits.len()
        );
        Ok(config)
    }

    /// Parses without validating. Trigger phrases are lowercased.
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        let mut config: BotConfig = toml::from_str(contents)?;
        for rule in &mut config.triggers {
            rule.phrase = rule.phrase.to_lowercase();
        }
        Ok(config)
    }

    /// Replaces credentials with `GIFBOT_*` variables resolved through `lookup`.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let overrides: [(&str, &mut String); 5] = [
            ("GIFBOT_REDDIT_CLIENT_ID", &mut self.reddit.client_id),
            ("GIFBOT_REDDIT_CLIENT_SECRET", &mut self.reddit.client_secret),
            ("GIFBOT_REDDIT_USERNAME", &mut self.reddit.username),
            ("GIFBOT_REDDIT_PASSWORD", &mut self.reddit.password),
            ("GIFBOT_GIPHY_API_KEY", &mut self.giphy.api_key),
        ];

        for (name, slot) in overrides {
            if let Some(value) = lookup(name).filter(|v| !v.is_empty()) {
                debug!("Using {} from environment", name);
                *slot = value;
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("reddit.client_id", &self.reddit.client_id),
            ("reddit.client_secret", &self.reddit.client_secret),
            ("reddit.username", &self.reddit.username),
            ("reddit.password", &self.reddit.password),
            ("giphy.api_key", &self.giphy.api_key),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigError::MissingField {
                    field: field.to_string(),
                });
            }
        }

        if self.triggers.is_empty() {
            return Err(ConfigError::ValidationFailed {
                reason: "at least one trigger must be configured".to_string(),
            });
        }

        let mut phrases = HashSet::new();
        for rule in &self.triggers {
            if rule.phrase.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "triggers.phrase".to_string(),
                    value: rule.phrase.clone(),
                });
            }
            if rule.search.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: format!("triggers[{}].search", rule.phrase),
                    value: rule.search.clone(),
                });
            }
            if !phrases.insert(rule.phrase.to_lowercase()) {
                return Err(ConfigError::ValidationFailed {
                    reason: format!("duplicate trigger phrase '{}'", rule.phrase),
                });
            }
        }

        if self.subreddits.is_empty() {
            return Err(ConfigError::ValidationFailed {
                reason: "at least one subreddit must be configured".to_string(),
            });
        }
        if let Some(blank) = self.subreddits.iter().find(|s| s.trim().is_empty()) {
            return Err(ConfigError::InvalidValue {
                field: "subreddits".to_string(),
                value: blank.clone(),
            });
        }

        if !(1..=MAX_WINDOW_MINUTES).contains(&self.pipeline.window_minutes) {
            return Err(ConfigError::InvalidValue {
                field: "pipeline.window_minutes".to_string(),
                value: self.pipeline.window_minutes.to_string(),
            });
        }
        if self.pipeline.page_size == 0 || self.pipeline.page_size > MAX_PAGE_SIZE {
            return Err(ConfigError::InvalidValue {
                field: "pipeline.page_size".to_string(),
                value: self.pipeline.page_size.to_string(),
            });
        }
        if self.giphy.limit == 0 {
            return Err(ConfigError::InvalidValue {
                field: "giphy.limit".to_string(),
                value: self.giphy.limit.to_string(),
            });
        }
        if self.giphy.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "giphy.timeout_secs".to_string(),
                value: self.giphy.timeout_secs.to_string(),
            });
        }

        Ok(())
    }

    pub fn trigger_table(&self) -> TriggerTable {
        self.triggers
            .iter()
            .map(|rule| (rule.phrase.as_str(), rule.search.as_str()))
            .collect()
    }
}
