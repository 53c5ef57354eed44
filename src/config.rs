use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

use crate::bot::answers::BotAnswers;
use crate::bot::classifier::CommandKeywords;

#[derive(Debug, Clone)]
pub struct Config {
    pub instagram_username: String,
    pub instagram_password: String,
    pub database_url: String,
    pub session_file: String,
    pub settings_file: String,
    pub poll_interval_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let username = env::var("INSTAGRAM_USERNAME")
            .map_err(|_| anyhow!("INSTAGRAM_USERNAME must be set"))?;

        if username.trim().is_empty() {
            return Err(anyhow!("INSTAGRAM_USERNAME must be set"));
        }

        let password = env::var("INSTAGRAM_PASSWORD")
            .map_err(|_| anyhow!("INSTAGRAM_PASSWORD must be set"))?;

        if password.is_empty() {
            return Err(anyhow!("INSTAGRAM_PASSWORD must be set"));
        }

        let database_url = env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite:./data/diary-bot.db".to_string());
        let database_url = if database_url.trim().is_empty() {
            "sqlite:./data/diary-bot.db".to_string()
        } else {
            database_url
        };

        let session_file = env::var("SESSION_FILE")
            .unwrap_or_else(|_| "./data/instagram-session.json".to_string());

        let settings_file = env::var("SETTINGS_FILE")
            .unwrap_or_else(|_| "./settings.json".to_string());

        let interval_str = env::var("POLL_INTERVAL_SECS")
            .unwrap_or_else(|_| "2".to_string());
        let poll_interval_secs = interval_str.trim()
            .parse()
            .map_err(|_| anyhow!("Invalid POLL_INTERVAL_SECS"))?;

        Ok(Config {
            instagram_username: username,
            instagram_password: password,
            database_url,
            session_file,
            settings_file,
            poll_interval_secs,
        })
    }
}

/// Localizable keyword tables and reply templates.
///
/// Loaded from `settings.json`; a missing file falls back to the built-in
/// Ukrainian defaults, a malformed file is a startup error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BotSettings {
    pub commands: CommandKeywords,
    pub answers: BotAnswers,
}

impl BotSettings {
    pub fn load(path: &str) -> Result<Self> {
        if !Path::new(path).exists() {
            tracing::info!("Settings file {} not found, using built-in defaults", path);
            return Ok(Self::default());
        }

        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file {path}"))?;
        let settings = serde_json::from_str(&json)
            .with_context(|| format!("Failed to parse settings file {path}"))?;
        Ok(settings)
    }
}
