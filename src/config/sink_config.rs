//! Sink configuration: which sinks are enabled and where they write.
//!
//! The toggle file (`sinks.json`, edited with `sinkctl`) is the base layer;
//! environment variables override individual fields.

use super::parse_opt_bool;
use crate::domain::errors::ConfigError;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;

/// Values shipped in example configs that must never count as credentials
const PLACEHOLDERS: [&str; 4] = [
    "YOUR_TELEGRAM_BOT_TOKEN",
    "YOUR_TELEGRAM_CHAT_ID",
    "YOUR_DISCORD_WEBHOOK_URL_HERE",
    "CHANGE_ME",
];

/// True when a credential or path is present and not a placeholder
pub fn is_configured(value: &str) -> bool {
    let value = value.trim();
    !value.is_empty() && !PLACEHOLDERS.contains(&value)
}

/// Sinks addressable from the toggle CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkName {
    Csv,
    Jsonl,
    Sqlite,
    Discord,
    Telegram,
}

impl SinkName {
    pub fn all() -> [SinkName; 5] {
        [
            SinkName::Csv,
            SinkName::Jsonl,
            SinkName::Sqlite,
            SinkName::Discord,
            SinkName::Telegram,
        ]
    }

    /// Sinks toggled by `enable-all` / `disable-all`
    pub fn optional() -> [SinkName; 2] {
        [SinkName::Sqlite, SinkName::Telegram]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SinkName::Csv => "csv",
            SinkName::Jsonl => "jsonl",
            SinkName::Sqlite => "sqlite",
            SinkName::Discord => "discord",
            SinkName::Telegram => "telegram",
        }
    }
}

impl std::str::FromStr for SinkName {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(SinkName::Csv),
            "jsonl" => Ok(SinkName::Jsonl),
            "sqlite" => Ok(SinkName::Sqlite),
            "discord" => Ok(SinkName::Discord),
            "telegram" => Ok(SinkName::Telegram),
            _ => anyhow::bail!(
                "Unknown sink: {}. Must be one of csv, jsonl, sqlite, discord, telegram",
                s
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileSinkSettings {
    pub enabled: bool,
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SqliteSinkSettings {
    pub enabled: bool,
    pub db_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscordSinkSettings {
    pub enabled: bool,
    pub webhook_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelegramSinkSettings {
    pub enabled: bool,
    pub token: String,
    pub chat_id: String,
}

/// Persisted sink toggles
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SinkSettings {
    pub csv: FileSinkSettings,
    pub jsonl: FileSinkSettings,
    pub sqlite: SqliteSinkSettings,
    pub discord: DiscordSinkSettings,
    pub telegram: TelegramSinkSettings,
}

impl Default for SinkSettings {
    fn default() -> Self {
        Self {
            csv: FileSinkSettings {
                enabled: true,
                path: "./data/detections.csv".to_string(),
            },
            jsonl: FileSinkSettings {
                enabled: false,
                path: "./data/detections.jsonl".to_string(),
            },
            sqlite: SqliteSinkSettings {
                enabled: false,
                db_url: "sqlite://data/db/scanner.db".to_string(),
            },
            discord: DiscordSinkSettings {
                enabled: false,
                webhook_url: String::new(),
            },
            telegram: TelegramSinkSettings {
                enabled: false,
                token: String::new(),
                chat_id: String::new(),
            },
        }
    }
}

impl SinkSettings {
    /// Apply environment overrides on top of the persisted toggles
    pub fn overlay_env(mut self) -> Result<Self> {
        if let Ok(path) = env::var("CSV_PATH") {
            self.csv.path = path;
        }
        if let Ok(path) = env::var("JSONL_PATH") {
            self.jsonl.path = path;
        }
        if let Ok(url) = env::var("SQLITE_URL") {
            self.sqlite.db_url = url;
        }
        if let Ok(url) = env::var("DISCORD_WEBHOOK_URL") {
            self.discord.webhook_url = url;
        }
        if let Ok(token) = env::var("TELEGRAM_TOKEN") {
            self.telegram.token = token;
        }
        if let Ok(chat_id) = env::var("TELEGRAM_CHAT_ID") {
            self.telegram.chat_id = chat_id;
        }

        if let Some(enabled) = parse_opt_bool("CSV_ENABLED")? {
            self.csv.enabled = enabled;
        }
        if let Some(enabled) = parse_opt_bool("JSONL_ENABLED")? {
            self.jsonl.enabled = enabled;
        }
        if let Some(enabled) = parse_opt_bool("SQLITE_ENABLED")? {
            self.sqlite.enabled = enabled;
        }
        if let Some(enabled) = parse_opt_bool("DISCORD_ENABLED")? {
            self.discord.enabled = enabled;
        }
        if let Some(enabled) = parse_opt_bool("TELEGRAM_ENABLED")? {
            self.telegram.enabled = enabled;
        }
        Ok(self)
    }

    pub fn is_enabled(&self, sink: SinkName) -> bool {
        match sink {
            SinkName::Csv => self.csv.enabled,
            SinkName::Jsonl => self.jsonl.enabled,
            SinkName::Sqlite => self.sqlite.enabled,
            SinkName::Discord => self.discord.enabled,
            SinkName::Telegram => self.telegram.enabled,
        }
    }

    pub fn set_enabled(&mut self, sink: SinkName, enabled: bool) {
        match sink {
            SinkName::Csv => self.csv.enabled = enabled,
            SinkName::Jsonl => self.jsonl.enabled = enabled,
            SinkName::Sqlite => self.sqlite.enabled = enabled,
            SinkName::Discord => self.discord.enabled = enabled,
            SinkName::Telegram => self.telegram.enabled = enabled,
        }
    }

    /// First missing setting of a sink, if any
    pub fn missing_setting(&self, sink: SinkName) -> Option<&'static str> {
        match sink {
            SinkName::Csv if !is_configured(&self.csv.path) => Some("path"),
            SinkName::Jsonl if !is_configured(&self.jsonl.path) => Some("path"),
            SinkName::Sqlite if !is_configured(&self.sqlite.db_url) => Some("db_url"),
            SinkName::Discord if !is_configured(&self.discord.webhook_url) => Some("webhook_url"),
            SinkName::Telegram if !is_configured(&self.telegram.token) => Some("token"),
            SinkName::Telegram if !is_configured(&self.telegram.chat_id) => Some("chat_id"),
            _ => None,
        }
    }

    /// Every enabled sink must be fully configured
    pub fn validate(&self) -> Result<(), ConfigError> {
        for sink in SinkName::all() {
            if self.is_enabled(sink)
                && let Some(missing) = self.missing_setting(sink)
            {
                return Err(ConfigError::IncompleteSink {
                    sink: sink.as_str(),
                    missing,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_placeholders_are_not_configured() {
        assert!(!is_configured(""));
        assert!(!is_configured("YOUR_TELEGRAM_BOT_TOKEN"));
        assert!(is_configured("123:abc"));
    }

    #[test]
    fn test_enabled_sink_without_credentials_fails_validation() {
        let mut settings = SinkSettings::default();
        settings.telegram.enabled = true;
        settings.telegram.token = "123:abc".to_string();
        settings.telegram.chat_id = "YOUR_TELEGRAM_CHAT_ID".to_string();

        assert_eq!(
            settings.validate(),
            Err(ConfigError::IncompleteSink {
                sink: "telegram",
                missing: "chat_id"
            })
        );

        settings.telegram.chat_id = "-100200".to_string();
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_default_settings_are_valid() {
        assert!(SinkSettings::default().validate().is_ok());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let settings: SinkSettings =
            serde_json::from_str(r#"{"sqlite":{"enabled":true,"db_url":"sqlite://x.db"}}"#)
                .unwrap();
        assert!(settings.sqlite.enabled);
        assert!(settings.csv.enabled);
        assert!(!settings.telegram.enabled);
    }

    #[test]
    fn test_sink_name_parsing() {
        assert_eq!(SinkName::from_str("SQLite").unwrap(), SinkName::Sqlite);
        assert!(SinkName::from_str("email").is_err());
    }
}
