use std::time::Duration;

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::services::attachment::{DEFAULT_MAX_WIDTH, DEFAULT_QUALITY};

pub const DEFAULT_DEBOUNCE_MS: u64 = 500;
pub const DEFAULT_WRITE_TIMEOUT_MS: u64 = 10_000;

fn default_database_url() -> String {
    "sqlite://eventflow.db?mode=rwc".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(default)]
pub struct AttachmentConfig {
    #[serde(alias = "maxWidth")]
    pub max_width: u32,
    pub quality: f32,
}

impl Default for AttachmentConfig {
    fn default() -> Self {
        Self {
            max_width: DEFAULT_MAX_WIDTH,
            quality: DEFAULT_QUALITY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(default)]
pub struct AutosaveConfig {
    #[serde(alias = "debounceMs")]
    pub debounce_ms: u64,
    #[serde(alias = "writeTimeoutMs")]
    pub write_timeout_ms: u64,
}

impl Default for AutosaveConfig {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            write_timeout_ms: DEFAULT_WRITE_TIMEOUT_MS,
        }
    }
}

impl AutosaveConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(default)]
#[ts(export)]
pub struct Config {
    #[serde(alias = "databaseUrl")]
    pub database_url: String,
    /// Principal every store call is scoped to.
    #[serde(alias = "ownerId")]
    pub owner_id: Option<Uuid>,
    #[serde(alias = "ownerEmail")]
    pub owner_email: Option<String>,
    pub attachments: AttachmentConfig,
    pub autosave: AutosaveConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            owner_id: None,
            owner_email: None,
            attachments: AttachmentConfig::default(),
            autosave: AutosaveConfig::default(),
        }
    }
}

impl Config {
    pub fn from_raw(raw_config: &str) -> Self {
        match serde_json::from_str::<Config>(raw_config) {
            Ok(config) => config.normalized(),
            Err(e) => {
                tracing::warn!(
                    "Failed to parse config (line {}, column {}): {}, using default",
                    e.line(),
                    e.column(),
                    e
                );
                Self::default()
            }
        }
    }

    pub fn normalized(mut self) -> Self {
        if self.database_url.trim().is_empty() {
            tracing::warn!("Empty database url, resetting to default");
            self.database_url = default_database_url();
        }

        if matches!(self.owner_email.as_deref(), Some(email) if email.trim().is_empty()) {
            self.owner_email = None;
        }

        if self.attachments.max_width == 0 {
            tracing::warn!("Attachment max width must be at least 1, using 1");
            self.attachments.max_width = 1;
        }

        let quality = self.attachments.quality;
        if !quality.is_finite() || quality <= 0.0 {
            tracing::warn!("Invalid attachment quality {quality}, resetting to default");
            self.attachments.quality = DEFAULT_QUALITY;
        } else if quality > 1.0 {
            self.attachments.quality = 1.0;
        }

        self.autosave.debounce_ms = self.autosave.debounce_ms.max(1);
        self.autosave.write_timeout_ms = self.autosave.write_timeout_ms.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_sections_use_defaults() {
        let config = Config::from_raw(r#"{"database_url": "sqlite::memory:"}"#);
        assert_eq!(config.database_url, "sqlite::memory:");
        assert_eq!(config.attachments, AttachmentConfig::default());
        assert_eq!(config.autosave.debounce(), Duration::from_millis(500));
        assert_eq!(config.autosave.write_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn invalid_json_falls_back_to_defaults() {
        assert_eq!(Config::from_raw("{ not json"), Config::default());
    }

    #[test]
    fn accepts_camel_case_aliases() {
        let owner = Uuid::new_v4();
        let raw = format!(
            r#"{{"ownerId": "{owner}", "ownerEmail": "", "attachments": {{"maxWidth": 800}}, "autosave": {{"debounceMs": 250}}}}"#
        );
        let config = Config::from_raw(&raw);
        assert_eq!(config.owner_id, Some(owner));
        assert_eq!(config.owner_email, None);
        assert_eq!(config.attachments.max_width, 800);
        assert_eq!(config.autosave.debounce_ms, 250);
    }

    #[test]
    fn normalization_clamps_out_of_range_values() {
        let config = Config {
            database_url: "  ".to_string(),
            attachments: AttachmentConfig {
                max_width: 0,
                quality: 4.0,
            },
            autosave: AutosaveConfig {
                debounce_ms: 0,
                write_timeout_ms: 0,
            },
            ..Default::default()
        }
        .normalized();

        assert_eq!(config.database_url, default_database_url());
        assert_eq!(config.attachments.max_width, 1);
        assert_eq!(config.attachments.quality, 1.0);
        assert_eq!(config.autosave.debounce_ms, 1);
        assert_eq!(config.autosave.write_timeout_ms, 1);

        let negative = Config {
            attachments: AttachmentConfig {
                max_width: 10,
                quality: -0.5,
            },
            ..Default::default()
        }
        .normalized();
        assert_eq!(negative.attachments.quality, DEFAULT_QUALITY);
    }
}
