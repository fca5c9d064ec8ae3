use std::{
    env,
    path::{Path, PathBuf},
};

use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

mod schema;

pub use schema::{
    AttachmentConfig, AutosaveConfig, Config, DEFAULT_DEBOUNCE_MS, DEFAULT_WRITE_TIMEOUT_MS,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("Validation error: {0}")]
    ValidationError(String),
}

/// `<platform config dir>/eventflow/config.json`.
pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    dirs::config_dir()
        .map(|dir| dir.join("eventflow").join("config.json"))
        .ok_or_else(|| ConfigError::ValidationError("No config directory on this platform".into()))
}

/// Will always return config, falling back to defaults on missing/invalid files.
pub async fn load_config_from_file(config_path: &Path) -> Config {
    match tokio::fs::read_to_string(config_path).await {
        Ok(raw_config) => Config::from_raw(&raw_config),
        Err(err) => {
            if err.kind() == std::io::ErrorKind::NotFound {
                tracing::info!("No config file at {}, using defaults", config_path.display());
            } else {
                tracing::warn!("Failed to read config file: {}", err);
            }
            Config::default()
        }
    }
}

/// Strict read for callers that write the file back: a missing file is
/// `None`, an unparsable one is an error instead of defaults.
pub async fn read_config_file(config_path: &Path) -> Result<Option<Config>, ConfigError> {
    match tokio::fs::read_to_string(config_path).await {
        Ok(raw_config) => Ok(Some(serde_json::from_str::<Config>(&raw_config)?.normalized())),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err.into()),
    }
}

/// Saves the config to the given path
pub async fn save_config_to_file(config: &Config, config_path: &Path) -> Result<(), ConfigError> {
    let normalized = config.clone().normalized();
    let raw_config = serde_json::to_string_pretty(&normalized)?;
    if let Some(parent) = config_path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(config_path, raw_config).await?;
    Ok(())
}

impl Config {
    /// Applies `EVENTFLOW_*` overrides from the process environment.
    pub fn with_env_overrides(self) -> Self {
        self.with_env_from(|name| env::var(name).ok())
    }

    fn with_env_from<F>(mut self, get_env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = get_env("EVENTFLOW_DATABASE_URL").filter(|url| !url.trim().is_empty()) {
            self.database_url = url;
        }

        if let Some(value) = get_env("EVENTFLOW_OWNER_ID") {
            match value.parse::<Uuid>() {
                Ok(owner_id) => self.owner_id = Some(owner_id),
                Err(err) => warn!("Invalid EVENTFLOW_OWNER_ID='{value}': {err}. Ignoring."),
            }
        }

        self.autosave.debounce_ms = read_env_u64(
            "EVENTFLOW_AUTOSAVE_DEBOUNCE_MS",
            self.autosave.debounce_ms,
            &get_env,
        );
        self.autosave.write_timeout_ms = read_env_u64(
            "EVENTFLOW_WRITE_TIMEOUT_MS",
            self.autosave.write_timeout_ms,
            &get_env,
        );

        self.normalized()
    }
}

fn read_env_u64<F>(name: &str, default: u64, get_env: &F) -> u64
where
    F: Fn(&str) -> Option<String>,
{
    match get_env(name) {
        Some(value) => match value.parse::<u64>() {
            Ok(parsed) => parsed,
            Err(err) => {
                warn!("Invalid {name}='{value}': {err}. Using default {default}.");
                default
            }
        },
        None => default,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let values: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| values.get(name).cloned()
    }

    #[test]
    fn env_overrides_replace_file_values() {
        let owner = Uuid::new_v4();
        let owner_text = owner.to_string();
        let config = Config::default().with_env_from(env_from(&[
            ("EVENTFLOW_DATABASE_URL", "sqlite::memory:"),
            ("EVENTFLOW_OWNER_ID", owner_text.as_str()),
            ("EVENTFLOW_AUTOSAVE_DEBOUNCE_MS", "50"),
            ("EVENTFLOW_WRITE_TIMEOUT_MS", "2000"),
        ]));

        assert_eq!(config.database_url, "sqlite::memory:");
        assert_eq!(config.owner_id, Some(owner));
        assert_eq!(config.autosave.debounce_ms, 50);
        assert_eq!(config.autosave.write_timeout_ms, 2000);
    }

    #[test]
    fn malformed_env_values_are_ignored() {
        let base = Config {
            owner_id: Some(Uuid::nil()),
            ..Default::default()
        };
        let config = base.clone().with_env_from(env_from(&[
            ("EVENTFLOW_OWNER_ID", "not-a-uuid"),
            ("EVENTFLOW_AUTOSAVE_DEBOUNCE_MS", "soon"),
            ("EVENTFLOW_DATABASE_URL", ""),
        ]));
        assert_eq!(config, base);
    }

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let config = Config {
            owner_id: Some(Uuid::new_v4()),
            owner_email: Some("planner@example.com".to_string()),
            ..Default::default()
        };

        save_config_to_file(&config, &path).await.unwrap();
        assert_eq!(load_config_from_file(&path).await, config);
    }

    #[tokio::test]
    async fn missing_file_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config_from_file(&dir.path().join("absent.json")).await;
        assert_eq!(config, Config::default());
    }

    #[tokio::test]
    async fn strict_read_refuses_broken_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        assert!(read_config_file(&path).await.unwrap().is_none());

        tokio::fs::write(&path, "{ \"databaseUrl\": ").await.unwrap();
        assert!(matches!(
            read_config_file(&path).await,
            Err(ConfigError::Json(_))
        ));

        let config = Config {
            owner_email: Some("planner@example.com".to_string()),
            ..Default::default()
        };
        save_config_to_file(&config, &path).await.unwrap();
        assert_eq!(read_config_file(&path).await.unwrap(), Some(config));
    }
}
