use crate::storage::LocalStorage;
use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const SETTINGS_KEY: &str = "settings";
pub const DEFAULT_API_URL: &str = "http://localhost:1234";

const DATA_DIR_ENV: &str = "LLM_CHAT_DATA_DIR";
const API_URL_ENV: &str = "LLM_CHAT_API_URL";
const MODEL_ENV: &str = "LLM_CHAT_MODEL";
const APP_DIR_NAME: &str = "llm-chat";

/// User-editable settings. Fields missing from stored data take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    pub api_url: String,
    pub model_name: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            model_name: String::new(),
        }
    }
}

impl Settings {
    pub fn load(storage: &impl LocalStorage) -> Self {
        storage
            .load(SETTINGS_KEY)
            .and_then(|value| serde_json::from_value(value).ok())
            .unwrap_or_default()
    }

    pub fn save(&self, storage: &impl LocalStorage) -> Result<()> {
        let value = serde_json::to_value(self)?;
        storage
            .save(SETTINGS_KEY, &value)
            .context("saving settings")
    }

    pub fn validate(&self) -> Result<()> {
        let url = self.api_url.trim();
        if !url.starts_with("http://") && !url.starts_with("https://") {
            bail!(
                "Invalid API URL '{}': expected http:// or https:// URL",
                self.api_url
            );
        }
        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        if let Some(api_url) = non_empty_env(API_URL_ENV) {
            self.api_url = api_url;
        }
        if let Some(model) = non_empty_env(MODEL_ENV) {
            self.model_name = model;
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: PathBuf,
    pub settings: Settings,
}

impl Config {
    /// Resolves the data directory, reads persisted settings from it and
    /// applies environment overrides on top.
    pub fn load() -> Result<Self> {
        let data_dir = resolve_data_dir()?;
        let storage = crate::storage::FileStorage::new(&data_dir);
        Ok(Self::from_storage(data_dir, &storage))
    }

    pub fn from_storage(data_dir: PathBuf, storage: &impl LocalStorage) -> Self {
        let mut settings = Settings::load(storage);
        settings.apply_env_overrides();
        Self { data_dir, settings }
    }

    pub fn validate(&self) -> Result<()> {
        self.settings.validate()
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn resolve_data_dir() -> Result<PathBuf> {
    if let Some(dir) = non_empty_env(DATA_DIR_ENV) {
        return Ok(PathBuf::from(dir));
    }
    dirs::data_dir()
        .map(|dir| dir.join(APP_DIR_NAME))
        .ok_or_else(|| anyhow!("unable to resolve a data directory; set {DATA_DIR_ENV}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use serde_json::json;

    #[test]
    fn test_defaults_when_nothing_stored() {
        let storage = MemoryStorage::new();
        assert_eq!(Settings::load(&storage), Settings::default());
        assert_eq!(Settings::default().api_url, "http://localhost:1234");
        assert_eq!(Settings::default().model_name, "");
    }

    #[test]
    fn test_partial_settings_merge_over_defaults() {
        let storage = MemoryStorage::with_value(SETTINGS_KEY, json!({ "modelName": "qwen3" }));
        let settings = Settings::load(&storage);
        assert_eq!(settings.api_url, DEFAULT_API_URL);
        assert_eq!(settings.model_name, "qwen3");
    }

    #[test]
    fn test_malformed_settings_fall_back_to_defaults() {
        let storage = MemoryStorage::with_value(SETTINGS_KEY, json!("not an object"));
        assert_eq!(Settings::load(&storage), Settings::default());
    }

    #[test]
    fn test_save_then_load() {
        let storage = MemoryStorage::new();
        let settings = Settings {
            api_url: "http://10.0.0.2:8080".into(),
            model_name: "mistral".into(),
        };
        settings.save(&storage).expect("save");
        assert_eq!(Settings::load(&storage), settings);
        assert_eq!(
            storage.load(SETTINGS_KEY),
            Some(json!({ "apiUrl": "http://10.0.0.2:8080", "modelName": "mistral" }))
        );
    }

    #[test]
    fn test_validate_rejects_non_http_urls() {
        let mut settings = Settings::default();
        assert!(settings.validate().is_ok());
        settings.api_url = "localhost:1234".into();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_env_overrides_apply_on_top_of_stored_settings() {
        let _env_lock = crate::test_support::ENV_LOCK.blocking_lock();
        std::env::set_var(MODEL_ENV, "from-env");
        std::env::remove_var(API_URL_ENV);
        let storage = MemoryStorage::with_value(
            SETTINGS_KEY,
            json!({ "apiUrl": "http://stored:1", "modelName": "stored" }),
        );

        let config = Config::from_storage(PathBuf::from("/tmp/llm-chat-test"), &storage);
        std::env::remove_var(MODEL_ENV);

        assert_eq!(config.settings.api_url, "http://stored:1");
        assert_eq!(config.settings.model_name, "from-env");
    }

    #[test]
    fn test_data_dir_env_override() {
        let _env_lock = crate::test_support::ENV_LOCK.blocking_lock();
        std::env::set_var(DATA_DIR_ENV, "/tmp/llm-chat-data");
        let dir = resolve_data_dir().expect("data dir");
        std::env::remove_var(DATA_DIR_ENV);
        assert_eq!(dir, PathBuf::from("/tmp/llm-chat-data"));
    }
}
