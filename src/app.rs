use crate::error::ConfigError;
use directories::BaseDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_AVATAR_BUCKET: &str = "profile-images";

const ENV_BASE_URL: &str = "COACHDESK_BASE_URL";
const ENV_API_KEY: &str = "COACHDESK_API_KEY";
const ENV_ACCESS_TOKEN: &str = "COACHDESK_ACCESS_TOKEN";
const ENV_USER_ID: &str = "COACHDESK_USER_ID";

fn default_bucket() -> String {
    DEFAULT_AVATAR_BUCKET.to_string()
}

/// Connection settings for the hosted backend plus the signed-in user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppConfig {
    #[serde(default)]
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default = "default_bucket")]
    pub avatar_bucket: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            api_key: String::new(),
            access_token: None,
            user_id: None,
            avatar_bucket: default_bucket(),
        }
    }
}

/// The signed-in identity, passed explicitly to whatever needs it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: String,
    pub access_token: Option<String>,
}

impl AppConfig {
    pub fn config_path() -> Option<PathBuf> {
        let base = BaseDirs::new()?;
        Some(base.config_dir().join("coachdesk.toml"))
    }

    /// Loads the TOML file (if any) and applies environment overrides.
    /// A missing file is not an error; a malformed one is.
    pub fn load() -> Result<Self, ConfigError> {
        let mut cfg = match Self::config_path() {
            Some(path) if path.exists() => Self::load_from(&path)?,
            _ => Self::default(),
        };
        cfg.apply_overrides(|key| std::env::var(key).ok());
        Ok(cfg)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let mut cfg: AppConfig = toml::from_str(text)?;
        cfg.base_url = normalize_base(&cfg.base_url);
        Ok(cfg)
    }

    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(url) = non_empty(ENV_BASE_URL) {
            self.base_url = normalize_base(&url);
        }
        if let Some(key) = non_empty(ENV_API_KEY) {
            self.api_key = key;
        }
        if let Some(token) = non_empty(ENV_ACCESS_TOKEN) {
            self.access_token = Some(token);
        }
        if let Some(user) = non_empty(ENV_USER_ID) {
            self.user_id = Some(user);
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.base_url.is_empty() && !self.api_key.is_empty()
    }

    pub fn session(&self) -> Option<Session> {
        let user_id = self.user_id.as_deref().map(str::trim).filter(|u| !u.is_empty())?;
        Some(Session {
            user_id: user_id.to_string(),
            access_token: self.access_token.clone(),
        })
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        let path = Self::config_path().ok_or(ConfigError::NoConfigDir)?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let toml = toml::to_string_pretty(self)?;
        fs::write(path, toml)?;
        Ok(())
    }
}

fn normalize_base(input: &str) -> String {
    if input.trim().is_empty() {
        return String::new();
    }
    crate::utils::normalize_url(input)
}

#[cfg(feature = "gui")]
pub fn build_ui(app: &adw::Application) {
    let config = match AppConfig::load() {
        Ok(cfg) => cfg,
        Err(err) => {
            log::error!("Failed to load configuration: {err}");
            AppConfig::default()
        }
    };
    crate::ui::main_window::show_main_window(app, config);
}
