use std::env;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::controller::form::DEFAULT_MIN_CLASSIFY_CHARS;
use crate::error::{AppError, AppResult};

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000/api/";
pub const DEFAULT_TIMEOUT_SECS: u64 = 15;

const CONFIG_FILE_NAME: &str = "config.json";
const ENV_BASE_URL: &str = "TICKETDESK_BASE_URL";
const ENV_TIMEOUT_SECS: &str = "TICKETDESK_TIMEOUT_SECS";
const ENV_MIN_CLASSIFY_CHARS: &str = "TICKETDESK_MIN_CLASSIFY_CHARS";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub base_url: String,
    pub request_timeout: Duration,
    pub min_classify_chars: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            min_classify_chars: DEFAULT_MIN_CLASSIFY_CHARS,
        }
    }
}

/// Command-line values that win over every other source.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub base_url: Option<String>,
    pub timeout_secs: Option<u64>,
}

impl AppConfig {
    /// Defaults, then the stored config file, then the environment, then
    /// command-line overrides.
    pub fn load(overrides: &ConfigOverrides) -> AppResult<Self> {
        let stored = StoredConfig::load()?;
        let env_lookup = |key: &str| env::var(key).ok();
        Self::resolve(&stored, env_lookup, overrides)
    }

    fn resolve(
        stored: &StoredConfig,
        env_lookup: impl Fn(&str) -> Option<String>,
        overrides: &ConfigOverrides,
    ) -> AppResult<Self> {
        let mut config = Self::default();

        if let Some(base_url) = non_empty(stored.base_url.as_deref()) {
            config.base_url = base_url.to_string();
        }
        if let Some(secs) = stored.timeout_secs {
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(min) = stored.min_classify_chars {
            config.min_classify_chars = min;
        }

        if let Some(base_url) = env_lookup(ENV_BASE_URL).filter(|value| !value.trim().is_empty()) {
            config.base_url = base_url.trim().to_string();
        }
        if let Some(raw) = env_lookup(ENV_TIMEOUT_SECS) {
            config.request_timeout = Duration::from_secs(parse_number(ENV_TIMEOUT_SECS, &raw)?);
        }
        if let Some(raw) = env_lookup(ENV_MIN_CLASSIFY_CHARS) {
            config.min_classify_chars = parse_number(ENV_MIN_CLASSIFY_CHARS, &raw)?;
        }

        if let Some(base_url) = non_empty(overrides.base_url.as_deref()) {
            config.base_url = base_url.to_string();
        }
        if let Some(secs) = overrides.timeout_secs {
            config.request_timeout = Duration::from_secs(secs);
        }

        if config.request_timeout.is_zero() {
            return Err(AppError::Configuration(
                "request timeout must be at least one second".to_string(),
            ));
        }
        if config.base_url == DEFAULT_BASE_URL {
            debug!("using default backend base URL {DEFAULT_BASE_URL}");
        }

        Ok(config)
    }
}

/// Values persisted by `ticketdesk config init`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_classify_chars: Option<usize>,
}

impl StoredConfig {
    pub fn load() -> AppResult<Self> {
        let path = config_file_path()?;
        match fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents).map_err(|err| {
                AppError::Configuration(format!("invalid config file {}: {err}", path.display()))
            }),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "could not read config file");
                Err(AppError::Io(err))
            }
        }
    }

    pub fn save(&self) -> AppResult<()> {
        let path = config_file_path()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_string_pretty(self)
            .map_err(|err| AppError::Configuration(format!("failed to write config: {err}")))?;
        fs::write(&path, data)?;
        Ok(())
    }
}

pub fn config_directory() -> AppResult<PathBuf> {
    ProjectDirs::from("", "", "ticketdesk")
        .map(|dirs| dirs.config_dir().to_path_buf())
        .ok_or_else(|| {
            AppError::Configuration("could not determine a config directory".to_string())
        })
}

pub fn config_file_path() -> AppResult<PathBuf> {
    Ok(config_directory()?.join(CONFIG_FILE_NAME))
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

fn parse_number<T: std::str::FromStr>(key: &str, raw: &str) -> AppResult<T> {
    raw.trim()
        .parse::<T>()
        .map_err(|_| AppError::Configuration(format!("{key} must be a whole number, got '{raw}'")))
}
