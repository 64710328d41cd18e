use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::Deserialize;
use shared::domain::ProfileId;
use url::Url;

use crate::{error::ConfigError, gesture::GestureConfig};

pub const DEFAULT_CONFIG_FILE: &str = "profile_queue.toml";
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:3000/users";
pub const DEFAULT_VIEWER_ID: &str = "41f7f9da-dc0a-4657-a1a5-d70c062bc627";
pub const DEFAULT_PAGE_SIZE: usize = 10;
pub const DEFAULT_LOOKAHEAD_THRESHOLD: usize = 3;
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_SCREEN_WIDTH: f32 = 390.0;

#[derive(Debug, Clone)]
pub struct QueueSettings {
    pub api_base_url: String,
    pub viewer_id: String,
    pub page_size: usize,
    pub lookahead_threshold: usize,
    pub request_timeout: Duration,
    pub screen_width: f32,
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.into(),
            viewer_id: DEFAULT_VIEWER_ID.into(),
            page_size: DEFAULT_PAGE_SIZE,
            lookahead_threshold: DEFAULT_LOOKAHEAD_THRESHOLD,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            screen_width: DEFAULT_SCREEN_WIDTH,
        }
    }
}

impl QueueSettings {
    /// Normalizes the base url and rejects zero-sized knobs.
    pub fn finalize(mut self) -> Result<Self, ConfigError> {
        self.api_base_url = normalize_base_url(&self.api_base_url)?;
        self.viewer()?;
        if self.page_size == 0 {
            return Err(ConfigError::NotPositive { field: "page_size" });
        }
        if self.lookahead_threshold == 0 {
            return Err(ConfigError::NotPositive {
                field: "lookahead_threshold",
            });
        }
        if self.request_timeout.is_zero() {
            return Err(ConfigError::NotPositive {
                field: "request_timeout",
            });
        }
        if !(self.screen_width > 0.0) {
            return Err(ConfigError::NotPositive {
                field: "screen_width",
            });
        }
        Ok(self)
    }

    pub fn viewer(&self) -> Result<ProfileId, ConfigError> {
        Ok(ProfileId::new(self.viewer_id.as_str())?)
    }

    pub fn gesture_config(&self) -> GestureConfig {
        GestureConfig::for_screen_width(self.screen_width)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileSettings {
    api_base_url: Option<String>,
    viewer_id: Option<String>,
    page_size: Option<usize>,
    lookahead_threshold: Option<usize>,
    request_timeout_ms: Option<u64>,
    screen_width: Option<f32>,
}

/// Loads settings from defaults, then the config file, then the environment.
///
/// An explicit `path` must exist. Without one, `profile_queue.toml` in the
/// working directory is used when present.
pub fn load_settings(path: Option<&Path>) -> Result<QueueSettings, ConfigError> {
    let mut settings = QueueSettings::default();

    let file = match path {
        Some(path) => Some(path.to_path_buf()),
        None => {
            let fallback = PathBuf::from(DEFAULT_CONFIG_FILE);
            fallback.exists().then_some(fallback)
        }
    };
    if let Some(file) = file {
        let raw = fs::read_to_string(&file).map_err(|source| ConfigError::Read {
            path: file.display().to_string(),
            source,
        })?;
        apply_file_settings(&mut settings, &raw, &file)?;
    }

    apply_env_overrides(&mut settings, |key| std::env::var(key).ok())?;
    settings.finalize()
}

fn apply_file_settings(
    settings: &mut QueueSettings,
    raw: &str,
    path: &Path,
) -> Result<(), ConfigError> {
    let file_cfg: FileSettings = toml::from_str(raw).map_err(|source| ConfigError::Parse {
        path: path.display().to_string(),
        source,
    })?;

    if let Some(v) = file_cfg.api_base_url {
        settings.api_base_url = v;
    }
    if let Some(v) = file_cfg.viewer_id {
        settings.viewer_id = v;
    }
    if let Some(v) = file_cfg.page_size {
        settings.page_size = v;
    }
    if let Some(v) = file_cfg.lookahead_threshold {
        settings.lookahead_threshold = v;
    }
    if let Some(v) = file_cfg.request_timeout_ms {
        settings.request_timeout = Duration::from_millis(v);
    }
    if let Some(v) = file_cfg.screen_width {
        settings.screen_width = v;
    }
    Ok(())
}

fn apply_env_overrides(
    settings: &mut QueueSettings,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<(), ConfigError> {
    if let Some(v) = lookup("PROFILE_QUEUE_API_BASE_URL") {
        settings.api_base_url = v;
    }
    if let Some(v) = lookup("APP__API_BASE_URL") {
        settings.api_base_url = v;
    }

    if let Some(v) = lookup("PROFILE_QUEUE_VIEWER_ID") {
        settings.viewer_id = v;
    }
    if let Some(v) = lookup("APP__VIEWER_ID") {
        settings.viewer_id = v;
    }

    if let Some(v) = lookup("APP__PAGE_SIZE") {
        settings.page_size = parse_env("APP__PAGE_SIZE", &v)?;
    }
    if let Some(v) = lookup("APP__LOOKAHEAD_THRESHOLD") {
        settings.lookahead_threshold = parse_env("APP__LOOKAHEAD_THRESHOLD", &v)?;
    }
    if let Some(v) = lookup("APP__REQUEST_TIMEOUT_MS") {
        settings.request_timeout =
            Duration::from_millis(parse_env("APP__REQUEST_TIMEOUT_MS", &v)?);
    }
    Ok(())
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse::<T>()
        .map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        })
}

/// Validates an http(s) base url and strips trailing slashes.
pub fn normalize_base_url(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim();
    let parsed = Url::parse(trimmed).map_err(|source| ConfigError::BaseUrl {
        url: trimmed.to_string(),
        source,
    })?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ConfigError::BaseUrlScheme(parsed.scheme().to_string()));
    }
    Ok(trimmed.trim_end_matches('/').to_string())
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
