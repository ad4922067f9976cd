//! Configuration management for the coverage checker.
//!
//! Provides TOML-based configuration with XDG-compliant paths and
//! environment variable overrides.

use crate::error::{ConfigError, ConfigResult};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main application configuration.
///
/// Loaded from `~/.config/warranty-check/config.toml` (or platform
/// equivalent) unless an explicit path is given. If the default file doesn't
/// exist, default values are used.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Upstream service endpoints
    pub endpoint: EndpointConfig,
    /// Retry and backoff limits
    pub retry: RetryConfig,
    /// OCR engine settings
    pub ocr: OcrConfig,
}

impl AppConfig {
    /// Load configuration from `path`, or from the default location when
    /// `path` is `None`.
    ///
    /// # Errors
    /// Returns error if:
    /// - An explicit path does not exist
    /// - The config directory cannot be determined
    /// - The file exists but cannot be read or is not valid TOML
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        if let Some(path) = path {
            if !path.exists() {
                return Err(ConfigError::NotFound {
                    path: path.display().to_string(),
                });
            }
            return Self::read(path);
        }

        let config_path = Self::config_path()?;
        if config_path.exists() {
            Self::read(&config_path)
        } else {
            tracing::debug!("Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load configuration, apply environment overrides and validate.
    ///
    /// Supports the following environment variables:
    /// - `WARRANTY_BASE_URL`: Override the service root URL
    /// - `WARRANTY_USER_AGENT`: Pin a single user agent string
    /// - `WARRANTY_OCR_COMMAND`: Override the OCR executable
    /// - `WARRANTY_TOKEN_RETRIES`: Override token acquisition retries
    pub fn load_with_env(path: Option<&Path>) -> ConfigResult<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    fn read(path: &Path) -> ConfigResult<Self> {
        tracing::debug!("Loading config from {}", path.display());
        let contents = fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    /// Apply overrides from a variable lookup (normally the process env).
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("WARRANTY_BASE_URL") {
            tracing::debug!("Override endpoint.base_url from env: {}", url);
            self.endpoint.base_url = url;
        }

        if let Some(agent) = lookup("WARRANTY_USER_AGENT") {
            tracing::debug!("Override endpoint.user_agent from env");
            self.endpoint.user_agent = Some(agent);
        }

        if let Some(command) = lookup("WARRANTY_OCR_COMMAND") {
            tracing::debug!("Override ocr.command from env: {}", command);
            self.ocr.command = command;
        }

        if let Some(val) = lookup("WARRANTY_TOKEN_RETRIES") {
            if let Ok(retries) = val.parse() {
                self.retry.token_retries = retries;
                tracing::debug!("Override retry.token_retries from env: {}", retries);
            }
        }
    }

    /// Reject values the lookup pipeline cannot run with.
    pub fn validate(&self) -> ConfigResult<()> {
        fn invalid(field: &str, reason: &str) -> ConfigError {
            ConfigError::InvalidValue {
                field: field.to_string(),
                reason: reason.to_string(),
            }
        }

        if self.endpoint.timeout_secs == 0 {
            return Err(invalid("endpoint.timeout_secs", "must be at least 1"));
        }
        if self.retry.captcha_attempts == 0 {
            return Err(invalid("retry.captcha_attempts", "must be at least 1"));
        }
        if self.retry.invalid_captcha_limit == 0 {
            return Err(invalid("retry.invalid_captcha_limit", "must be at least 1"));
        }
        if self.retry.backoff_cap_secs == 0 {
            return Err(invalid("retry.backoff_cap_secs", "must be at least 1"));
        }
        if !self.retry.jitter_min.is_finite() || self.retry.jitter_min < 0.0 {
            return Err(invalid("retry.jitter_min", "must be a finite, non-negative number"));
        }
        if !self.retry.jitter_max.is_finite() || self.retry.jitter_max > MAX_JITTER_FACTOR {
            return Err(invalid(
                "retry.jitter_max",
                &format!("must be a finite number no greater than {MAX_JITTER_FACTOR}"),
            ));
        }
        if self.retry.jitter_min > self.retry.jitter_max {
            return Err(invalid(
                "retry.jitter_min",
                "must not be greater than retry.jitter_max",
            ));
        }
        if self.ocr.command.trim().is_empty() {
            return Err(invalid("ocr.command", "must not be empty"));
        }
        Ok(())
    }

    /// Save configuration to the default location.
    ///
    /// Creates the config directory if it doesn't exist.
    pub fn save(&self) -> ConfigResult<()> {
        let config_path = Self::config_path()?;
        let config_dir = config_path
            .parent()
            .ok_or_else(|| ConfigError::InvalidValue {
                field: "config_path".to_string(),
                reason: "no parent directory".to_string(),
            })?;

        fs::create_dir_all(config_dir)?;
        tracing::debug!("Saving config to {}", config_path.display());

        let contents = toml::to_string_pretty(self)?;
        fs::write(config_path, contents)?;
        Ok(())
    }

    /// Get the path to the configuration file.
    ///
    /// Uses XDG base directories: `~/.config/warranty-check/config.toml`
    pub fn config_path() -> ConfigResult<PathBuf> {
        let dirs = ProjectDirs::from("com", "warranty-check", "warranty-check")
            .ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.config_dir().join("config.toml"))
    }
}

/// Upstream coverage service endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    /// Service root; the token is issued by a GET against it
    pub base_url: String,
    /// Captcha challenge path, relative to `base_url`
    pub captcha_path: String,
    /// Coverage lookup path, relative to `base_url`
    pub coverage_path: String,
    /// Response header carrying the session token
    pub token_header: String,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
    /// Pin a single user agent instead of rotating the built-in pool
    pub user_agent: Option<String>,
}

impl EndpointConfig {
    /// Absolute URL for a path relative to `base_url`.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            base_url: "https://checkcoverage.apple.com".to_string(),
            captcha_path: "/api/v1/facade/captcha?type=image".to_string(),
            coverage_path: "/api/v1/facade/coverage".to_string(),
            token_header: "X-APPLE-AUTH-TOKEN".to_string(),
            timeout_secs: 10,
            user_agent: None,
        }
    }
}

/// Largest accepted jitter factor.
pub const MAX_JITTER_FACTOR: f64 = 10.0;

/// Retry, backoff and attempt limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Captcha fetch/solve cycles per challenge request
    pub captcha_attempts: u32,
    /// Invalid captcha answers tolerated before the token is refreshed
    pub invalid_captcha_limit: u32,
    /// Extra token requests after a missing token header (0 = fail fast)
    pub token_retries: u32,
    /// Upper bound on the pre-jitter backoff, in seconds
    pub backoff_cap_secs: u64,
    /// Lower bound of the jitter factor
    pub jitter_min: f64,
    /// Upper bound of the jitter factor
    pub jitter_max: f64,
    /// Grow the backoff with consecutive rate limits instead of always using attempt 1
    pub escalate: bool,
    /// Transport failures tolerated per identifier before the batch aborts
    pub max_transport_errors: u32,
    /// Token refreshes allowed per identifier; unbounded when unset
    pub max_token_refreshes: Option<u32>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            captcha_attempts: 3,
            invalid_captcha_limit: 6,
            token_retries: 2,
            backoff_cap_secs: 60,
            jitter_min: 0.5,
            jitter_max: 1.5,
            escalate: true,
            max_transport_errors: 5,
            max_token_refreshes: None,
        }
    }
}

/// OCR engine settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Executable to run
    pub command: String,
    /// Recognition language
    pub language: String,
    /// Page segmentation mode (7 = single text line)
    pub page_segmentation_mode: u8,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            command: "tesseract".to_string(),
            language: "eng".to_string(),
            page_segmentation_mode: 7,
        }
    }
}
