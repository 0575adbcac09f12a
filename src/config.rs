use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::auth::Token;
use crate::error::GitLabToolingError;
use crate::time_units::parse_duration;

/// Configuration file structure for gitlab-tooling.
///
/// Every section is optional in the file; missing keys fall back to the
/// defaults below. Configuration files are loaded from the current directory
/// or a specified path.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    /// GitLab instance and request settings
    #[serde(default)]
    pub gitlab: GitLabConfig,

    /// REST response caching
    #[serde(default)]
    pub cache: CacheConfig,

    /// Rendering preferences
    #[serde(default)]
    pub display: DisplayConfig,

    /// Periodic re-rendering
    #[serde(default)]
    pub polling: PollingConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct GitLabConfig {
    /// GitLab instance base URL
    #[serde(default = "default_gitlab_base_url")]
    pub base_url: String,

    /// GitLab personal access token
    pub token: Option<String>,

    /// Only fetch merge requests in the `opened` state
    #[serde(default)]
    pub open_merge_requests_only: bool,

    /// Per-request timeout as a duration string (e.g. "30s")
    #[serde(default = "default_request_timeout")]
    pub request_timeout: String,

    /// How often a rate-limited (429) request is retried
    #[serde(default = "default_rate_limit_retries")]
    pub rate_limit_retries: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CacheConfig {
    /// Cache REST API responses on disk
    #[serde(default)]
    pub enabled: bool,

    /// Time to live of a cached response as a duration string (e.g. "1d")
    #[serde(default = "default_cache_expiration")]
    pub expiration: String,

    /// Cache directory, defaults to the platform cache directory
    pub directory: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DisplayConfig {
    /// Show a one-line project summary instead of the info table
    #[serde(default)]
    pub compact_info_card: bool,

    /// Hide additional fields of listed items
    #[serde(default)]
    pub compact_mode: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PollingConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Interval between polls as a duration string (e.g. "5m")
    #[serde(default = "default_polling_interval")]
    pub interval: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct LoggingConfig {
    /// Emit debug log messages
    #[serde(default)]
    pub debug: bool,
}

/// Values that take precedence over the loaded configuration.
///
/// Only fields that are `Some` are applied.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub base_url: Option<String>,
    pub token: Option<String>,
    pub open_merge_requests_only: Option<bool>,
    pub cache_enabled: Option<bool>,
    pub cache_expiration: Option<String>,
    pub cache_directory: Option<PathBuf>,
    pub compact_info_card: Option<bool>,
    pub compact_mode: Option<bool>,
    pub polling_interval: Option<String>,
    pub debug: Option<bool>,
}

impl Default for GitLabConfig {
    fn default() -> Self {
        Self {
            base_url: default_gitlab_base_url(),
            token: None,
            open_merge_requests_only: false,
            request_timeout: default_request_timeout(),
            rate_limit_retries: default_rate_limit_retries(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            expiration: default_cache_expiration(),
            directory: None,
        }
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval: default_polling_interval(),
        }
    }
}

fn default_gitlab_base_url() -> String {
    "https://gitlab.com".to_string()
}

fn default_request_timeout() -> String {
    "30s".to_string()
}

fn default_rate_limit_retries() -> u32 {
    2
}

fn default_cache_expiration() -> String {
    "1d".to_string()
}

fn default_polling_interval() -> String {
    "5m".to_string()
}

impl GitLabConfig {
    pub fn token(&self) -> Option<Token> {
        self.token
            .as_deref()
            .filter(|t| !t.is_empty())
            .map(Token::from)
    }

    pub fn request_timeout(&self) -> crate::error::Result<Duration> {
        parse_duration(&self.request_timeout)
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> crate::error::Result<Duration> {
        parse_duration(&self.expiration)
    }

    /// Configured directory, or `<platform cache dir>/gitlab-tooling/cache`.
    pub fn directory(&self) -> crate::error::Result<PathBuf> {
        if let Some(directory) = &self.directory {
            return Ok(directory.clone());
        }

        dirs::cache_dir()
            .map(|dir| dir.join("gitlab-tooling").join("cache"))
            .ok_or_else(|| GitLabToolingError::Config("No cache directory found".into()))
    }
}

impl PollingConfig {
    pub fn interval(&self) -> crate::error::Result<Duration> {
        parse_duration(&self.interval)
    }
}

impl Config {
    /// Load configuration from a file.
    ///
    /// Searches for configuration files in this order:
    /// 1. Specified path
    /// 2. ./gitlab-tooling.toml
    /// 3. ./gitlab-tooling.json
    /// 4. ./gitlab-tooling.yaml
    /// 5. ./gitlab-tooling.yml
    ///
    /// Returns default configuration if no file is found.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load_from_path(path);
        }

        let candidates = [
            "gitlab-tooling.toml",
            "gitlab-tooling.json",
            "gitlab-tooling.yaml",
            "gitlab-tooling.yml",
        ];

        for candidate in &candidates {
            let path = Path::new(candidate);
            if path.exists() {
                return Self::load_from_path(path);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file path.
    fn load_from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or("");

        match extension {
            "toml" => toml::from_str(&contents)
                .with_context(|| format!("Failed to parse TOML config: {}", path.display())),
            "json" => serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display())),
            "yaml" | "yml" => serde_yaml::from_str(&contents)
                .with_context(|| format!("Failed to parse YAML config: {}", path.display())),
            _ => toml::from_str(&contents)
                .or_else(|_| serde_json::from_str(&contents))
                .or_else(|_| serde_yaml::from_str(&contents))
                .with_context(|| format!("Failed to parse config file: {}", path.display())),
        }
    }

    /// Returns a copy with every `Some` override applied on top.
    #[must_use]
    pub fn with_overrides(mut self, overrides: ConfigOverrides) -> Self {
        let ConfigOverrides {
            base_url,
            token,
            open_merge_requests_only,
            cache_enabled,
            cache_expiration,
            cache_directory,
            compact_info_card,
            compact_mode,
            polling_interval,
            debug,
        } = overrides;

        if let Some(base_url) = base_url {
            self.gitlab.base_url = base_url;
        }
        if token.is_some() {
            self.gitlab.token = token;
        }
        if let Some(open_only) = open_merge_requests_only {
            self.gitlab.open_merge_requests_only = open_only;
        }
        if let Some(enabled) = cache_enabled {
            self.cache.enabled = enabled;
        }
        if let Some(expiration) = cache_expiration {
            self.cache.expiration = expiration;
        }
        if cache_directory.is_some() {
            self.cache.directory = cache_directory;
        }
        if let Some(compact) = compact_info_card {
            self.display.compact_info_card = compact;
        }
        if let Some(compact) = compact_mode {
            self.display.compact_mode = compact;
        }
        if let Some(interval) = polling_interval {
            self.polling.interval = interval;
        }
        if let Some(debug) = debug {
            self.logging.debug = debug;
        }

        self
    }

    /// Checks every duration string so a malformed value fails at startup.
    pub fn validate(&self) -> crate::error::Result<()> {
        self.gitlab.request_timeout()?;
        self.cache.ttl()?;
        self.polling.interval()?;
        Ok(())
    }
}
