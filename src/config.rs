//! Configuration types for cvat-dl

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Environment variable holding the base API URL
pub const ENV_API_URL: &str = "CVAT_API_URL";
/// Environment variable holding the basic-auth username
pub const ENV_USERNAME: &str = "CVAT_USERNAME";
/// Environment variable holding the basic-auth password
pub const ENV_PASSWORD: &str = "CVAT_PASSWORD";
/// Environment variable holding the in-memory download threshold (GB)
pub const ENV_DOWNLOAD_THRESHOLD_GB: &str = "CVAT_DOWNLOAD_THRESHOLD_GB";
/// Environment variable holding the export poll interval (seconds)
pub const ENV_EXPORT_POLL_INTERVAL_SECS: &str = "CVAT_EXPORT_POLL_INTERVAL_SECS";
/// Environment variable holding the export deadline (seconds)
pub const ENV_EXPORT_TIMEOUT_SECS: &str = "CVAT_EXPORT_TIMEOUT_SECS";

/// Main configuration for [`CvatClient`](crate::CvatClient)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the CVAT REST API (default: "http://localhost:8080/api/v1")
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Basic-auth username (None = anonymous)
    #[serde(default)]
    pub username: Option<String>,

    /// Basic-auth password
    #[serde(default)]
    pub password: Option<String>,

    /// Per-request timeout for metadata GETs (default: 60 seconds)
    #[serde(default = "default_request_timeout", with = "duration_serde")]
    pub request_timeout: Duration,

    /// Exports advertised at or below this size are buffered in memory,
    /// larger ones are streamed to a `task-{id}.zip` file (default: 1.0 GB)
    #[serde(default = "default_download_threshold_gb")]
    pub download_threshold_gb: f64,

    /// Sleep between export readiness polls (default: 5 seconds)
    #[serde(default = "default_export_poll_interval", with = "duration_serde")]
    pub export_poll_interval: Duration,

    /// Give up on an export that is not ready after this long (None = poll forever)
    #[serde(default, with = "optional_duration_serde")]
    pub export_timeout: Option<Duration>,

    /// Dataset format requested from the export endpoint
    #[serde(default = "default_export_format")]
    pub export_format: String,

    /// File extensions treated as images when extracting exports (case-insensitive)
    #[serde(default = "default_image_extensions")]
    pub image_extensions: Vec<String>,

    /// Delete the streamed `task-{id}.zip` once its images are extracted (default: false)
    #[serde(default)]
    pub remove_downloaded_archive: bool,

    /// Transport retry settings for metadata requests
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            username: None,
            password: None,
            request_timeout: default_request_timeout(),
            download_threshold_gb: default_download_threshold_gb(),
            export_poll_interval: default_export_poll_interval(),
            export_timeout: None,
            export_format: default_export_format(),
            image_extensions: default_image_extensions(),
            remove_downloaded_archive: false,
            retry: RetryConfig::default(),
        }
    }
}

impl Config {
    /// Build a configuration from `CVAT_*` environment variables
    ///
    /// Unset variables fall back to the defaults. A variable that is set but cannot be
    /// parsed is a configuration error rather than a silent fallback.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(url) = std::env::var(ENV_API_URL) {
            config.api_url = url;
        }
        config.username = std::env::var(ENV_USERNAME).ok();
        config.password = std::env::var(ENV_PASSWORD).ok();

        if let Some(threshold) = parse_env::<f64>(ENV_DOWNLOAD_THRESHOLD_GB)? {
            config.download_threshold_gb = threshold;
        }
        if let Some(secs) = parse_env::<u64>(ENV_EXPORT_POLL_INTERVAL_SECS)? {
            config.export_poll_interval = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_env::<u64>(ENV_EXPORT_TIMEOUT_SECS)? {
            config.export_timeout = Some(Duration::from_secs(secs));
        }

        config.validate()?;
        Ok(config)
    }

    /// Check that the configuration is usable
    pub fn validate(&self) -> Result<()> {
        let url = url::Url::parse(&self.api_url).map_err(|e| {
            Error::config("api_url", format!("invalid URL '{}': {}", self.api_url, e))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::config(
                "api_url",
                format!("unsupported scheme '{}'", url.scheme()),
            ));
        }

        if !self.download_threshold_gb.is_finite() || self.download_threshold_gb < 0.0 {
            return Err(Error::config(
                "download_threshold_gb",
                format!(
                    "must be a non-negative number, got {}",
                    self.download_threshold_gb
                ),
            ));
        }

        if self.export_poll_interval.is_zero() {
            return Err(Error::config(
                "export_poll_interval",
                "must be greater than zero",
            ));
        }

        if self.password.is_some() && self.username.is_none() {
            return Err(Error::config("username", "password given without username"));
        }

        Ok(())
    }

    /// Base API URL without a trailing slash
    pub fn base_url(&self) -> &str {
        self.api_url.trim_end_matches('/')
    }
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Result<Option<T>>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| Error::config(key, format!("cannot parse '{}': {}", raw, e))),
        Err(_) => Ok(None),
    }
}

/// Retry configuration for transient transport failures
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (default: 3)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Initial delay before first retry (default: 1 second)
    #[serde(default = "default_initial_delay", with = "duration_serde")]
    pub initial_delay: Duration,

    /// Maximum delay between retries (default: 30 seconds)
    #[serde(default = "default_max_delay", with = "duration_serde")]
    pub max_delay: Duration,

    /// Multiplier for exponential backoff (default: 2.0)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Add random jitter to delays (default: true)
    #[serde(default = "default_true")]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay: default_initial_delay(),
            max_delay: default_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: true,
        }
    }
}

fn default_api_url() -> String {
    "http://localhost:8080/api/v1".to_string()
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(60)
}

fn default_download_threshold_gb() -> f64 {
    1.0
}

fn default_export_poll_interval() -> Duration {
    Duration::from_secs(5)
}

fn default_export_format() -> String {
    "CVAT for images 1.1".to_string()
}

fn default_image_extensions() -> Vec<String> {
    vec![
        "jpg".into(),
        "jpeg".into(),
        "png".into(),
        "bmp".into(),
        "gif".into(),
        "tif".into(),
        "tiff".into(),
        "webp".into(),
    ]
}

fn default_true() -> bool {
    true
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(30)
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

// Duration serialization helper
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

// Optional Duration serialization helper
mod optional_duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => serializer.serialize_some(&d.as_secs()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = Option::<u64>::deserialize(deserializer)?;
        Ok(secs.map(Duration::from_secs))
    }
}
