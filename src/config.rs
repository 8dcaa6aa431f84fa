use config::{Config, File};
pub use config::ConfigError;
use serde::Deserialize;

/// Main configuration struct
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Settings {
    /// Dashboard backend configuration
    #[serde(default)]
    pub api: ApiConfig,
    /// Filter behaviour (brand list)
    #[serde(default)]
    pub filters: FiltersConfig,
    /// Logging configuration
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the dashboard backend, e.g. "http://localhost:5002"
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Attempts per request before giving up (transport errors only)
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Base delay for exponential backoff between attempts
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
        }
    }
}

fn default_base_url() -> String {
    "http://127.0.0.1:5002".to_string()
}

fn default_timeout_secs() -> u64 {
    15
}

fn default_max_retries() -> u32 {
    2
}

fn default_retry_base_delay_ms() -> u64 {
    200
}

#[derive(Debug, Clone, Deserialize)]
pub struct FiltersConfig {
    /// Brands recognised in campaign names, matched in this order
    #[serde(default = "default_brands")]
    pub brands: Vec<String>,
}

impl Default for FiltersConfig {
    fn default() -> Self {
        Self {
            brands: default_brands(),
        }
    }
}

fn default_brands() -> Vec<String> {
    vec!["LS2".to_string(), "Bulldog".to_string(), "EGO".to_string()]
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// Log level: "error", "warn", "info", "debug", "trace"
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Settings {
    /// Load settings from a configuration file
    pub fn new(config_path: &str) -> Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(File::with_name(config_path))
            // Environment variables override the file
            // e.g. APP_API__BASE_URL=http://dashboard:5002
            .add_source(config::Environment::with_prefix("APP").separator("__"))
            .build()?;

        s.try_deserialize()
    }

    /// Load settings from environment variables only
    pub fn from_env() -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(config::Environment::with_prefix("APP").separator("__"))
            .build()?
            .try_deserialize()
    }
}
