//! Configuration management for the agent.

use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Agent configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Address of the local HTTP surface
    pub host: String,
    pub port: u16,
    /// SQLite connection URL of the durable local store
    pub database_url: String,
    /// Base URL of the remote benefits API
    pub api_base_url: String,
    /// Bearer token forwarded to the remote API
    pub api_token: Option<String>,
    /// Upper bound for every outbound request
    pub request_timeout: Duration,
    /// Period of the background drain while online
    pub sync_interval: Duration,
    /// Delay between a reconnect and the drain it triggers
    pub reconnect_debounce: Duration,
    /// Pause between two deliveries within a pass
    pub operation_delay: Duration,
    pub max_retries: u32,
    /// Treat 4xx rejections as terminal instead of consuming a retry
    pub client_errors_permanent: bool,
    /// Age after which a cached dashboard report is reported as stale
    pub dashboard_max_age: Duration,
    /// Period of the pending-count refresh for the status facade
    pub status_refresh_interval: Duration,
    /// Connectivity assumed until the PWA shell reports otherwise
    pub start_online: bool,
}

impl Config {
    /// Defaults for everything except the API location.
    pub fn new(api_base_url: impl Into<String>) -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 4100,
            database_url: "sqlite://beneficios-offline.db".to_string(),
            api_base_url: api_base_url.into(),
            api_token: None,
            request_timeout: Duration::from_secs(10),
            sync_interval: Duration::from_secs(5 * 60),
            reconnect_debounce: Duration::from_secs(1),
            operation_delay: Duration::from_millis(100),
            max_retries: beneficios_engine::MAX_RETRIES,
            client_errors_permanent: false,
            dashboard_max_age: Duration::from_secs(30 * 60),
            status_refresh_interval: Duration::from_secs(30),
            start_online: true,
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_base_url = env::var("API_BASE_URL").map_err(|_| ConfigError::MissingApiBaseUrl)?;
        let mut config = Self::new(api_base_url.trim_end_matches('/'));

        if let Ok(host) = env::var("HOST") {
            config.host = host;
        }
        config.port = parse_var("PORT", config.port)?;
        if let Ok(url) = env::var("DATABASE_URL") {
            config.database_url = url;
        }
        config.api_token = env::var("API_TOKEN").ok().filter(|t| !t.is_empty());

        config.request_timeout = millis_var("REQUEST_TIMEOUT_MS", config.request_timeout)?;
        config.sync_interval = secs_var("SYNC_INTERVAL_SECS", config.sync_interval)?;
        config.reconnect_debounce = millis_var("RECONNECT_DEBOUNCE_MS", config.reconnect_debounce)?;
        config.operation_delay = millis_var("OPERATION_DELAY_MS", config.operation_delay)?;
        config.max_retries = parse_var("MAX_RETRIES", config.max_retries)?;
        config.client_errors_permanent =
            bool_var("CLIENT_ERRORS_PERMANENT", config.client_errors_permanent)?;
        config.dashboard_max_age = secs_var("DASHBOARD_MAX_AGE_SECS", config.dashboard_max_age)?;
        config.status_refresh_interval =
            secs_var("STATUS_REFRESH_SECS", config.status_refresh_interval)?;
        config.start_online = bool_var("START_ONLINE", config.start_online)?;

        if config.max_retries == 0 {
            return Err(ConfigError::Invalid("MAX_RETRIES"));
        }

        Ok(config)
    }

    /// Address the local HTTP surface binds to.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_var<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid(name)),
        Err(_) => Ok(default),
    }
}

fn millis_var(name: &'static str, default: Duration) -> Result<Duration, ConfigError> {
    parse_var(name, default.as_millis() as u64).map(Duration::from_millis)
}

fn secs_var(name: &'static str, default: Duration) -> Result<Duration, ConfigError> {
    parse_var(name, default.as_secs()).map(Duration::from_secs)
}

fn bool_var(name: &'static str, default: bool) -> Result<bool, ConfigError> {
    match env::var(name) {
        Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::Invalid(name)),
        },
        Err(_) => Ok(default),
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("API_BASE_URL environment variable is required")]
    MissingApiBaseUrl,

    #[error("Invalid {0} value")]
    Invalid(&'static str),
}
