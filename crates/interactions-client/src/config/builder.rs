//! Configuration builder

use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use crate::Error;
use crate::cache::CacheConfig;
use crate::constants::DEFAULT_REQUEST_TIMEOUT;

/// Client configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// API root; required by the HTTP gateway only
    pub base_url: Option<Url>,
    pub request_timeout: Duration,
    pub cache: CacheConfig,
    /// Remember the last selected site across sessions
    pub persist_preferred_site: bool,
    /// File for durable credentials; memory only when unset
    pub credentials_path: Option<PathBuf>,
    pub telemetry: TelemetryConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            cache: CacheConfig::default(),
            persist_preferred_site: true,
            credentials_path: None,
            telemetry: TelemetryConfig::default(),
        }
    }
}

impl Config {
    #[must_use]
    pub const fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    pub fn validate(&self) -> crate::Result<()> {
        if self.request_timeout.is_zero() {
            return Err(Error::Config("request_timeout must be greater than zero".into()));
        }
        self.cache.validate()
    }
}

/// Telemetry configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryConfig {
    pub service_name: String,
    pub log_level: String,
    pub json_logs: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "interactions-client".to_string(),
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

/// Configuration builder with fluent API
#[derive(Debug)]
pub struct ConfigBuilder {
    base_url: Option<Url>,
    request_timeout: Option<Duration>,
    staleness_window: Option<Duration>,
    max_entries: Option<usize>,
    persist_preferred_site: Option<bool>,
    credentials_path: Option<PathBuf>,
    service_name: Option<String>,
    log_level: Option<String>,
    json_logs: Option<bool>,
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigBuilder {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            base_url: None,
            request_timeout: None,
            staleness_window: None,
            max_entries: None,
            persist_preferred_site: None,
            credentials_path: None,
            service_name: None,
            log_level: None,
            json_logs: None,
        }
    }

    #[must_use]
    pub fn base_url(mut self, url: Url) -> Self {
        self.base_url = Some(url);
        self
    }

    #[must_use]
    pub const fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    #[must_use]
    pub const fn staleness_window(mut self, window: Duration) -> Self {
        self.staleness_window = Some(window);
        self
    }

    #[must_use]
    pub const fn max_entries(mut self, max: usize) -> Self {
        self.max_entries = Some(max);
        self
    }

    #[must_use]
    pub const fn persist_preferred_site(mut self, persist: bool) -> Self {
        self.persist_preferred_site = Some(persist);
        self
    }

    #[must_use]
    pub fn credentials_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.credentials_path = Some(path.into());
        self
    }

    #[must_use]
    pub fn service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = Some(name.into());
        self
    }

    #[must_use]
    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = Some(level.into());
        self
    }

    #[must_use]
    pub const fn json_logs(mut self, enabled: bool) -> Self {
        self.json_logs = Some(enabled);
        self
    }

    /// Build and validate the configuration
    pub fn build(self) -> crate::Result<Config> {
        let defaults = Config::default();

        let mut cache = defaults.cache;
        if let Some(window) = self.staleness_window {
            cache = cache.with_staleness_window(window);
        }
        if let Some(max) = self.max_entries {
            cache = cache.with_max_entries(max);
        }

        let telemetry = TelemetryConfig {
            service_name: self
                .service_name
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(defaults.telemetry.service_name),
            log_level: self
                .log_level
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(defaults.telemetry.log_level),
            json_logs: self.json_logs.unwrap_or(defaults.telemetry.json_logs),
        };

        if let Some(url) = &self.base_url
            && !matches!(url.scheme(), "http" | "https")
        {
            return Err(Error::Config(format!(
                "base_url must use http or https, got {}",
                url.scheme()
            )));
        }

        let config = Config {
            base_url: self.base_url,
            request_timeout: self.request_timeout.unwrap_or(defaults.request_timeout),
            cache,
            persist_preferred_site: self
                .persist_preferred_site
                .unwrap_or(defaults.persist_preferred_site),
            credentials_path: self.credentials_path,
            telemetry,
        };
        config.validate()?;
        Ok(config)
    }
}
