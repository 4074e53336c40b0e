//! Environment variable loading for configuration

use std::env;
use std::time::Duration;

use url::Url;

use super::builder::ConfigBuilder;
use crate::Result;

/// Environment variable names
mod vars {
    pub const API_URL: &str = "INTERACTIONS_API_URL";
    pub const REQUEST_TIMEOUT_SECS: &str = "INTERACTIONS_REQUEST_TIMEOUT_SECS";
    pub const CACHE_STALE_SECS: &str = "INTERACTIONS_CACHE_STALE_SECS";
    pub const CACHE_MAX_ENTRIES: &str = "INTERACTIONS_CACHE_MAX_ENTRIES";
    pub const PERSIST_SITE: &str = "INTERACTIONS_PERSIST_SITE";
    pub const CREDENTIALS_PATH: &str = "INTERACTIONS_CREDENTIALS_PATH";
    pub const RUST_LOG: &str = "RUST_LOG";
    pub const JSON_LOGS: &str = "INTERACTIONS_JSON_LOGS";
}

/// Load configuration from environment variables
pub fn load_from_env(mut builder: ConfigBuilder) -> Result<ConfigBuilder> {
    if let Ok(url_str) = env::var(vars::API_URL) {
        let url = Url::parse(&url_str)
            .map_err(|e| crate::Error::Config(format!("Invalid {}: {}", vars::API_URL, e)))?;
        builder = builder.base_url(url);
    }

    if let Ok(timeout_str) = env::var(vars::REQUEST_TIMEOUT_SECS)
        && let Ok(secs) = timeout_str.parse::<u64>()
    {
        builder = builder.request_timeout(Duration::from_secs(secs));
    }

    if let Ok(stale_str) = env::var(vars::CACHE_STALE_SECS)
        && let Ok(secs) = stale_str.parse::<u64>()
    {
        builder = builder.staleness_window(Duration::from_secs(secs));
    }

    if let Ok(max_str) = env::var(vars::CACHE_MAX_ENTRIES)
        && let Ok(max) = max_str.parse::<usize>()
    {
        builder = builder.max_entries(max);
    }

    if let Ok(val) = env::var(vars::PERSIST_SITE) {
        builder = builder.persist_preferred_site(parse_bool(&val));
    }

    if let Ok(path) = env::var(vars::CREDENTIALS_PATH)
        && !path.trim().is_empty()
    {
        builder = builder.credentials_path(path);
    }

    if let Ok(level) = env::var(vars::RUST_LOG) {
        builder = builder.log_level(level);
    }

    if let Ok(val) = env::var(vars::JSON_LOGS) {
        builder = builder.json_logs(parse_bool(&val));
    }

    Ok(builder)
}

fn parse_bool(s: &str) -> bool {
    matches!(s.to_lowercase().as_str(), "true" | "1" | "yes" | "on")
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    const ALL_VARS: &[&str] = &[
        vars::API_URL,
        vars::REQUEST_TIMEOUT_SECS,
        vars::CACHE_STALE_SECS,
        vars::CACHE_MAX_ENTRIES,
        vars::PERSIST_SITE,
        vars::CREDENTIALS_PATH,
        vars::RUST_LOG,
        vars::JSON_LOGS,
    ];

    /// Run `f` with exactly `vars` set among the variables this module reads
    fn with_env_vars<F, R>(vars: &[(&str, &str)], f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let _guard = ENV_MUTEX.lock().unwrap();

        let old_values: Vec<_> = ALL_VARS.iter().map(|k| (*k, env::var(k).ok())).collect();

        for key in ALL_VARS {
            // SAFETY: We hold a mutex lock to ensure no concurrent modifications
            unsafe { env::remove_var(key) };
        }
        for (key, value) in vars {
            // SAFETY: We hold a mutex lock to ensure no concurrent modifications
            unsafe { env::set_var(key, value) };
        }

        let result = f();

        for (key, old_value) in old_values {
            match old_value {
                // SAFETY: We hold a mutex lock to ensure no concurrent modifications
                Some(v) => unsafe { env::set_var(key, v) },
                None => unsafe { env::remove_var(key) },
            }
        }

        result
    }

    #[test]
    fn test_parse_bool() {
        assert!(parse_bool("true"));
        assert!(parse_bool("TRUE"));
        assert!(parse_bool("1"));
        assert!(parse_bool("yes"));
        assert!(parse_bool("on"));
        assert!(!parse_bool("false"));
        assert!(!parse_bool("0"));
        assert!(!parse_bool(""));
    }

    #[test]
    fn test_load_api_url() {
        with_env_vars(&[("INTERACTIONS_API_URL", "http://localhost:5000/api")], || {
            let config = load_from_env(ConfigBuilder::new()).unwrap().build().unwrap();
            assert_eq!(
                config.base_url.map(String::from),
                Some("http://localhost:5000/api".to_string())
            );
        });
    }

    #[test]
    fn test_load_invalid_url() {
        with_env_vars(&[("INTERACTIONS_API_URL", "not a valid url")], || {
            assert!(load_from_env(ConfigBuilder::new()).is_err());
        });
    }

    #[test]
    fn test_load_timeouts_and_cache() {
        with_env_vars(
            &[
                ("INTERACTIONS_REQUEST_TIMEOUT_SECS", "10"),
                ("INTERACTIONS_CACHE_STALE_SECS", "120"),
                ("INTERACTIONS_CACHE_MAX_ENTRIES", "250"),
            ],
            || {
                let config = load_from_env(ConfigBuilder::new()).unwrap().build().unwrap();
                assert_eq!(config.request_timeout, Duration::from_secs(10));
                assert_eq!(config.cache.staleness_window, Duration::from_secs(120));
                assert_eq!(config.cache.max_entries, 250);
            },
        );
    }

    #[test]
    fn test_invalid_numbers_ignored() {
        with_env_vars(
            &[
                ("INTERACTIONS_REQUEST_TIMEOUT_SECS", "soon"),
                ("INTERACTIONS_CACHE_MAX_ENTRIES", "-4"),
            ],
            || {
                let config = load_from_env(ConfigBuilder::new()).unwrap().build().unwrap();
                assert_eq!(config.request_timeout, Duration::from_secs(30));
                assert_eq!(config.cache.max_entries, 1000);
            },
        );
    }

    #[test]
    fn test_load_persistence_and_logging() {
        with_env_vars(
            &[
                ("INTERACTIONS_PERSIST_SITE", "off"),
                ("INTERACTIONS_CREDENTIALS_PATH", "/var/lib/ic/creds.json"),
                ("RUST_LOG", "debug"),
                ("INTERACTIONS_JSON_LOGS", "yes"),
            ],
            || {
                let config = load_from_env(ConfigBuilder::new()).unwrap().build().unwrap();
                assert!(!config.persist_preferred_site);
                assert_eq!(
                    config.credentials_path,
                    Some(std::path::PathBuf::from("/var/lib/ic/creds.json"))
                );
                assert_eq!(config.telemetry.log_level, "debug");
                assert!(config.telemetry.json_logs);
            },
        );
    }

    #[test]
    fn test_load_no_env_vars() {
        with_env_vars(&[], || {
            let config = load_from_env(ConfigBuilder::new()).unwrap().build().unwrap();
            assert!(config.base_url.is_none());
            assert!(config.persist_preferred_site);
        });
    }
}
