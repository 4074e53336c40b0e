//! TOML configuration file loading

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use url::Url;

use super::builder::ConfigBuilder;
use crate::Result;

/// Configuration file locations checked in order
const CONFIG_PATHS: &[&str] = &[
    "./interactions-client.toml",
    "~/.config/interactions-client/config.toml",
];

/// Find the first existing configuration file
pub fn find_config_file() -> Option<PathBuf> {
    for path_str in CONFIG_PATHS {
        let path = if path_str.starts_with('~') {
            if let Ok(home) = std::env::var("HOME") {
                PathBuf::from(path_str.replacen('~', &home, 1))
            } else {
                continue;
            }
        } else {
            PathBuf::from(path_str)
        };

        if path.exists() {
            return Some(path);
        }
    }
    None
}

/// Load configuration from a TOML file
pub fn load_from_file(path: &Path, builder: ConfigBuilder) -> Result<ConfigBuilder> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        crate::Error::Config(format!(
            "Failed to read config file {}: {}",
            path.display(),
            e
        ))
    })?;

    let file_config: FileConfig = toml::from_str(&content).map_err(|e| {
        crate::Error::Config(format!(
            "Failed to parse config file {}: {}",
            path.display(),
            e
        ))
    })?;

    apply_file_config(builder, file_config)
}

fn apply_file_config(mut builder: ConfigBuilder, config: FileConfig) -> Result<ConfigBuilder> {
    if let Some(api) = config.api {
        if let Some(url_str) = api.base_url {
            let url = Url::parse(&url_str)
                .map_err(|e| crate::Error::Config(format!("Invalid API base URL: {e}")))?;
            builder = builder.base_url(url);
        }

        if let Some(timeout) = api.request_timeout_secs {
            builder = builder.request_timeout(Duration::from_secs(timeout));
        }
    }

    if let Some(cache) = config.cache {
        if let Some(secs) = cache.staleness_secs {
            builder = builder.staleness_window(Duration::from_secs(secs));
        }

        if let Some(max) = cache.max_entries {
            builder = builder.max_entries(max);
        }
    }

    if let Some(session) = config.session {
        if let Some(persist) = session.persist_preferred_site {
            builder = builder.persist_preferred_site(persist);
        }

        if let Some(path) = session.credentials_path {
            builder = builder.credentials_path(path);
        }
    }

    if let Some(obs) = config.observability {
        if let Some(name) = obs.service_name {
            builder = builder.service_name(name);
        }

        if let Some(level) = obs.log_level {
            builder = builder.log_level(level);
        }

        if let Some(json) = obs.json_logs {
            builder = builder.json_logs(json);
        }
    }

    Ok(builder)
}

/// Root configuration file structure
#[derive(Debug, Deserialize, Default)]
struct FileConfig {
    api: Option<ApiConfig>,
    cache: Option<CacheFileConfig>,
    session: Option<SessionConfig>,
    observability: Option<ObservabilityConfig>,
}

#[derive(Debug, Deserialize)]
struct ApiConfig {
    base_url: Option<String>,
    request_timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct CacheFileConfig {
    staleness_secs: Option<u64>,
    max_entries: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct SessionConfig {
    persist_preferred_site: Option<bool>,
    credentials_path: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
struct ObservabilityConfig {
    service_name: Option<String>,
    log_level: Option<String>,
    json_logs: Option<bool>,
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_parse_full_config() {
        let toml_content = r#"
[api]
base_url = "https://interactions.example.com/api"
request_timeout_secs = 15

[cache]
staleness_secs = 45
max_entries = 200

[session]
persist_preferred_site = false
credentials_path = "/tmp/interactions/credentials.json"

[observability]
service_name = "interactions-cli"
log_level = "debug"
json_logs = true
"#;
        let temp_file = create_temp_config(toml_content);
        let config = load_from_file(temp_file.path(), ConfigBuilder::new())
            .unwrap()
            .build()
            .unwrap();

        assert_eq!(
            config.base_url.as_ref().map(Url::as_str),
            Some("https://interactions.example.com/api")
        );
        assert_eq!(config.request_timeout, Duration::from_secs(15));
        assert_eq!(config.cache.staleness_window, Duration::from_secs(45));
        assert_eq!(config.cache.max_entries, 200);
        assert!(!config.persist_preferred_site);
        assert_eq!(
            config.credentials_path,
            Some(PathBuf::from("/tmp/interactions/credentials.json"))
        );
        assert_eq!(config.telemetry.service_name, "interactions-cli");
        assert_eq!(config.telemetry.log_level, "debug");
        assert!(config.telemetry.json_logs);
    }

    #[test]
    fn test_parse_minimal_config() {
        let config: FileConfig = toml::from_str(
            r#"
[api]
base_url = "http://localhost:5000/api"
"#,
        )
        .unwrap();
        assert!(config.api.is_some());
        assert!(config.cache.is_none());
        assert!(config.session.is_none());
    }

    #[test]
    fn test_load_from_file_not_found() {
        let err = load_from_file(
            Path::new("/nonexistent/path/config.toml"),
            ConfigBuilder::new(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn test_load_from_file_invalid_toml() {
        let temp_file = create_temp_config("this is not valid toml {{{{");
        let err = load_from_file(temp_file.path(), ConfigBuilder::new()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn test_load_from_file_invalid_url() {
        let temp_file = create_temp_config(
            r#"
[api]
base_url = "not a valid url"
"#,
        );
        let err = load_from_file(temp_file.path(), ConfigBuilder::new()).unwrap_err();
        assert!(err.to_string().contains("Invalid API base URL"));
    }

    #[test]
    fn test_zero_capacity_fails_on_build() {
        let temp_file = create_temp_config(
            r"
[cache]
max_entries = 0
",
        );
        let builder = load_from_file(temp_file.path(), ConfigBuilder::new()).unwrap();
        assert!(builder.build().is_err());
    }

    #[test]
    fn test_empty_config_file_uses_defaults() {
        let temp_file = create_temp_config("");
        let config = load_from_file(temp_file.path(), ConfigBuilder::new())
            .unwrap()
            .build()
            .unwrap();
        assert!(config.base_url.is_none());
        assert_eq!(config.cache.max_entries, 1000);
    }

    #[test]
    fn test_find_config_file_not_found() {
        let result = find_config_file();
        assert!(result.is_none() || result.unwrap().exists());
    }
}
