//! Configuration loader with file and environment variable support

use crate::{AppConfig, ConfigError};
use std::env;
use std::path::PathBuf;
use tracing::{info, warn};

/// Standard config file search paths
const CONFIG_PATHS: &[&str] = &[
    "config.toml",
    "fintrack.toml",
    "./config/config.toml",
    "/etc/fintrack/config.toml",
];

/// Configuration loader
pub struct ConfigLoader {
    config_path: Option<PathBuf>,
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new() -> Self {
        Self { config_path: None }
    }

    /// Create a loader with a specific config file path
    pub fn with_path<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            config_path: Some(path.into()),
        }
    }

    /// Load configuration from file (if found) with environment variable overrides
    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        self.load_with(|key| env::var(key).ok())
    }

    /// Same as [`load`](Self::load) but reads overrides through `lookup`.
    pub fn load_with<F>(&self, lookup: F) -> Result<AppConfig, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match self.find_config_file(&lookup) {
            Some(path) => {
                info!(?path, "Loading configuration from file");
                AppConfig::from_file(&path)?
            }
            None => AppConfig::default(),
        };

        apply_overrides(&mut config, &lookup);
        Ok(config)
    }

    fn find_config_file<F>(&self, lookup: &F) -> Option<PathBuf>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = &self.config_path {
            if path.exists() {
                return Some(path.clone());
            }
            warn!(?path, "Configured file does not exist, searching defaults");
        }

        if let Some(path) = lookup("FINTRACK_CONFIG").map(PathBuf::from) {
            if path.exists() {
                return Some(path);
            }
        }

        CONFIG_PATHS
            .iter()
            .map(PathBuf::from)
            .find(|path| path.exists())
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_into<T: std::str::FromStr>(value: Option<String>, target: &mut T) {
    if let Some(parsed) = value.and_then(|v| v.trim().parse().ok()) {
        *target = parsed;
    }
}

fn apply_overrides<F>(config: &mut AppConfig, lookup: &F)
where
    F: Fn(&str) -> Option<String>,
{
    // HTTP
    if let Some(val) = lookup("FINTRACK_HTTP_HOST") {
        config.http.host = val;
    }
    parse_into(lookup("FINTRACK_HTTP_PORT"), &mut config.http.port);
    parse_into(
        lookup("FINTRACK_REQUEST_TIMEOUT_SECS"),
        &mut config.http.request_timeout_secs,
    );

    // Database
    if let Some(val) = lookup("FINTRACK_DB_SOURCE") {
        config.database.source = val;
    }
    parse_into(
        lookup("FINTRACK_DB_MAX_CONNECTIONS"),
        &mut config.database.max_connections,
    );

    // Auth
    if let Some(val) = lookup("FINTRACK_TOKEN_SYMMETRIC_KEY") {
        config.auth.token_symmetric_key = val;
    }
    parse_into(
        lookup("FINTRACK_ACCESS_TOKEN_TTL_SECS"),
        &mut config.auth.access_token_ttl_secs,
    );

    // General
    parse_into(lookup("FINTRACK_DEV_MODE"), &mut config.dev_mode);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_file_then_env_override() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[http]\nport = 7000\n\n[auth]\naccess_token_ttl_secs = 60").unwrap();

        let loader = ConfigLoader::with_path(file.path());
        let config = loader
            .load_with(lookup_from(&[
                ("FINTRACK_HTTP_PORT", "7100"),
                ("FINTRACK_DB_SOURCE", "postgres://db/fintrack"),
            ]))
            .unwrap();

        assert_eq!(config.http.port, 7100);
        assert_eq!(config.auth.access_token_ttl_secs, 60);
        assert_eq!(config.database.source, "postgres://db/fintrack");
    }

    #[test]
    fn test_unparsable_override_is_ignored() {
        let loader = ConfigLoader::with_path("/nonexistent/fintrack.toml");
        let config = loader
            .load_with(lookup_from(&[
                ("FINTRACK_HTTP_PORT", "not-a-port"),
                ("FINTRACK_DEV_MODE", "true"),
            ]))
            .unwrap();

        assert_eq!(config.http.port, 5315);
        assert!(config.dev_mode);
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[http\nport = ").unwrap();

        let result = ConfigLoader::with_path(file.path()).load_with(|_| None);
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }
}
