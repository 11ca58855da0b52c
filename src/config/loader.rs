//! Configuration loading functionality
//!
//! Loads configuration from a JSON file and from `TCP_RELAY_*` environment
//! variables, and combines them with the defaults.

use log::{debug, info, warn};
use std::env;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use crate::config::defaults::{self, ENV_PREFIX};
use crate::config::error::{ConfigError, Result};
use crate::config::merger::ConfigMerger;
use crate::config::RelayConfig;
use crate::common::parse_socket_addr;

/// Trait for loading configuration from different sources
pub trait ConfigLoader {
    /// Load configuration from a JSON file
    fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> where Self: Sized;

    /// Load configuration from `TCP_RELAY_*` environment variables
    fn from_env() -> Result<Self> where Self: Sized;

    /// Load defaults, then the file (explicit path, or `config.json` when it
    /// exists), then environment variables
    fn auto_load(config_file: Option<&Path>) -> Result<Self> where Self: Sized;
}

impl ConfigLoader for RelayConfig {
    fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)
            .map_err(|e| ConfigError::FileReadError(path.to_path_buf(), e.to_string()))?;

        serde_json::from_str(&content).map_err(|e| {
            ConfigError::ParseError(format!("{}: {}", path.display(), e))
        })
    }

    fn from_env() -> Result<Self> {
        let get_env = |name: &str| -> Option<String> {
            env::var(format!("{}{}", ENV_PREFIX, name)).ok()
        };

        let mut config = Self::default();

        if let Some(value) = get_env("LISTEN") {
            config.listen = parse_socket_addr(&value)
                .map_err(|e| ConfigError::InvalidValue("LISTEN".to_string(), e.to_string()))?;
        }
        if let Some(value) = get_env("TARGET") {
            config.target = value;
        }
        if let Some(value) = get_env("LOG_LEVEL") {
            config.log_level = value;
        }

        parse_env_number(&get_env, "BUFFER_SIZE", &mut config.buffer_size)?;
        parse_env_number(&get_env, "MAX_IDLE_BUFFERS", &mut config.max_idle_buffers)?;
        parse_env_number(&get_env, "CONNECT_TIMEOUT_MS", &mut config.connect_timeout_ms)?;
        parse_env_number(&get_env, "BACKOFF_INITIAL_MS", &mut config.backoff_initial_ms)?;
        parse_env_number(&get_env, "BACKOFF_MAX_MS", &mut config.backoff_max_ms)?;
        parse_env_number(&get_env, "LINGER_MS", &mut config.linger_ms)?;
        parse_env_number(&get_env, "DRAIN_TIMEOUT_MS", &mut config.drain_timeout_ms)?;
        parse_env_number(&get_env, "DRAIN_POLL_INTERVAL_MS", &mut config.drain_poll_interval_ms)?;

        Ok(config)
    }

    fn auto_load(config_file: Option<&Path>) -> Result<Self> {
        let mut config = Self::default();
        debug!("Starting with default configuration");

        match config_file {
            Some(path) => {
                info!("Loading configuration from {}", path.display());
                config = config.merge(Self::from_file(path)?);
            }
            None if Path::new(defaults::DEFAULT_CONFIG_FILE).exists() => {
                info!("Loading configuration from {}", defaults::DEFAULT_CONFIG_FILE);
                match Self::from_file(defaults::DEFAULT_CONFIG_FILE) {
                    Ok(file_config) => config = config.merge(file_config),
                    Err(e) => warn!("Ignoring {}: {}", defaults::DEFAULT_CONFIG_FILE, e),
                }
            }
            None => debug!("No configuration file found"),
        }

        let env_config = Self::from_env()?;
        if env_config != Self::default() {
            info!("Applying configuration from environment variables");
            config = config.merge(env_config);
        }

        Ok(config)
    }
}

/// Parse a numeric environment variable into `field` when it is set
fn parse_env_number<T>(
    get_env: &impl Fn(&str) -> Option<String>,
    name: &str,
    field: &mut T,
) -> Result<()>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    if let Some(value) = get_env(name) {
        *field = value.trim().parse::<T>().map_err(|e| {
            ConfigError::InvalidValue(format!("{}{}", ENV_PREFIX, name), format!("{}: {}", value, e))
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;

    fn clear_env() {
        for name in [
            "LISTEN", "TARGET", "LOG_LEVEL", "BUFFER_SIZE", "MAX_IDLE_BUFFERS",
            "CONNECT_TIMEOUT_MS", "BACKOFF_INITIAL_MS", "BACKOFF_MAX_MS",
            "LINGER_MS", "DRAIN_TIMEOUT_MS", "DRAIN_POLL_INTERVAL_MS",
        ] {
            env::remove_var(format!("{}{}", ENV_PREFIX, name));
        }
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "listen": "127.0.0.1:7000", "target": "db:1521", "backoff_max_ms": 8000 }}"#).unwrap();

        let config = RelayConfig::from_file(file.path()).unwrap();
        assert_eq!(config.listen.to_string(), "127.0.0.1:7000");
        assert_eq!(config.target, "db:1521");
        assert_eq!(config.backoff_max_ms, 8000);
    }

    #[test]
    fn test_from_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = RelayConfig::from_file(dir.path().join("missing.json"));
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_from_malformed_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();

        let result = RelayConfig::from_file(file.path());
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    #[serial]
    fn test_from_env() {
        clear_env();
        env::set_var("TCP_RELAY_TARGET", "backend:6000");
        env::set_var("TCP_RELAY_LINGER_MS", "1500");

        let config = RelayConfig::from_env().unwrap();
        assert_eq!(config.target, "backend:6000");
        assert_eq!(config.linger_ms, 1500);
        assert_eq!(config.buffer_size, defaults::buffer_size());

        clear_env();
    }

    #[test]
    #[serial]
    fn test_from_env_rejects_garbage_number() {
        clear_env();
        env::set_var("TCP_RELAY_BUFFER_SIZE", "lots");

        let result = RelayConfig::from_env();
        assert!(matches!(result, Err(ConfigError::InvalidValue(_, _))));

        clear_env();
    }

    #[test]
    #[serial]
    fn test_env_overrides_file() {
        clear_env();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "target": "file-host:1521", "linger_ms": 900 }}"#).unwrap();
        env::set_var("TCP_RELAY_TARGET", "env-host:1521");

        let config = RelayConfig::auto_load(Some(file.path())).unwrap();
        assert_eq!(config.target, "env-host:1521");
        assert_eq!(config.linger_ms, 900);

        clear_env();
    }
}
