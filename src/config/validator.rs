//! Configuration validator

use log::warn;

use crate::common::is_host_port;
use crate::config::error::{ConfigError, Result};
use crate::config::RelayConfig;

/// Configuration validation
pub trait ConfigValidator {
    /// Reject configurations the relay cannot run with
    fn validate(&self) -> Result<()>;

    /// Collect non-fatal issues worth logging
    fn check_warnings(&self) -> Vec<String>;
}

impl ConfigValidator for RelayConfig {
    fn validate(&self) -> Result<()> {
        validate_network_settings(self)?;
        validate_general_settings(self)?;

        for warning in self.check_warnings() {
            warn!("{}", warning);
        }

        Ok(())
    }

    fn check_warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        match self.log_level.as_str() {
            "error" | "warn" | "info" | "debug" | "trace" => {}
            level => warnings.push(format!("Invalid log level '{}', using default 'info'", level)),
        }

        if self.linger_ms > self.drain_timeout_ms {
            warnings.push(format!(
                "linger_ms ({}) exceeds drain_timeout_ms ({}); forced drains are likely",
                self.linger_ms, self.drain_timeout_ms
            ));
        }

        warnings
    }
}

fn validate_network_settings(config: &RelayConfig) -> Result<()> {
    if !is_host_port(&config.target) {
        return Err(ConfigError::InvalidValue(
            "target".to_string(),
            format!("'{}' is not in host:port form", config.target),
        ));
    }

    if config.listen.to_string() == config.target {
        return Err(ConfigError::InvalidCombination(
            "Listen and target addresses must be different".to_string(),
        ));
    }

    Ok(())
}

fn validate_general_settings(config: &RelayConfig) -> Result<()> {
    let non_zero = [
        ("buffer_size", config.buffer_size as u64),
        ("connect_timeout_ms", config.connect_timeout_ms),
        ("backoff_initial_ms", config.backoff_initial_ms),
        ("linger_ms", config.linger_ms),
        ("drain_timeout_ms", config.drain_timeout_ms),
        ("drain_poll_interval_ms", config.drain_poll_interval_ms),
    ];
    for (name, value) in non_zero {
        if value == 0 {
            return Err(ConfigError::InvalidValue(
                name.to_string(),
                "must be greater than 0".to_string(),
            ));
        }
    }

    if config.backoff_initial_ms > config.backoff_max_ms {
        return Err(ConfigError::InvalidCombination(format!(
            "backoff_initial_ms ({}) must not exceed backoff_max_ms ({})",
            config.backoff_initial_ms, config.backoff_max_ms
        )));
    }

    Ok(())
}
