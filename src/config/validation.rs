//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Require the agent's boot and configuration files
//! - Validate addresses and value ranges
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: FilterConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::FilterConfig;

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("agent.boot_file must be set")]
    MissingBootFile,

    #[error("agent.conf_file must be set")]
    MissingConfFile,

    #[error("{field} is not a valid socket address: {value}")]
    InvalidAddress { field: &'static str, value: String },

    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("listener.tls.{field} must not be empty")]
    EmptyTlsPath { field: &'static str },
}

/// Check `config` and report every problem found.
pub fn validate_config(config: &FilterConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.agent.boot_file.as_os_str().is_empty() {
        errors.push(ValidationError::MissingBootFile);
    }
    if config.agent.conf_file.as_os_str().is_empty() {
        errors.push(ValidationError::MissingConfFile);
    }

    check_address(&mut errors, "listener.bind_address", &config.listener.bind_address);
    if let Some(address) = &config.upstream.address {
        check_address(&mut errors, "upstream.address", address);
    }
    if config.observability.metrics_enabled {
        check_address(&mut errors, "observability.metrics_address", &config.observability.metrics_address);
    }

    if let Some(tls) = &config.listener.tls {
        if tls.cert_path.is_empty() {
            errors.push(ValidationError::EmptyTlsPath { field: "cert_path" });
        }
        if tls.key_path.is_empty() {
            errors.push(ValidationError::EmptyTlsPath { field: "key_path" });
        }
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::Zero { field: "timeouts.request_secs" });
    }
    if config.filter.arena_bytes == 0 {
        errors.push(ValidationError::Zero { field: "filter.arena_bytes" });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_address(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field,
            value: value.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> FilterConfig {
        let mut config = FilterConfig::default();
        config.agent.boot_file = "/etc/am/boot.toml".into();
        config.agent.conf_file = "/etc/am/agent.toml".into();
        config
    }

    #[test]
    fn test_valid_config() {
        assert_eq!(validate_config(&valid()), Ok(()));
    }

    #[test]
    fn test_default_config_lacks_agent_files() {
        let errors = validate_config(&FilterConfig::default()).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::MissingBootFile, ValidationError::MissingConfFile]
        );
    }

    #[test]
    fn test_reports_all_errors() {
        let mut config = valid();
        config.listener.bind_address = "not-an-address".into();
        config.upstream.address = Some("localhost".into());
        config.timeouts.request_secs = 0;
        config.filter.arena_bytes = 0;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(errors.contains(&ValidationError::Zero { field: "filter.arena_bytes" }));
    }

    #[test]
    fn test_metrics_address_checked_only_when_enabled() {
        let mut config = valid();
        config.observability.metrics_address = "bogus".into();
        assert!(validate_config(&config).is_ok());

        config.observability.metrics_enabled = true;
        assert!(validate_config(&config).is_err());
    }
}
