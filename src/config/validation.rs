//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Require at least one allowed domain or alias
//! - Validate value ranges and enumerations
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AppConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::AppConfig;
use crate::render::ImageFormat;

/// A single semantic problem found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Neither `upstream.domains` nor `upstream.domain_map` has entries.
    #[error("config must have non-empty upstream.domains and/or upstream.domain_map")]
    NoDomains,

    /// A domain entry is empty or contains characters outside `[-a-z0-9.]`.
    #[error("invalid domain '{0}'")]
    InvalidDomain(String),

    /// Protocol other than http or https.
    #[error("unsupported default_protocol '{0}' (expected http or https)")]
    InvalidProtocol(String),

    /// API path does not start with '/'.
    #[error("api_path '{0}' must start with '/'")]
    InvalidApiPath(String),

    /// Continuation budget of zero.
    #[error("max_continuations must be greater than zero")]
    ZeroContinuations,

    /// Unknown entry in `pipeline.formats`.
    #[error("unknown output format '{0}'")]
    UnknownFormat(String),

    /// No servable formats.
    #[error("pipeline.formats must not be empty")]
    NoFormats,

    /// Renderer command with no program.
    #[error("renderer.{0} must not be empty")]
    EmptyCommand(&'static str),

    /// Address that does not parse as `ip:port`.
    #[error("{field} '{value}' is not a valid socket address")]
    InvalidAddress { field: &'static str, value: String },
}

/// Check the configuration, collecting every violation.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let upstream = &config.upstream;

    if upstream.domains.is_empty() && upstream.domain_map.is_empty() {
        errors.push(ValidationError::NoDomains);
    }

    let all_domains = upstream
        .domains
        .iter()
        .chain(upstream.domain_map.keys())
        .chain(upstream.domain_map.values());
    for domain in all_domains {
        if !is_valid_domain(domain) {
            errors.push(ValidationError::InvalidDomain(domain.clone()));
        }
    }

    if upstream.default_protocol != "http" && upstream.default_protocol != "https" {
        errors.push(ValidationError::InvalidProtocol(upstream.default_protocol.clone()));
    }

    if !upstream.api_path.starts_with('/') {
        errors.push(ValidationError::InvalidApiPath(upstream.api_path.clone()));
    }

    if upstream.max_continuations == 0 {
        errors.push(ValidationError::ZeroContinuations);
    }

    if config.pipeline.formats.is_empty() {
        errors.push(ValidationError::NoFormats);
    }
    for format in &config.pipeline.formats {
        if format.parse::<ImageFormat>().is_err() {
            errors.push(ValidationError::UnknownFormat(format.clone()));
        }
    }

    if config.renderer.png_command.is_empty() {
        errors.push(ValidationError::EmptyCommand("png_command"));
    }
    if config.renderer.svg_command.is_empty() {
        errors.push(ValidationError::EmptyCommand("svg_command"));
    }

    check_address(&mut errors, "listener.bind_address", &config.listener.bind_address);
    if config.observability.metrics_enabled {
        check_address(
            &mut errors,
            "observability.metrics_address",
            &config.observability.metrics_address,
        );
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

// Alias targets may carry a port (e.g. a local mirror on "localhost:8080").
fn is_valid_domain(domain: &str) -> bool {
    !domain.is_empty()
        && domain
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '-' | '.' | ':'))
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

    fn valid_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.upstream.domains = vec!["wikipedia.org".to_string()];
        config
    }

    #[test]
    fn test_valid_config_passes() {
        assert_eq!(validate_config(&valid_config()), Ok(()));
    }

    #[test]
    fn test_alias_map_alone_is_enough() {
        let mut config = AppConfig::default();
        config
            .upstream
            .domain_map
            .insert("old.org".to_string(), "new.org".to_string());
        assert_eq!(validate_config(&config), Ok(()));
    }

    #[test]
    fn test_refuses_without_domains() {
        let errors = validate_config(&AppConfig::default()).unwrap_err();
        assert!(errors.contains(&ValidationError::NoDomains));
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = valid_config();
        config.upstream.default_protocol = "ftp".to_string();
        config.upstream.max_continuations = 0;
        config.pipeline.formats = vec!["gif".to_string()];
        config.upstream.domains.push("Bad Domain".to_string());

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(errors.contains(&ValidationError::InvalidProtocol("ftp".into())));
        assert!(errors.contains(&ValidationError::ZeroContinuations));
        assert!(errors.contains(&ValidationError::UnknownFormat("gif".into())));
        assert!(errors.contains(&ValidationError::InvalidDomain("Bad Domain".into())));
    }

    #[test]
    fn test_all_is_not_a_served_format() {
        let mut config = valid_config();
        config.pipeline.formats = vec!["png".to_string(), "all".to_string()];
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors, vec![ValidationError::UnknownFormat("all".into())]);
    }

    #[test]
    fn test_metrics_address_checked_only_when_enabled() {
        let mut config = valid_config();
        config.observability.metrics_address = "nope".to_string();
        assert_eq!(validate_config(&config), Ok(()));

        config.observability.metrics_enabled = true;
        let errors = validate_config(&config).unwrap_err();
        assert!(matches!(errors[0], ValidationError::InvalidAddress { field: "observability.metrics_address", .. }));
    }
}
