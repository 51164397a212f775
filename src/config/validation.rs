//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (intervals > 0, payload ceiling > 0)
//! - Check that TLS material is present when TLS is requested
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServerConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::ServerConfig;

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener.max_connections must be greater than 0")]
    ZeroMaxConnections,

    #[error("listener.use_tls is set but [listener.tls] is missing")]
    MissingTlsConfig,

    #[error("routing.{0} must not be empty")]
    EmptyHost(&'static str),

    #[error("routing.expected_path must start with '/', got {0:?}")]
    InvalidPath(String),

    #[error("session.{0} must be greater than 0")]
    ZeroInterval(&'static str),

    #[error("session.max_payload_bytes must be greater than 0")]
    ZeroPayloadCeiling,

    #[error("observability.metrics_address {0:?} is not a socket address")]
    InvalidMetricsAddress(String),
}

/// Check every semantic rule and report all violations at once.
pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.max_connections == 0 {
        errors.push(ValidationError::ZeroMaxConnections);
    }
    if config.listener.use_tls && config.listener.tls.is_none() {
        errors.push(ValidationError::MissingTlsConfig);
    }

    let routing = &config.routing;
    if routing.expected_host.trim().is_empty() {
        errors.push(ValidationError::EmptyHost("expected_host"));
    }
    if routing.loopback_host.trim().is_empty() {
        errors.push(ValidationError::EmptyHost("loopback_host"));
    }
    if !routing.expected_path.starts_with('/') {
        errors.push(ValidationError::InvalidPath(routing.expected_path.clone()));
    }

    let session = &config.session;
    for (name, value) in [
        ("heartbeat_interval_ms", session.heartbeat_interval_ms),
        ("push_interval_ms", session.push_interval_ms),
        ("close_timeout_ms", session.close_timeout_ms),
    ] {
        if value == 0 {
            errors.push(ValidationError::ZeroInterval(name));
        }
    }
    if session.max_payload_bytes == 0 {
        errors.push(ValidationError::ZeroPayloadCeiling);
    }

    let observability = &config.observability;
    if observability.metrics_enabled
        && observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
