//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Backend addresses must be bare `host:port` authorities
//! - Timeouts and intervals must be non-zero
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: BalancerConfig → Result<(), Vec<ValidationError>>

use std::collections::HashSet;

use thiserror::Error;
use url::Url;

use crate::config::schema::BalancerConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("at least one backend must be configured")]
    NoBackends,

    #[error("backend `{0}` is listed more than once")]
    DuplicateBackend(String),

    #[error("backend `{0}` is not a valid host:port address")]
    InvalidBackend(String),

    #[error("timeouts.request_secs must be greater than zero")]
    ZeroTimeout,

    #[error("health_check.interval_secs must be greater than zero")]
    ZeroInterval,

    #[error("health_check.path `{0}` must start with '/'")]
    InvalidHealthPath(String),
}

/// Check the configuration, collecting every problem found.
pub fn validate_config(config: &BalancerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.backends.0.is_empty() {
        errors.push(ValidationError::NoBackends);
    }

    let mut seen = HashSet::new();
    for backend in &config.backends.0 {
        if !is_host_port(backend) {
            errors.push(ValidationError::InvalidBackend(backend.clone()));
        } else if !seen.insert(backend.as_str()) {
            errors.push(ValidationError::DuplicateBackend(backend.clone()));
        }
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroTimeout);
    }
    if config.health_check.interval_secs == 0 {
        errors.push(ValidationError::ZeroInterval);
    }
    if !config.health_check.path.starts_with('/') {
        errors.push(ValidationError::InvalidHealthPath(config.health_check.path.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn is_host_port(addr: &str) -> bool {
    if addr.is_empty() || addr.contains("://") || addr.contains('/') {
        return false;
    }
    // `Url` drops default ports, so the port is checked on the raw text.
    let has_port = addr
        .rsplit_once(':')
        .is_some_and(|(_, port)| port.parse::<u16>().is_ok());
    if !has_port {
        return false;
    }
    match Url::parse(&format!("http://{}", addr)) {
        Ok(url) => {
            url.host_str().is_some()
                && url.username().is_empty()
                && url.query().is_none()
                && url.fragment().is_none()
        }
        Err(_) => false,
    }
}
