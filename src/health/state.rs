//! Probe results.
//!
//! A probe ends in exactly one of two states. The failure reason is kept only
//! long enough to be logged; the healthy view sees a plain boolean.

use axum::http::StatusCode;
use std::time::Duration;
use thiserror::Error;

use crate::load_balancer::BackendAddress;

/// Why a probe judged a backend unhealthy.
#[derive(Debug, Error)]
pub enum ProbeFailure {
    #[error("failed to build health check request: {0}")]
    InvalidRequest(String),

    #[error("connection error: {0}")]
    Transport(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("unexpected status {0}")]
    Status(StatusCode),
}

/// Result of a single probe against one backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeOutcome {
    pub backend: BackendAddress,
    pub healthy: bool,
}

impl ProbeOutcome {
    pub fn healthy(backend: BackendAddress) -> Self {
        Self { backend, healthy: true }
    }

    pub fn unhealthy(backend: BackendAddress) -> Self {
        Self { backend, healthy: false }
    }
}
