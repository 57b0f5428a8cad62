//! Single-shot health probe.
//!
//! # Responsibilities
//! - GET `<scheme>://<backend><path>` once, bounded by a timeout
//! - Only HTTP 200 counts as healthy
//! - Never touch shared state

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use tokio::time;

use crate::config::UpstreamScheme;
use crate::health::state::{ProbeFailure, ProbeOutcome};
use crate::http::transport::HttpTransport;
use crate::load_balancer::BackendAddress;

const USER_AGENT: &str = "lb-proxy-health-check";

/// Probe settings shared by every backend.
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    pub scheme: UpstreamScheme,
    pub path: String,
    pub timeout: Duration,
}

/// Performs liveness checks through the injected transport.
#[derive(Clone)]
pub struct HealthProber {
    transport: Arc<dyn HttpTransport>,
    config: ProbeConfig,
}

impl HealthProber {
    pub fn new(transport: Arc<dyn HttpTransport>, config: ProbeConfig) -> Self {
        Self { transport, config }
    }

    /// Probe `backend` once.
    pub async fn probe(&self, backend: &BackendAddress) -> ProbeOutcome {
        match self.check(backend).await {
            Ok(()) => {
                tracing::info!(backend = %backend, "Health check passed");
                ProbeOutcome::healthy(backend.clone())
            }
            Err(failure) => {
                tracing::warn!(backend = %backend, reason = %failure, "Health check failed");
                ProbeOutcome::unhealthy(backend.clone())
            }
        }
    }

    async fn check(&self, backend: &BackendAddress) -> Result<(), ProbeFailure> {
        let uri = format!("{}://{}{}", self.config.scheme.as_str(), backend, self.config.path);
        let request = Request::get(uri)
            .header(header::USER_AGENT, USER_AGENT)
            .body(Body::empty())
            .map_err(|e| ProbeFailure::InvalidRequest(e.to_string()))?;

        // The response (and its connection) is dropped on every path out of here.
        let response = match time::timeout(self.config.timeout, self.transport.send(request)).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => return Err(ProbeFailure::Transport(e.to_string())),
            Err(_) => return Err(ProbeFailure::Timeout(self.config.timeout)),
        };

        if response.status() != StatusCode::OK {
            return Err(ProbeFailure::Status(response.status()));
        }
        Ok(())
    }
}
