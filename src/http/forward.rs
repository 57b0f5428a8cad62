//! Request forwarding.
//!
//! # Responsibilities
//! - Rewrite the inbound request onto the selected backend
//! - Issue it through the transport under the request deadline
//! - Relay the response head and stream the body back
//!
//! # Design Decisions
//! - Exactly one attempt per inbound request; no retry, no failover
//! - The deadline covers both the response head and the body relay
//! - Dropping the inbound request future cancels the outbound call

use axum::body::Body;
use axum::http::{header, uri::Authority, HeaderValue, Request, Response, Uri};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::{self, Instant};

use crate::config::UpstreamScheme;
use crate::http::response::{relay_body, relay_head};
use crate::http::transport::{HttpTransport, TransportError};
use crate::load_balancer::BackendAddress;

/// Errors raised while forwarding a request to a backend.
#[derive(Debug, Error)]
pub enum ForwardError {
    /// The backend could not be reached or returned no response.
    #[error("failed to forward request to {backend}: {source}")]
    Transport {
        backend: BackendAddress,
        #[source]
        source: TransportError,
    },

    /// The backend did not answer within the request timeout.
    #[error("request to {backend} timed out after {timeout:?}")]
    Timeout {
        backend: BackendAddress,
        timeout: Duration,
    },

    /// The backend address cannot be used as a request target.
    #[error("invalid upstream target {backend}: {reason}")]
    InvalidTarget {
        backend: BackendAddress,
        reason: String,
    },
}

/// Settings shared by every forwarded request.
#[derive(Debug, Clone)]
pub struct ForwardConfig {
    pub scheme: UpstreamScheme,
    pub timeout: Duration,
    pub trace: bool,
}

/// Proxies inbound requests to a chosen backend.
#[derive(Clone)]
pub struct Forwarder {
    transport: Arc<dyn HttpTransport>,
    config: ForwardConfig,
}

impl Forwarder {
    pub fn new(transport: Arc<dyn HttpTransport>, config: ForwardConfig) -> Self {
        Self { transport, config }
    }

    pub fn config(&self) -> &ForwardConfig {
        &self.config
    }

    /// Forward `request` to `backend` and return the response to relay.
    pub async fn forward(
        &self,
        backend: &BackendAddress,
        request: Request<Body>,
    ) -> Result<Response<Body>, ForwardError> {
        let deadline = Instant::now() + self.config.timeout;
        let outbound = self.rewrite(backend, request)?;

        let upstream = match time::timeout_at(deadline, self.transport.send(outbound)).await {
            Ok(Ok(response)) => response,
            Ok(Err(source)) => {
                return Err(ForwardError::Transport {
                    backend: backend.clone(),
                    source,
                })
            }
            Err(_) => {
                return Err(ForwardError::Timeout {
                    backend: backend.clone(),
                    timeout: self.config.timeout,
                })
            }
        };

        let (head, ()) = relay_head(&upstream, backend, self.config.trace).into_parts();
        let body = relay_body(upstream.into_body(), deadline, backend.clone());
        Ok(Response::from_parts(head, body))
    }

    /// Point a copy of the inbound request at `backend`.
    fn rewrite(
        &self,
        backend: &BackendAddress,
        request: Request<Body>,
    ) -> Result<Request<Body>, ForwardError> {
        let invalid = |reason: String| ForwardError::InvalidTarget {
            backend: backend.clone(),
            reason,
        };

        let (parts, body) = request.into_parts();

        let authority = Authority::try_from(backend.as_str()).map_err(|e| invalid(e.to_string()))?;
        let path_and_query = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");
        let uri = Uri::builder()
            .scheme(self.config.scheme.as_str())
            .authority(authority)
            .path_and_query(path_and_query)
            .build()
            .map_err(|e| invalid(e.to_string()))?;

        let mut outbound = Request::builder()
            .method(parts.method)
            .uri(uri)
            .body(body)
            .map_err(|e| invalid(e.to_string()))?;

        let headers = outbound.headers_mut();
        for (name, value) in parts.headers.iter() {
            headers.append(name.clone(), value.clone());
        }
        let host = HeaderValue::from_str(backend.as_str()).map_err(|e| invalid(e.to_string()))?;
        headers.insert(header::HOST, host);

        Ok(outbound)
    }
}
