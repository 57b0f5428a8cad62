//! Outbound HTTP transport.
//!
//! # Responsibilities
//! - Abstract "send one request, get one response" behind a trait
//! - Plain HTTP through the hyper client, HTTPS through reqwest
//!
//! # Design Decisions
//! - Deadlines are applied by callers, not by the transport
//! - Response bodies stay streaming; nothing is buffered here

use async_trait::async_trait;
use axum::body::{Body, HttpBody};
use axum::http::{Request, Response};
use hyper::body::Incoming;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use std::sync::Arc;
use thiserror::Error;

use crate::config::UpstreamScheme;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors raised while exchanging a request with a backend.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection failed or the backend returned no response.
    #[error("upstream request failed: {0}")]
    Upstream(#[source] BoxError),

    /// The outbound request could not be built.
    #[error("invalid outbound request: {0}")]
    InvalidRequest(String),
}

impl TransportError {
    pub fn upstream(err: impl Into<BoxError>) -> Self {
        TransportError::Upstream(err.into())
    }
}

/// Sends a single request to a backend.
#[async_trait]
pub trait HttpTransport: Send + Sync + 'static {
    async fn send(&self, request: Request<Body>) -> Result<Response<Body>, TransportError>;
}

/// Plain HTTP transport on the hyper connection-pooling client.
#[derive(Clone)]
pub struct HyperTransport {
    client: Client<HttpConnector, Body>,
}

impl HyperTransport {
    pub fn new() -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        Self { client }
    }
}

impl Default for HyperTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpTransport for HyperTransport {
    async fn send(&self, request: Request<Body>) -> Result<Response<Body>, TransportError> {
        let response: Response<Incoming> = self
            .client
            .request(request)
            .await
            .map_err(TransportError::upstream)?;
        Ok(response.map(Body::new))
    }
}

/// HTTPS-capable transport on reqwest.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .no_proxy()
            .build()
            .map_err(TransportError::upstream)?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: Request<Body>) -> Result<Response<Body>, TransportError> {
        let request = request.map(|body| {
            // An empty inbound body must not turn into a chunked upload.
            if body.size_hint().exact() == Some(0) {
                reqwest::Body::from(Vec::<u8>::new())
            } else {
                reqwest::Body::wrap_stream(body.into_data_stream())
            }
        });
        let request = reqwest::Request::try_from(request)
            .map_err(|e| TransportError::InvalidRequest(e.to_string()))?;

        let response = self
            .client
            .execute(request)
            .await
            .map_err(TransportError::upstream)?;
        let response: Response<reqwest::Body> = response.into();
        Ok(response.map(Body::new))
    }
}

/// Build the transport matching the configured backend scheme.
pub fn for_scheme(scheme: UpstreamScheme) -> Result<Arc<dyn HttpTransport>, TransportError> {
    Ok(match scheme {
        UpstreamScheme::Http => Arc::new(HyperTransport::new()),
        UpstreamScheme::Https => Arc::new(ReqwestTransport::new()?),
    })
}
