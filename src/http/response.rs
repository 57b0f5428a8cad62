//! Response handling and transformation.
//!
//! # Responsibilities
//! - Relay the backend response head verbatim
//! - Add the trace header when trace mode is on
//! - Stream the backend body under the forward deadline
//! - Produce the plain-text 503 returned on any balancer failure
//!
//! # Design Decisions
//! - Streaming responses avoid buffering entire body
//! - A failure after the head is sent only ends the body early
//! - The 503 response carries no upstream headers

use axum::body::Body;
use axum::http::{header, HeaderName, HeaderValue, Response, StatusCode};
use axum::response::IntoResponse;
use futures_util::{stream, StreamExt};
use std::convert::Infallible;
use tokio::time::{self, Instant};

use crate::load_balancer::BackendAddress;

/// Header naming the backend that served a response (trace mode only).
pub const TRACE_HEADER: HeaderName = HeaderName::from_static("lb-from");

/// Body of every 503 produced by the balancer itself.
pub const UNAVAILABLE_BODY: &str = "Service Unavailable";

/// Plain-text 503 returned when no backend can serve the request.
pub fn service_unavailable() -> Response<Body> {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        UNAVAILABLE_BODY,
    )
        .into_response()
}

/// Copy an upstream response head onto a fresh response for the client.
pub fn relay_head(
    upstream: &Response<Body>,
    backend: &BackendAddress,
    trace: bool,
) -> Response<()> {
    let mut response = Response::new(());
    *response.status_mut() = upstream.status();

    let headers = response.headers_mut();
    for (name, value) in upstream.headers() {
        headers.append(name.clone(), value.clone());
    }
    if trace {
        match HeaderValue::from_str(backend.as_str()) {
            Ok(value) => {
                headers.insert(TRACE_HEADER, value);
            }
            Err(e) => {
                tracing::warn!(backend = %backend, error = %e, "Backend address is not a valid header value");
            }
        }
    }
    response
}

/// Stream `body` to the client until it ends, fails, or `deadline` passes.
///
/// Failures are logged and terminate the transfer; the status is already sent.
pub fn relay_body(body: Body, deadline: Instant, backend: BackendAddress) -> Body {
    let chunks = stream::unfold(
        (body.into_data_stream(), backend),
        move |(mut upstream, backend)| async move {
            match time::timeout_at(deadline, upstream.next()).await {
                Ok(Some(Ok(chunk))) => Some((Ok::<_, Infallible>(chunk), (upstream, backend))),
                Ok(Some(Err(e))) => {
                    tracing::warn!(backend = %backend, error = %e, "Failed to copy response body");
                    None
                }
                Ok(None) => None,
                Err(_) => {
                    tracing::warn!(backend = %backend, "Response body copy exceeded request timeout");
                    None
                }
            }
        },
    );
    Body::from_stream(chunks)
}
