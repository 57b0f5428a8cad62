//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound request (any method, any path)
//!     → server.rs (Axum router, request ID, trace layer)
//!     → load_balancer::HealthyView::select_next
//!     → forward.rs (rewrite target, deadline, single attempt)
//!     → transport.rs (hyper for http, reqwest for https)
//!     → response.rs (relay head, trace header, stream body)
//!     → Send to client
//!
//! Any failure before the head is relayed → response.rs 503
//! ```

pub mod forward;
pub mod response;
pub mod server;
pub mod transport;

pub use forward::{ForwardConfig, ForwardError, Forwarder};
pub use response::{service_unavailable, TRACE_HEADER};
pub use server::{AppState, BalancerServer};
pub use transport::{HttpTransport, HyperTransport, ReqwestTransport, TransportError};
