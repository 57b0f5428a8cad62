//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router; every method and path goes to the proxy handler
//! - Wire up middleware (tracing, request ID)
//! - Seed the healthy view and start the probe loops before serving
//! - Select a backend and forward each request to it

use axum::{
    body::Body,
    extract::State,
    http::Request,
    response::Response,
    Router,
};
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::BalancerConfig;
use crate::health::{HealthMonitor, HealthProber, ProbeConfig};
use crate::http::forward::{ForwardConfig, Forwarder};
use crate::http::response::service_unavailable;
use crate::http::transport::{self, HttpTransport, TransportError};
use crate::lifecycle::Shutdown;
use crate::load_balancer::{BackendPool, HealthyView};
use crate::observability::metrics;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub view: Arc<HealthyView>,
    pub forwarder: Forwarder,
}

/// Frontend of the load balancer.
pub struct BalancerServer {
    router: Router,
    monitor: Arc<HealthMonitor>,
}

impl BalancerServer {
    /// Create a server using the transport matching the configured scheme.
    pub fn new(config: &BalancerConfig) -> Result<Self, TransportError> {
        let transport = transport::for_scheme(config.upstream.scheme())?;
        Ok(Self::with_transport(config, transport))
    }

    /// Create a server on an explicit transport.
    pub fn with_transport(config: &BalancerConfig, transport: Arc<dyn HttpTransport>) -> Self {
        let pool = BackendPool::new(&config.backends.0);
        let view = Arc::new(HealthyView::new());

        let prober = HealthProber::new(
            transport.clone(),
            ProbeConfig {
                scheme: config.upstream.scheme(),
                path: config.health_check.path.clone(),
                timeout: config.timeouts.request(),
            },
        );
        let monitor = Arc::new(HealthMonitor::new(
            pool,
            view.clone(),
            prober,
            config.health_check.interval(),
        ));

        let forwarder = Forwarder::new(
            transport,
            ForwardConfig {
                scheme: config.upstream.scheme(),
                timeout: config.timeouts.request(),
                trace: config.upstream.trace,
            },
        );

        let router = Self::build_router(AppState { view, forwarder });
        Self { router, monitor }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        Router::new()
            .fallback(proxy_handler)
            .with_state(state)
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn monitor(&self) -> &Arc<HealthMonitor> {
        &self.monitor
    }

    /// Seed health, start probing, and serve until `shutdown` fires.
    pub async fn run(self, listener: TcpListener, shutdown: Shutdown) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        let mut server_shutdown = shutdown.subscribe();

        tokio::select! {
            _ = self.monitor.initial_pass() => {}
            _ = server_shutdown.recv() => {
                tracing::info!("Shutdown requested during initial health check pass");
                return Ok(());
            }
        }
        let probes = self.monitor.clone().start(shutdown.sender());

        tracing::info!(address = %addr, "Load balancer listening");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = server_shutdown.recv().await;
            })
            .await?;

        probes.stop().await;
        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Main proxy handler: pick the next healthy backend and forward to it.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let backend = match state.view.select_next() {
        Ok(backend) => backend,
        Err(e) => {
            tracing::error!(method = %method, path = %path, error = %e, "No healthy backends available");
            metrics::record_request(method.as_str(), 503, "none", start);
            return service_unavailable();
        }
    };

    match state.forwarder.forward(&backend, request).await {
        Ok(response) => {
            tracing::info!(
                method = %method,
                path = %path,
                backend = %backend,
                status = %response.status(),
                "Forwarded request"
            );
            metrics::record_request(method.as_str(), response.status().as_u16(), backend.as_str(), start);
            response
        }
        Err(e) => {
            tracing::error!(method = %method, path = %path, error = %e, "Failed to forward request");
            metrics::record_request(method.as_str(), 503, backend.as_str(), start);
            service_unavailable()
        }
    }
}
