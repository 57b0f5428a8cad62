//! Shared utilities for integration testing.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::get,
    Router,
};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU16, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

use lb_proxy::config::BackendsConfig;
use lb_proxy::{BalancerConfig, BalancerServer, Shutdown};

/// Controls and counters for one mock backend.
#[derive(Debug)]
pub struct MockBackend {
    pub addr: SocketAddr,
    pub health_status: AtomicU16,
    pub hits: AtomicUsize,
}

impl MockBackend {
    pub fn set_healthy(&self, healthy: bool) {
        let status = if healthy { 200 } else { 500 };
        self.health_status.store(status, Ordering::SeqCst);
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

async fn health(State(backend): State<Arc<MockBackend>>) -> StatusCode {
    StatusCode::from_u16(backend.health_status.load(Ordering::SeqCst))
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

async fn serve(State(backend): State<Arc<MockBackend>>, headers: HeaderMap) -> impl IntoResponse {
    backend.hits.fetch_add(1, Ordering::SeqCst);
    let host = headers
        .get("host")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    (
        [("x-backend-host", host)],
        format!("hello from {}", backend.addr),
    )
}

/// Start an axum backend on an ephemeral port, healthy until told otherwise.
pub async fn start_mock_backend() -> Arc<MockBackend> {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let backend = Arc::new(MockBackend {
        addr: listener.local_addr().unwrap(),
        health_status: AtomicU16::new(200),
        hits: AtomicUsize::new(0),
    });

    let app = Router::new()
        .route("/health", get(health))
        .fallback(serve)
        .with_state(backend.clone());
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    backend
}

/// Address nothing listens on.
pub async fn dead_address() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

pub fn balancer_config(backends: &[SocketAddr], trace: bool) -> BalancerConfig {
    let mut config = BalancerConfig::default();
    config.backends = BackendsConfig(backends.iter().map(ToString::to_string).collect());
    config.upstream.trace = trace;
    config.timeouts.request_secs = 2;
    config.health_check.interval_secs = 1;
    config
}

/// Run a balancer on an ephemeral port; returns its address and shutdown handle.
pub async fn start_balancer(config: BalancerConfig) -> (SocketAddr, Shutdown) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = BalancerServer::new(&config).unwrap();
    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.clone();

    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    // Let the initial health pass finish.
    tokio::time::sleep(Duration::from_millis(300)).await;
    (addr, shutdown)
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
