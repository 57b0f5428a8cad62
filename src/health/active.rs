//! Active health checking.
//!
//! # Responsibilities
//! - Probe every backend once at startup, before traffic is accepted
//! - Run one independent periodic probe loop per backend
//! - Apply each outcome to the shared healthy view
//!
//! A hanging probe only delays its own backend's loop. The probe itself runs
//! outside the view's lock; only the outcome is applied under it.

use futures_util::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use crate::health::prober::HealthProber;
use crate::health::state::ProbeOutcome;
use crate::load_balancer::{BackendAddress, BackendPool, HealthyView, ViewChange};
use crate::observability::metrics;

/// Keeps the healthy view in step with probe results.
pub struct HealthMonitor {
    pool: BackendPool,
    view: Arc<HealthyView>,
    prober: HealthProber,
    interval: Duration,
}

impl HealthMonitor {
    pub fn new(
        pool: BackendPool,
        view: Arc<HealthyView>,
        prober: HealthProber,
        interval: Duration,
    ) -> Self {
        Self {
            pool,
            view,
            prober,
            interval,
        }
    }

    pub fn view(&self) -> &Arc<HealthyView> {
        &self.view
    }

    /// Probe one backend and apply the result.
    pub async fn check(&self, backend: &BackendAddress) -> ViewChange {
        let outcome = self.prober.probe(backend).await;
        self.apply(&outcome)
    }

    /// Apply an outcome produced elsewhere.
    pub fn apply(&self, outcome: &ProbeOutcome) -> ViewChange {
        let change = self.view.apply(&outcome.backend, outcome.healthy);
        metrics::record_backend_health(outcome.backend.as_str(), outcome.healthy);
        metrics::record_healthy_backends(self.view.len());
        change
    }

    /// Probe every backend once, concurrently.
    pub async fn initial_pass(&self) {
        join_all(self.pool.iter().map(|backend| self.check(backend))).await;
        if self.view.is_empty() {
            tracing::warn!(total = self.pool.len(), "No backend passed the initial health check");
        }
        tracing::info!(
            healthy = ?self.view.snapshot(),
            total = self.pool.len(),
            "Initial health check pass complete"
        );
    }

    /// Spawn one periodic probe loop per backend.
    ///
    /// The first probe of each loop happens one interval from now; pair with
    /// [`HealthMonitor::initial_pass`] for an immediate check.
    pub fn start(self: Arc<Self>, shutdown: &broadcast::Sender<()>) -> ProbeTasks {
        tracing::info!(
            interval_secs = self.interval.as_secs(),
            backends = self.pool.len(),
            "Health monitor starting"
        );

        let handles = self
            .pool
            .iter()
            .map(|backend| {
                let monitor = self.clone();
                let backend_addr = backend.clone();
                let shutdown = shutdown.subscribe();
                let handle = tokio::spawn(async move {
                    monitor.run_backend(backend_addr, shutdown).await;
                });
                (backend.clone(), handle)
            })
            .collect();

        ProbeTasks { handles }
    }

    async fn run_backend(&self, backend: BackendAddress, mut shutdown: broadcast::Receiver<()>) {
        let start = time::Instant::now() + self.interval;
        let mut ticker = time::interval_at(start, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.check(&backend).await;
                }
                _ = shutdown.recv() => {
                    tracing::debug!(backend = %backend, "Probe loop received shutdown signal, exiting");
                    break;
                }
            }
        }
    }
}

/// Handles to the per-backend probe loops, keyed by backend.
#[derive(Debug, Default)]
pub struct ProbeTasks {
    handles: HashMap<BackendAddress, JoinHandle<()>>,
}

impl ProbeTasks {
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub fn is_running(&self, backend: &BackendAddress) -> bool {
        self.handles
            .get(backend)
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Stop probing a single backend. Returns false if it had no loop.
    pub fn cancel(&mut self, backend: &BackendAddress) -> bool {
        match self.handles.remove(backend) {
            Some(handle) => {
                handle.abort();
                tracing::info!(backend = %backend, "Probe loop cancelled");
                true
            }
            None => false,
        }
    }

    /// Abort every loop still running, then wait for all of them.
    ///
    /// Covers loops that subscribed after the shutdown signal went out.
    pub async fn stop(self) {
        for handle in self.handles.values() {
            handle.abort();
        }
        self.join().await;
    }

    /// Wait for every loop to exit (after the shutdown signal was sent).
    pub async fn join(self) {
        for (backend, handle) in self.handles {
            if let Err(e) = handle.await {
                if !e.is_cancelled() {
                    tracing::error!(backend = %backend, error = %e, "Probe loop panicked");
                }
            }
        }
    }
}
