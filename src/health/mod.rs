//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     active.rs initial_pass → probe every backend once → healthy view seeded
//!
//! Per backend, every interval (active.rs):
//!     prober.rs GET <scheme>://<backend>/health (outside the lock)
//!     → state.rs ProbeOutcome { backend, healthy }
//!     → load_balancer::HealthyView::apply (under the lock)
//! ```
//!
//! # Design Decisions
//! - One loop per backend; a slow backend only slows its own checks
//! - A failed probe is not retried out of cycle
//! - Timeout, connection error and non-200 are all just "unhealthy"

pub mod active;
pub mod prober;
pub mod state;

pub use active::{HealthMonitor, ProbeTasks};
pub use prober::{HealthProber, ProbeConfig};
pub use state::{ProbeFailure, ProbeOutcome};
