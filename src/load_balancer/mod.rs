//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     configured addresses → pool.rs (BackendPool, fixed for process lifetime)
//!
//! Health update (from health::active):
//!     ProbeOutcome → round_robin.rs HealthyView::apply (append / excise + cursor fix)
//!
//! Inbound request:
//!     round_robin.rs HealthyView::select_next
//!         → BackendAddress, or NoHealthyBackend
//! ```
//!
//! # Design Decisions
//! - Pure round robin; no weights, no connection counting
//! - Healthy view and cursor share one lock; no I/O while it is held
//! - Healthy view order is insertion order, not pool order

pub mod backend;
pub mod pool;
pub mod round_robin;

pub use backend::BackendAddress;
pub use pool::BackendPool;
pub use round_robin::{HealthyView, RotationState, SelectError, ViewChange};
