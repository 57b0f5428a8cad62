//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → command-line overrides (binary)
//!     → BalancerConfig (validated, immutable)
//!     → plain values handed to each subsystem at construction
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; the backend pool never changes at runtime
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    BackendsConfig, BalancerConfig, HealthCheckConfig, ListenerConfig, ObservabilityConfig,
    TimeoutConfig, UpstreamConfig, UpstreamScheme,
};
pub use validation::{validate_config, ValidationError};
