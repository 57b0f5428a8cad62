//! Backend abstraction.
//!
//! # Responsibilities
//! - Represent a single backend server by its `host:port` address
//! - Stay immutable once configured

use std::fmt;
use std::sync::Arc;

/// Address of a single backend server (`host:port`).
///
/// Cheap to clone; the underlying string is shared.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BackendAddress(Arc<str>);

impl BackendAddress {
    /// Create a backend address from a `host:port` string.
    pub fn new(addr: impl AsRef<str>) -> Self {
        Self(Arc::from(addr.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BackendAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BackendAddress {
    fn from(addr: &str) -> Self {
        Self::new(addr)
    }
}

impl From<String> for BackendAddress {
    fn from(addr: String) -> Self {
        Self::new(addr)
    }
}

impl AsRef<str> for BackendAddress {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
