//! Backend pool.
//!
//! # Responsibilities
//! - Hold the configured, ordered list of candidate backends
//! - Never change after construction (health lives in `round_robin`)

use std::collections::HashSet;

use crate::load_balancer::backend::BackendAddress;

/// The fixed set of configured backends, in configuration order.
#[derive(Debug, Clone)]
pub struct BackendPool {
    backends: Vec<BackendAddress>,
}

impl BackendPool {
    /// Build a pool from configured addresses.
    ///
    /// Repeated addresses are collapsed to their first occurrence so each
    /// backend gets exactly one probe task.
    pub fn new<I, S>(addresses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = HashSet::new();
        let mut backends = Vec::new();
        for addr in addresses {
            let addr = BackendAddress::new(addr.as_ref().trim());
            if seen.insert(addr.clone()) {
                backends.push(addr);
            } else {
                tracing::warn!(backend = %addr, "Duplicate backend address ignored");
            }
        }
        Self { backends }
    }

    pub fn backends(&self) -> &[BackendAddress] {
        &self.backends
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BackendAddress> {
        self.backends.iter()
    }
}
