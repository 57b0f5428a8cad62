//! Round-robin load balancing over the healthy view.
//!
//! The healthy view and the rotation cursor form one unit of state guarded by
//! a single lock. Health updates and selections are the only ways in, and each
//! one holds the lock for its whole read-modify-write.
//!
//! # Cursor maintenance
//! ```text
//! view [A, B, C], cursor 2 (C is next)
//!     B removed at index 1 < cursor  → cursor 1, view [A, C]  (C still next)
//!     C removed at index 2 == cursor → cursor 2 wraps to 0    (A next)
//!     D recovered                    → appended, cursor untouched
//! ```
//!
//! The cursor only moves back when the removed entry sat strictly before it.
//! Decrementing on `index == cursor` as well would hand the previously served
//! backend out a second time, because the removed entry's successor has
//! already shifted into the cursor slot.

use std::sync::{Mutex, MutexGuard, PoisonError};

use thiserror::Error;

use crate::load_balancer::backend::BackendAddress;

/// Errors returned by backend selection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectError {
    /// The healthy view is empty.
    #[error("no healthy backends available")]
    NoHealthyBackend,
}

/// Effect of a probe outcome on the healthy view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewChange {
    /// Backend recovered and was appended to the view.
    Added,
    /// Backend failed and was removed from the given position.
    Removed { index: usize },
    /// Outcome matched what the view already believed.
    Unchanged,
}

/// Healthy backends in insertion order plus the rotation cursor.
///
/// Invariant: `cursor < healthy.len()` whenever the view is non-empty, and
/// `cursor == 0` when it is empty.
#[derive(Debug, Default, Clone)]
pub struct RotationState {
    healthy: Vec<BackendAddress>,
    cursor: usize,
}

impl RotationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one probe outcome for `backend`.
    pub fn apply(&mut self, backend: &BackendAddress, healthy: bool) -> ViewChange {
        let position = self.healthy.iter().position(|b| b == backend);

        match (healthy, position) {
            (true, None) => {
                self.healthy.push(backend.clone());
                ViewChange::Added
            }
            (false, Some(index)) => {
                self.remove_at(index);
                ViewChange::Removed { index }
            }
            _ => ViewChange::Unchanged,
        }
    }

    fn remove_at(&mut self, index: usize) {
        self.healthy.remove(index);

        // Everything after `index` shifted left by one.
        if index < self.cursor {
            self.cursor -= 1;
        }
        // The cursor pointed at the removed tail entry.
        if self.cursor >= self.healthy.len() {
            self.cursor = 0;
        }
    }

    /// Return the backend under the cursor and advance the cursor by one.
    pub fn select_next(&mut self) -> Result<BackendAddress, SelectError> {
        if self.healthy.is_empty() {
            return Err(SelectError::NoHealthyBackend);
        }
        let backend = self.healthy[self.cursor].clone();
        self.cursor = (self.cursor + 1) % self.healthy.len();
        Ok(backend)
    }

    pub fn healthy(&self) -> &[BackendAddress] {
        &self.healthy
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }
}

/// Shared, lock-protected rotation state.
#[derive(Debug, Default)]
pub struct HealthyView {
    state: Mutex<RotationState>,
}

impl HealthyView {
    pub fn new() -> Self {
        Self::default()
    }

    // No critical section can panic half-way, so a poisoned lock still
    // guards a consistent view.
    fn lock(&self) -> MutexGuard<'_, RotationState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply a probe outcome atomically with respect to selection.
    pub fn apply(&self, backend: &BackendAddress, healthy: bool) -> ViewChange {
        let mut state = self.lock();
        let change = state.apply(backend, healthy);
        if change != ViewChange::Unchanged {
            tracing::info!(
                backend = %backend,
                change = ?change,
                healthy = ?state.healthy(),
                cursor = state.cursor(),
                "Healthy view updated"
            );
        }
        change
    }

    /// Pick the next healthy backend in rotation.
    pub fn select_next(&self) -> Result<BackendAddress, SelectError> {
        self.lock().select_next()
    }

    /// Copy of the current healthy view, in rotation order.
    pub fn snapshot(&self) -> Vec<BackendAddress> {
        self.lock().healthy().to_vec()
    }

    pub fn len(&self) -> usize {
        self.lock().healthy().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().healthy().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::sync::Arc;

    fn addr(name: &str) -> BackendAddress {
        BackendAddress::new(name)
    }

    fn state_with(names: &[&str]) -> RotationState {
        let mut state = RotationState::new();
        for name in names {
            state.apply(&addr(name), true);
        }
        state
    }

    fn pick(state: &mut RotationState) -> String {
        state.select_next().unwrap().to_string()
    }

    #[test]
    fn test_round_robin_cycles_in_view_order() {
        let mut state = state_with(&["A", "B", "C"]);
        let picked: Vec<String> = (0..7).map(|_| pick(&mut state)).collect();
        assert_eq!(picked, vec!["A", "B", "C", "A", "B", "C", "A"]);
    }

    #[test]
    fn test_empty_view_fails() {
        let mut state = RotationState::new();
        assert_eq!(state.select_next(), Err(SelectError::NoHealthyBackend));
    }

    #[test]
    fn test_healthy_again_does_not_duplicate() {
        let mut state = state_with(&["A", "B"]);
        assert_eq!(state.apply(&addr("A"), true), ViewChange::Unchanged);
        assert_eq!(state.healthy().len(), 2);
    }

    #[test]
    fn test_unhealthy_absent_backend_is_noop() {
        let mut state = state_with(&["A"]);
        assert_eq!(state.apply(&addr("B"), false), ViewChange::Unchanged);
        assert_eq!(state.healthy(), &[addr("A")]);
    }

    #[test]
    fn test_removal_before_cursor_keeps_next_backend() {
        let mut state = state_with(&["A", "B", "C"]);
        pick(&mut state);
        pick(&mut state);
        assert_eq!(state.cursor(), 2);

        assert_eq!(state.apply(&addr("B"), false), ViewChange::Removed { index: 1 });
        assert_eq!(state.cursor(), 1);
        assert_eq!(pick(&mut state), "C");
        assert_eq!(pick(&mut state), "A");
        assert_eq!(pick(&mut state), "C");
    }

    #[test]
    fn test_removal_at_cursor_serves_successor() {
        let mut state = state_with(&["A", "B", "C"]);
        pick(&mut state);
        assert_eq!(state.cursor(), 1);

        state.apply(&addr("B"), false);
        assert_eq!(pick(&mut state), "C");
        assert_eq!(pick(&mut state), "A");
    }

    #[test]
    fn test_removal_of_tail_under_cursor_wraps() {
        let mut state = state_with(&["A", "B", "C"]);
        pick(&mut state);
        pick(&mut state);

        state.apply(&addr("C"), false);
        assert_eq!(state.cursor(), 0);
        assert_eq!(pick(&mut state), "A");
        assert_eq!(pick(&mut state), "B");
    }

    #[test]
    fn test_removal_after_cursor_leaves_cursor() {
        let mut state = state_with(&["A", "B", "C"]);
        pick(&mut state);

        state.apply(&addr("C"), false);
        assert_eq!(state.cursor(), 1);
        assert_eq!(pick(&mut state), "B");
        assert_eq!(pick(&mut state), "A");
    }

    #[test]
    fn test_recovered_backend_is_appended() {
        let mut state = state_with(&["A", "B", "C"]);
        state.apply(&addr("A"), false);
        state.apply(&addr("A"), true);
        assert_eq!(state.healthy(), &[addr("B"), addr("C"), addr("A")]);
    }

    #[test]
    fn test_emptied_view_recovers_with_valid_cursor() {
        let mut state = state_with(&["A", "B"]);
        pick(&mut state);
        state.apply(&addr("A"), false);
        state.apply(&addr("B"), false);
        assert_eq!(state.select_next(), Err(SelectError::NoHealthyBackend));

        state.apply(&addr("B"), true);
        assert_eq!(pick(&mut state), "B");
        assert_eq!(pick(&mut state), "B");
    }

    #[test]
    fn test_shared_view_serializes_concurrent_selection() {
        let view = Arc::new(HealthyView::new());
        for name in ["A", "B", "C", "D"] {
            view.apply(&addr(name), true);
        }

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let view = view.clone();
                std::thread::spawn(move || {
                    (0..100).map(|_| view.select_next().unwrap()).collect::<Vec<_>>()
                })
            })
            .collect();

        let mut counts = std::collections::HashMap::new();
        for handle in handles {
            for backend in handle.join().unwrap() {
                *counts.entry(backend).or_insert(0) += 1;
            }
        }
        // 400 selections over 4 backends: exactly 100 each.
        assert_eq!(counts.len(), 4);
        assert!(counts.values().all(|&n| n == 100));
    }

    /// Order in which backends would be served, starting at the cursor.
    fn upcoming(state: &RotationState) -> Vec<BackendAddress> {
        let view = state.healthy();
        (0..view.len())
            .map(|i| view[(state.cursor() + i) % view.len()].clone())
            .collect()
    }

    #[derive(Debug, Clone)]
    enum Op {
        Probe(usize, bool),
        Select,
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0..6usize, any::<bool>()).prop_map(|(i, h)| Op::Probe(i, h)),
            Just(Op::Select),
        ]
    }

    proptest! {
        #[test]
        fn prop_cursor_stays_in_bounds(ops in proptest::collection::vec(op(), 0..200)) {
            let mut state = RotationState::new();
            for op in ops {
                match op {
                    Op::Probe(i, healthy) => { state.apply(&addr(&format!("b{i}")), healthy); }
                    Op::Select => { let _ = state.select_next(); }
                }
                let len = state.healthy().len();
                if len == 0 {
                    prop_assert_eq!(state.cursor(), 0);
                } else {
                    prop_assert!(state.cursor() < len);
                }
                let mut unique = state.healthy().to_vec();
                unique.sort();
                unique.dedup();
                prop_assert_eq!(unique.len(), len);
            }
        }

        #[test]
        fn prop_removal_neither_skips_nor_repeats(
            size in 1..8usize,
            advance in 0..16usize,
            victims in proptest::collection::vec(0..8usize, 1..4),
        ) {
            let names: Vec<String> = (0..size).map(|i| format!("b{i}")).collect();
            let mut state = RotationState::new();
            for name in &names {
                state.apply(&addr(name), true);
            }
            for _ in 0..advance {
                state.select_next().unwrap();
            }

            for victim in victims {
                let victim = addr(&format!("b{}", victim % size));
                let mut expected = upcoming(&state);
                expected.retain(|b| b != &victim);

                state.apply(&victim, false);
                prop_assert_eq!(upcoming(&state), expected);
            }
        }

        #[test]
        fn prop_stable_view_serves_each_backend_once_per_cycle(size in 1..10usize) {
            let names: Vec<String> = (0..size).map(|i| format!("b{i}")).collect();
            let mut state = RotationState::new();
            for name in &names {
                state.apply(&addr(name), true);
            }
            let first: Vec<String> = (0..size).map(|_| pick(&mut state)).collect();
            prop_assert_eq!(&first, &names);
            prop_assert_eq!(pick(&mut state), names[0].clone());
        }
    }
}
