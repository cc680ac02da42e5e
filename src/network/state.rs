//! Network state tracking.
//!
//! # States
//! - **Uninitialized**: fewer healthy nodes than the threshold.
//! - **Ready**: enough healthy nodes to place a secret.
//! - **Distributing**: a protect call is storing fragments.
//! - **Collecting**: a retrieve or discard call is fetching from nodes.
//!
//! Operations hold an [`OperationGuard`]; dropping it returns the network to
//! its resting state, including on early return or error.

use std::fmt;
use std::sync::{Mutex, MutexGuard};
use serde::Serialize;
use super::VaultError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkState {
    Uninitialized,
    Ready,
    Distributing,
    Collecting,
}

impl fmt::Display for NetworkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkState::Uninitialized => write!(f, "uninitialized"),
            NetworkState::Ready => write!(f, "ready"),
            NetworkState::Distributing => write!(f, "distributing"),
            NetworkState::Collecting => write!(f, "collecting"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Activity {
    Distributing,
    Collecting,
}

#[derive(Default)]
struct Counters {
    ready: bool,
    distributing: usize,
    collecting: usize,
}

impl Counters {
    fn state(&self) -> NetworkState {
        if self.distributing > 0 {
            NetworkState::Distributing
        } else if self.collecting > 0 {
            NetworkState::Collecting
        } else if self.ready {
            NetworkState::Ready
        } else {
            NetworkState::Uninitialized
        }
    }
}

/// Tracks the orchestrator state. Operations may overlap.
#[derive(Default)]
pub struct StateTracker {
    counters: Mutex<Counters>,
}

/// Marks an operation in progress; dropping it ends the operation.
pub struct OperationGuard<'a> {
    tracker: &'a StateTracker,
    activity: Activity,
}

impl Drop for OperationGuard<'_> {
    fn drop(&mut self) {
        let mut counters = self.tracker.lock();
        let from = counters.state();
        match self.activity {
            Activity::Distributing => counters.distributing -= 1,
            Activity::Collecting => counters.collecting -= 1,
        }
        let to = counters.state();
        if from != to {
            log::debug!("Network state: {} -> {}", from, to);
        }
    }
}

impl StateTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> NetworkState {
        self.lock().state()
    }

    /// Re-evaluates readiness from the current healthy node count.
    pub fn refresh(&self, healthy: usize, threshold: usize) -> NetworkState {
        let mut counters = self.lock();
        let ready = healthy >= threshold;
        if counters.ready != ready {
            if ready {
                log::info!("Network ready: {} healthy nodes, threshold {}", healthy, threshold);
            } else {
                log::warn!(
                    "Network not ready: {} healthy nodes, threshold {}",
                    healthy,
                    threshold
                );
            }
            counters.ready = ready;
        }
        counters.state()
    }

    /// Enters `Distributing`. Requires the network to be ready.
    pub fn begin_distributing(&self) -> Result<OperationGuard<'_>, VaultError> {
        let mut counters = self.lock();
        if !counters.ready {
            return Err(VaultError::InsufficientNodes);
        }
        counters.distributing += 1;
        Ok(OperationGuard {
            tracker: self,
            activity: Activity::Distributing,
        })
    }

    /// Enters `Collecting`.
    pub fn begin_collecting(&self) -> OperationGuard<'_> {
        self.lock().collecting += 1;
        OperationGuard {
            tracker: self,
            activity: Activity::Collecting,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Counters> {
        // Counters stay consistent even if a holder panicked.
        self.counters.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
