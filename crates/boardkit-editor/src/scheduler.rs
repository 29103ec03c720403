//! When to start background rebuilds.
//!
//! The scheduler never looks at the clock itself; every call gets `now`
//! so the policy can be driven deterministically.
//!
//! A change starts a debounce deadline which every further change pushes
//! back. Once the deadline has passed, and at least the minimum pause has
//! elapsed since the last run ended, one rebuild fires. Edits inside an open
//! command group are held back until the group closes.

use boardkit_core::StateId;
use boardkit_settings::SchedulerSettings;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::time::{Duration, Instant};
use uuid::Uuid;

use crate::model::LayerId;

/// Handle of a registered observer
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObserverId(Uuid);

impl ObserverId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for ObserverId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A rebuild the scheduler wants started
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RebuildRequest {
    pub full: bool,
    /// Layers to restrict to; `None` covers everything
    pub layers: Option<BTreeSet<LayerId>>,
}

#[derive(Debug, Clone)]
pub struct RebuildScheduler {
    debounce: Duration,
    min_pause: Duration,
    last_state: Option<StateId>,
    /// A change has not been rebuilt yet
    pending: bool,
    /// A change has not armed the deadline yet
    unarmed: bool,
    deadline: Option<Instant>,
    last_completion: Option<Instant>,
    forced: bool,
    first_observer: bool,
    /// Observed layers per observer; an empty set observes everything
    observers: BTreeMap<ObserverId, BTreeSet<LayerId>>,
}

impl RebuildScheduler {
    pub fn new(settings: &SchedulerSettings) -> Self {
        Self::with_timing(
            Duration::from_millis(settings.debounce_ms),
            Duration::from_millis(settings.min_pause_ms),
        )
    }

    pub fn with_timing(debounce: Duration, min_pause: Duration) -> Self {
        Self {
            debounce,
            min_pause,
            last_state: None,
            pending: false,
            unarmed: false,
            deadline: None,
            last_completion: None,
            forced: false,
            first_observer: false,
            observers: BTreeMap::new(),
        }
    }

    /// Reports the current state id. The first report only sets the baseline.
    pub fn note_state(&mut self, now: Instant, state_id: StateId, group_active: bool) {
        match self.last_state {
            None => self.last_state = Some(state_id),
            Some(last) if last != state_id => {
                self.last_state = Some(state_id);
                self.pending = true;
                self.unarmed = true;
            }
            Some(_) => {}
        }
        if self.unarmed && !group_active {
            self.unarmed = false;
            self.deadline = Some(now + self.debounce);
        }
    }

    /// Returns the rebuild to start now, if any.
    ///
    /// While `busy`, nothing fires and the deadline is kept for a later poll.
    pub fn poll(&mut self, now: Instant, busy: bool) -> Option<RebuildRequest> {
        if busy {
            return None;
        }
        if self.forced || self.first_observer {
            let forced = self.forced;
            self.forced = false;
            self.first_observer = false;
            self.reset();
            tracing::debug!(
                "Scheduler fires full rebuild ({})",
                if forced { "forced" } else { "first observer" }
            );
            return Some(RebuildRequest {
                full: true,
                layers: None,
            });
        }
        if self.observers.is_empty() || !self.pending {
            return None;
        }
        let deadline = self.deadline?;
        if now < deadline {
            return None;
        }
        if let Some(last) = self.last_completion {
            if now.saturating_duration_since(last) < self.min_pause {
                return None;
            }
        }
        self.reset();
        let layers = self.observed_layers();
        tracing::debug!("Scheduler fires rebuild for {:?}", layers);
        Some(RebuildRequest {
            full: false,
            layers,
        })
    }

    fn reset(&mut self) {
        self.pending = false;
        self.unarmed = false;
        self.deadline = None;
    }

    /// Makes the next poll fire a full rebuild regardless of timing.
    pub fn request_forced(&mut self) {
        self.forced = true;
    }

    pub fn is_forced(&self) -> bool {
        self.forced
    }

    pub fn mark_completed(&mut self, now: Instant) {
        self.last_completion = Some(now);
    }

    /// A change is waiting to be rebuilt.
    pub fn is_pending(&self) -> bool {
        self.pending
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn has_observers(&self) -> bool {
        !self.observers.is_empty()
    }

    /// Union of all observed layers, `None` if someone observes everything.
    pub fn observed_layers(&self) -> Option<BTreeSet<LayerId>> {
        if self.observers.values().any(BTreeSet::is_empty) {
            return None;
        }
        Some(self.observers.values().flatten().copied().collect())
    }

    pub fn add_observer(&mut self, layers: BTreeSet<LayerId>) -> ObserverId {
        let id = ObserverId::new();
        if self.observers.is_empty() {
            self.first_observer = true;
        }
        self.observers.insert(id, layers);
        tracing::debug!("Added rebuild observer {}", id);
        id
    }

    /// Returns false for an unknown id.
    pub fn update_observer(&mut self, id: ObserverId, layers: BTreeSet<LayerId>) -> bool {
        match self.observers.get_mut(&id) {
            Some(observed) => {
                *observed = layers;
                true
            }
            None => false,
        }
    }

    pub fn remove_observer(&mut self, id: ObserverId) -> bool {
        let removed = self.observers.remove(&id).is_some();
        if removed {
            tracing::debug!("Removed rebuild observer {}", id);
            if self.observers.is_empty() {
                self.first_observer = false;
            }
        }
        removed
    }
}
