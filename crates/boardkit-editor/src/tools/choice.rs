//! Layer and net selection that stays valid while the document changes.

use boardkit_core::{EventBus, EventFilter, SubscriptionGuard};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::events::{EditorCategory, EditorEvent};

/// A selected value out of a set of available values
#[derive(Debug, Clone, PartialEq)]
pub struct Choice<T> {
    available: Vec<T>,
    selected: Option<T>,
}

impl<T: Clone + PartialEq> Choice<T> {
    /// Selects `preferred` if it is available, otherwise the first entry.
    pub fn new(available: Vec<T>, preferred: Option<T>) -> Self {
        let selected = preferred
            .filter(|p| available.contains(p))
            .or_else(|| available.first().cloned());
        Self {
            available,
            selected,
        }
    }

    pub fn available(&self) -> &[T] {
        &self.available
    }

    pub fn selected(&self) -> Option<&T> {
        self.selected.as_ref()
    }

    /// Selects `value` if it is available. Returns false and keeps the
    /// current selection otherwise.
    pub fn set(&mut self, value: T) -> bool {
        if self.available.contains(&value) {
            self.selected = Some(value);
            true
        } else {
            false
        }
    }

    /// Replaces the available set. A selection that vanished falls back to
    /// the first entry. Returns true if anything changed.
    pub fn refresh(&mut self, available: Vec<T>) -> bool {
        let selected = match &self.selected {
            Some(current) if available.contains(current) => Some(current.clone()),
            _ => available.first().cloned(),
        };
        let changed = available != self.available || selected != self.selected;
        self.available = available;
        self.selected = selected;
        changed
    }
}

/// Flags net or layer list changes published on the bus
///
/// The subscription is detached when the watch is dropped, which happens
/// when the owning tool leaves.
#[derive(Debug)]
pub struct AvailabilityWatch {
    dirty: Arc<AtomicBool>,
    _guard: SubscriptionGuard,
}

impl AvailabilityWatch {
    pub fn new(bus: &EventBus<EditorEvent>) -> Self {
        let dirty = Arc::new(AtomicBool::new(false));
        let flag = dirty.clone();
        let guard = bus.subscribe_scoped(
            EventFilter::Categories(vec![EditorCategory::Nets, EditorCategory::Layers]),
            move |_| flag.store(true, Ordering::SeqCst),
        );
        Self {
            dirty,
            _guard: guard,
        }
    }

    /// True once after each change.
    pub fn take(&self) -> bool {
        self.dirty.swap(false, Ordering::SeqCst)
    }
}
