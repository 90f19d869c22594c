//! `NonNullRef` — a reference whose readers wait for a value to show up.

use std::sync::Arc;

use arc_swap::ArcSwapOption;

use super::monitor::Monitor;
use crate::concurrency::traits::{Ref, Wakeable};

/// A shared `Option<Arc<T>>` whose [`get`](NonNullRef::get) blocks while it is empty.
///
/// A blocked `get` returns once a value is set, or with whatever is present (possibly
/// nothing) after an [`awake`](Wakeable::awake) or an interrupt.
pub struct NonNullRef<T> {
    value: ArcSwapOption<T>,
    /// Wakeup generation; bumped by [`Wakeable::awake`].
    monitor: Monitor<u64>,
}

impl<T> NonNullRef<T> {
    /// Creates an empty reference.
    pub fn new() -> Self {
        Self {
            value: ArcSwapOption::empty(),
            monitor: Monitor::new(0),
        }
    }

    /// Returns `true` if a value is present.
    pub fn has(&self) -> bool {
        self.value.load().is_some()
    }

    /// Returns the value, waiting while there is none.
    pub fn get(&self) -> Option<Arc<T>> {
        if let Some(value) = self.value.load_full() {
            return Some(value);
        }
        let mut generation = self.monitor.lock();
        let started = *generation;
        while !self.has() && *generation == started {
            // An interrupt ends the wait like a wakeup and is consumed.
            if generation.wait().is_interrupted() {
                break;
            }
        }
        drop(generation);
        self.value.load_full()
    }

    /// Stores `value`, waking readers if it fills an empty reference.
    pub fn set(&self, value: Option<Arc<T>>) {
        // Stores happen under the monitor so a reader cannot park between a concurrent
        // clear and this fill.
        let guard = self.monitor.lock();
        let filling = value.is_some();
        let previous = self.value.swap(value);
        if filling && previous.is_none() {
            guard.notify_all();
        }
    }
}

impl<T> Default for NonNullRef<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Ref<T> for NonNullRef<T> {
    fn get(&self) -> Option<Arc<T>> {
        NonNullRef::get(self)
    }

    fn set(&self, value: Option<Arc<T>>) {
        NonNullRef::set(self, value);
    }
}

impl<T: Send + Sync> Wakeable for NonNullRef<T> {
    fn awake(&self) {
        let mut generation = self.monitor.lock();
        *generation = generation.wrapping_add(1);
        generation.notify_all();
    }
}
