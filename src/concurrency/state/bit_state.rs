//! `BitState` — a set of flags that threads can wait on.

use std::time::Duration;

use super::flags::{Flags, StateFlag};
use crate::concurrency::sync::interrupt;
use crate::concurrency::sync::{deadline_after, expired, Monitor, MonitorGuard, WaitOutcome};
use crate::concurrency::traits::Wakeable;

/// A flag set guarded by a monitor.
///
/// "Matching" a desired mask means sharing at least one flag with it. Every mutation
/// wakes all waiters, who then re-check their masks.
pub struct BitState<F> {
    monitor: Monitor<u32>,
    _flags: core::marker::PhantomData<fn() -> F>,
}

impl<F: StateFlag> BitState<F> {
    /// Creates a state holding `initial`.
    pub fn new(initial: impl Into<Flags<F>>) -> Self {
        Self {
            monitor: Monitor::new(initial.into().bits()),
            _flags: core::marker::PhantomData,
        }
    }

    /// Creates a state with no flags set.
    pub fn empty() -> Self {
        Self::new(Flags::<F>::empty())
    }

    /// Replaces the state.
    pub fn set(&self, state: impl Into<Flags<F>>) {
        self.update(|_| state.into().bits());
    }

    /// Clears every flag.
    pub fn clear(&self) {
        self.update(|_| 0);
    }

    /// Sets `flags` in addition to the current ones.
    pub fn add(&self, flags: impl Into<Flags<F>>) {
        let bits = flags.into().bits();
        self.update(|current| current | bits);
    }

    /// Clears `flags`, leaving the others.
    pub fn remove(&self, flags: impl Into<Flags<F>>) {
        let bits = flags.into().bits();
        self.update(|current| current & !bits);
    }

    /// The current state.
    pub fn get(&self) -> Flags<F> {
        Flags::from_bits(*self.monitor.lock())
    }

    /// Returns `true` if any of `desired` is set.
    pub fn has(&self, desired: impl Into<Flags<F>>) -> bool {
        self.get().intersects(desired.into())
    }

    /// Returns `true` if the state is exactly `state`.
    pub fn is(&self, state: impl Into<Flags<F>>) -> bool {
        self.get() == state.into()
    }

    /// Number of flags set.
    pub fn states(&self) -> u32 {
        self.get().len()
    }

    /// Replaces the state with `state` if any of `desired` is currently set.
    pub fn cas(&self, desired: impl Into<Flags<F>>, state: impl Into<Flags<F>>) -> bool {
        let desired = desired.into().bits();
        let mut current = self.monitor.lock();
        if *current & desired == 0 {
            return false;
        }
        *current = state.into().bits();
        current.notify_all();
        true
    }

    /// Blocks until any of `desired` is set. Returns `false` only if interrupted, in
    /// which case the thread's interrupt flag is left set.
    pub fn wait_for(&self, desired: impl Into<Flags<F>>) -> bool {
        self.wait_for_timeout(desired, Duration::ZERO)
    }

    /// Blocks until any of `desired` is set or `timeout` elapses, then reports whether
    /// it is set. A zero timeout waits indefinitely.
    pub fn wait_for_timeout(&self, desired: impl Into<Flags<F>>, timeout: Duration) -> bool {
        let desired = desired.into().bits();
        let deadline = deadline_after(timeout);
        let mut current = self.monitor.lock();
        while *current & desired == 0 && !expired(deadline) {
            if current.wait_until(deadline).is_interrupted() {
                interrupt::reassert();
                break;
            }
        }
        *current & desired != 0
    }

    /// Blocks until the next change or [`wakeup`](Self::wakeup), or an interrupt, and
    /// returns the state seen then.
    pub fn wait_for_change(&self) -> Flags<F> {
        let mut current = self.monitor.lock();
        if current.wait() == WaitOutcome::Interrupted {
            interrupt::reassert();
        }
        Flags::from_bits(*current)
    }

    /// Wakes every waiter so it re-checks its mask. The state is unchanged.
    pub fn wakeup(&self) {
        self.monitor.notify_all();
    }

    /// Locks the state for a batch of unsynchronized-looking ("lazy") operations.
    ///
    /// Waiters are not woken by the guard's mutations unless
    /// [`BitStateGuard::wakeup`] is called; they run once the guard drops.
    pub fn lock(&self) -> BitStateGuard<'_, F> {
        BitStateGuard {
            state: self.monitor.lock(),
            _flags: core::marker::PhantomData,
        }
    }

    fn update(&self, change: impl FnOnce(u32) -> u32) {
        let mut current = self.monitor.lock();
        *current = change(*current);
        current.notify_all();
    }
}

impl<F: StateFlag> Default for BitState<F> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<F: StateFlag> Wakeable for BitState<F> {
    fn awake(&self) {
        self.wakeup();
    }
}

impl<F: StateFlag> core::fmt::Debug for BitState<F> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_tuple("BitState").field(&self.get()).finish()
    }
}

/// Exclusive access to a [`BitState`] that does not notify on its own.
pub struct BitStateGuard<'a, F> {
    state: MonitorGuard<'a, u32>,
    _flags: core::marker::PhantomData<fn() -> F>,
}

impl<F: StateFlag> BitStateGuard<'_, F> {
    /// The current state.
    pub fn get(&self) -> Flags<F> {
        Flags::from_bits(*self.state)
    }

    /// Replaces the state without waking anyone.
    pub fn set(&mut self, state: impl Into<Flags<F>>) {
        *self.state = state.into().bits();
    }

    /// Sets `flags` without waking anyone.
    pub fn add(&mut self, flags: impl Into<Flags<F>>) {
        *self.state |= flags.into().bits();
    }

    /// Clears `flags` without waking anyone.
    pub fn remove(&mut self, flags: impl Into<Flags<F>>) {
        *self.state &= !flags.into().bits();
    }

    /// Wakes every waiter once this guard is dropped.
    pub fn wakeup(&self) {
        self.state.notify_all();
    }
}
