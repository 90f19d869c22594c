//! `Gate` — a latch that holds one payload back until it is opened.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use super::interrupt;
use super::monitor::{deadline_after, expired, Monitor};
use crate::concurrency::traits::Wakeable;

/// A closed/open latch guarding an immutable payload.
///
/// Threads calling [`acquire`](Gate::acquire) park until the gate is
/// [`open`](Gate::open)ed and then receive the payload. A timed-out, interrupted or
/// [`wakeup`](Gate::wakeup)-ed wait returns `None` and never reveals the payload while
/// the gate is closed. [`get`](Gate::get) bypasses the gate entirely.
///
/// Opening is one-way under normal use; [`close`](Gate::close) re-latches it.
pub struct Gate<T = ()> {
    item: T,
    closed: AtomicBool,
    /// Wakeup generation; bumped by [`wakeup`](Gate::wakeup).
    monitor: Monitor<u64>,
}

impl Gate<()> {
    /// Creates a closed gate with no payload.
    pub fn new() -> Self {
        Self::with(())
    }
}

impl Default for Gate<()> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Gate<T> {
    /// Creates a closed gate holding `item`.
    pub fn with(item: T) -> Self {
        Self {
            item,
            closed: AtomicBool::new(true),
            monitor: Monitor::new(0),
        }
    }

    /// Returns the payload without waiting, whether or not the gate is open.
    pub fn get(&self) -> &T {
        &self.item
    }

    /// Returns `true` while the gate is closed.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Returns `true` once the gate is open.
    pub fn is_open(&self) -> bool {
        !self.is_closed()
    }

    /// Opens the gate and wakes every waiter. Opening an open gate does nothing.
    pub fn open(&self) {
        if self.closed.swap(false, Ordering::AcqRel) {
            tracing::trace!("gate opened");
            self.monitor.notify_all();
        }
    }

    /// Closes the gate again. Later waits park until the next [`open`](Self::open).
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    /// Releases every thread currently waiting on the closed gate without opening it.
    /// Their waits report failure.
    pub fn wakeup(&self) {
        if self.is_closed() {
            let mut generation = self.monitor.lock();
            *generation = generation.wrapping_add(1);
            generation.notify_all();
        }
    }

    /// Waits until the gate opens, then returns the payload. Returns `None` if the wait
    /// is interrupted or woken while the gate is still closed.
    pub fn acquire(&self) -> Option<&T> {
        self.wait().then_some(&self.item)
    }

    /// Like [`acquire`](Self::acquire), but gives up after `timeout`. A zero timeout
    /// waits indefinitely.
    pub fn acquire_timeout(&self, timeout: Duration) -> Option<&T> {
        self.wait_timeout(timeout).then_some(&self.item)
    }

    /// Waits until the gate opens; `true` if it did.
    pub fn wait(&self) -> bool {
        self.wait_timeout(Duration::ZERO)
    }

    /// Waits at most `timeout` for the gate to open; `true` if it did. A zero timeout
    /// waits indefinitely.
    ///
    /// An interrupted wait returns `false` and leaves the thread's interrupt flag set.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        if self.is_open() {
            return true;
        }
        let deadline = deadline_after(timeout);
        let mut generation = self.monitor.lock();
        let started = *generation;
        while self.is_closed() && *generation == started && !expired(deadline) {
            if generation.wait_until(deadline).is_interrupted() {
                interrupt::reassert();
                break;
            }
        }
        self.is_open()
    }
}

impl<T: Send + Sync> Wakeable for Gate<T> {
    fn awake(&self) {
        self.wakeup();
    }
}

impl<T: core::fmt::Debug> core::fmt::Debug for Gate<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Gate")
            .field("item", &self.item)
            .field("open", &self.is_open())
            .finish()
    }
}
