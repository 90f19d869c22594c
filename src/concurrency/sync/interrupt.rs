//! Cooperative, per-thread interruption.
//!
//! Rust threads cannot be interrupted from the outside, so every blocking primitive in
//! this crate honours a per-thread interrupt flag instead. A thread parked inside a
//! [`Monitor`](super::Monitor) wait registers the monitor it sleeps on, which lets
//! [`Interrupter::interrupt`] raise the flag and wake the thread in one step.
//!
//! A wait that observes the flag consumes it (see [`take`]). Primitives that want the
//! caller to still see the interruption put it back with [`reassert`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

/// Something a parked thread can be shaken out of.
pub(crate) trait Unpark: Send + Sync {
    /// Wakes every thread parked on `self`.
    fn unpark_all(&self);
}

struct InterruptState {
    flag: AtomicBool,
    parked_on: Mutex<Option<Arc<dyn Unpark>>>,
}

thread_local! {
    static CURRENT: Arc<InterruptState> = Arc::new(InterruptState {
        flag: AtomicBool::new(false),
        parked_on: Mutex::new(None),
    });
}

fn with_current<R>(f: impl FnOnce(&Arc<InterruptState>) -> R) -> R {
    CURRENT.with(f)
}

/// A handle that can interrupt one particular thread.
///
/// Obtained on the target thread with [`current`] and sent to whichever thread wants to
/// cancel it.
#[derive(Clone)]
pub struct Interrupter {
    state: Arc<InterruptState>,
}

impl Interrupter {
    /// Raises the target thread's interrupt flag and wakes it if it is parked in a
    /// monitor wait.
    pub fn interrupt(&self) {
        self.state.flag.store(true, Ordering::SeqCst);
        // Clone out so the monitor is never locked while `parked_on` is held.
        let parked = self.state.parked_on.lock().clone();
        if let Some(target) = parked {
            target.unpark_all();
        }
    }

    /// Returns whether the target thread has a pending interrupt.
    pub fn is_interrupted(&self) -> bool {
        self.state.flag.load(Ordering::SeqCst)
    }
}

impl core::fmt::Debug for Interrupter {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Interrupter")
            .field("interrupted", &self.is_interrupted())
            .finish()
    }
}

/// Returns an [`Interrupter`] for the calling thread.
pub fn current() -> Interrupter {
    with_current(|state| Interrupter {
        state: Arc::clone(state),
    })
}

/// Returns whether the calling thread has a pending interrupt, without clearing it.
pub fn is_interrupted() -> bool {
    with_current(|state| state.flag.load(Ordering::SeqCst))
}

/// Clears the calling thread's interrupt flag and returns its previous value.
pub fn take() -> bool {
    with_current(|state| state.flag.swap(false, Ordering::SeqCst))
}

/// Raises the calling thread's own interrupt flag.
pub fn reassert() {
    with_current(|state| state.flag.store(true, Ordering::SeqCst));
}

/// Registration of the calling thread as parked on some target; cleared on drop.
pub(crate) struct Parked {
    state: Arc<InterruptState>,
}

/// Records that the calling thread is about to park on `target`.
///
/// Must be called before the final interrupt check that precedes the actual park, so an
/// interrupt raised concurrently is either seen by that check or delivered to `target`.
pub(crate) fn park_on(target: Arc<dyn Unpark>) -> Parked {
    let state = with_current(Arc::clone);
    *state.parked_on.lock() = Some(target);
    Parked { state }
}

impl Drop for Parked {
    fn drop(&mut self) {
        self.state.parked_on.lock().take();
    }
}
