//! `EnumState` — a single enum value that threads can wait on.

use std::time::Duration;

use crate::concurrency::sync::interrupt;
use crate::concurrency::sync::{deadline_after, expired, Monitor, MonitorGuard, WaitOutcome};
use crate::concurrency::traits::Wakeable;

/// An `Option<E>` guarded by a monitor; `None` means "unset".
///
/// Unlike [`BitState`](super::BitState), matching is exact equality. Every mutation
/// wakes all waiters.
pub struct EnumState<E> {
    monitor: Monitor<Option<E>>,
}

impl<E> EnumState<E>
where
    E: Copy + PartialEq + Send + 'static,
{
    /// Creates a state holding `initial`, which may be `None`.
    pub fn new(initial: impl Into<Option<E>>) -> Self {
        Self {
            monitor: Monitor::new(initial.into()),
        }
    }

    /// Replaces the state.
    pub fn set(&self, state: impl Into<Option<E>>) {
        let mut current = self.monitor.lock();
        *current = state.into();
        current.notify_all();
    }

    /// Unsets the state.
    pub fn clear(&self) {
        self.set(None);
    }

    /// The current state.
    pub fn get(&self) -> Option<E> {
        *self.monitor.lock()
    }

    /// Returns `true` if the state equals `state`.
    pub fn is(&self, state: impl Into<Option<E>>) -> bool {
        *self.monitor.lock() == state.into()
    }

    /// Replaces the state with `state` if it currently equals `desired`.
    pub fn cas(&self, desired: impl Into<Option<E>>, state: impl Into<Option<E>>) -> bool {
        let desired = desired.into();
        let mut current = self.monitor.lock();
        if *current != desired {
            return false;
        }
        *current = state.into();
        current.notify_all();
        true
    }

    /// Blocks until the state equals `desired`. Returns `false` only if interrupted, in
    /// which case the thread's interrupt flag is left set.
    pub fn wait_for(&self, desired: impl Into<Option<E>>) -> bool {
        self.wait_for_timeout(desired, Duration::ZERO)
    }

    /// Blocks until the state equals `desired` or `timeout` elapses, then reports
    /// whether it does. A zero timeout waits indefinitely.
    pub fn wait_for_timeout(&self, desired: impl Into<Option<E>>, timeout: Duration) -> bool {
        let desired = desired.into();
        let deadline = deadline_after(timeout);
        let mut current = self.monitor.lock();
        while *current != desired && !expired(deadline) {
            if current.wait_until(deadline).is_interrupted() {
                interrupt::reassert();
                break;
            }
        }
        *current == desired
    }

    /// Blocks until the next change or [`wakeup`](Self::wakeup), or an interrupt, and
    /// returns the state seen then.
    pub fn wait_for_change(&self) -> Option<E> {
        let mut current = self.monitor.lock();
        if current.wait() == WaitOutcome::Interrupted {
            interrupt::reassert();
        }
        *current
    }

    /// Wakes every waiter so it re-checks. The state is unchanged.
    pub fn wakeup(&self) {
        self.monitor.notify_all();
    }

    /// Locks the state for "lazy" reads and writes that do not notify on their own.
    pub fn lock(&self) -> EnumStateGuard<'_, E> {
        EnumStateGuard {
            state: self.monitor.lock(),
        }
    }
}

impl<E> Default for EnumState<E>
where
    E: Copy + PartialEq + Send + 'static,
{
    fn default() -> Self {
        Self::new(None)
    }
}

impl<E> Wakeable for EnumState<E>
where
    E: Copy + PartialEq + Send + 'static,
{
    fn awake(&self) {
        self.wakeup();
    }
}

impl<E> core::fmt::Debug for EnumState<E>
where
    E: Copy + PartialEq + Send + core::fmt::Debug + 'static,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_tuple("EnumState").field(&self.get()).finish()
    }
}

/// Exclusive access to an [`EnumState`] that does not notify on its own.
pub struct EnumStateGuard<'a, E> {
    state: MonitorGuard<'a, Option<E>>,
}

impl<E: Copy> EnumStateGuard<'_, E> {
    /// The current state.
    pub fn get(&self) -> Option<E> {
        *self.state
    }

    /// Replaces the state without waking anyone.
    pub fn set(&mut self, state: impl Into<Option<E>>) {
        *self.state = state.into();
    }

    /// Wakes every waiter once this guard is dropped.
    pub fn wakeup(&self) {
        self.state.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Process {
        Starting,
        Running,
        Stopped,
    }

    #[test]
    fn starts_unset_by_default() {
        let state: EnumState<Process> = EnumState::default();
        assert_eq!(state.get(), None);
        assert!(state.is(None));
    }

    #[test]
    fn cas_requires_exact_match() {
        let state = EnumState::new(Process::Starting);
        assert!(!state.cas(Process::Running, Process::Stopped));
        assert!(state.cas(Process::Starting, Process::Running));
        assert!(state.is(Process::Running));
        state.clear();
        assert!(state.cas(None, Process::Starting));
    }

    #[test]
    fn waiter_is_released_by_set() {
        let state = EnumState::new(Process::Starting);
        thread::scope(|s| {
            let waiter = s.spawn(|| state.wait_for(Process::Stopped));
            thread::sleep(Duration::from_millis(20));
            state.set(Process::Running);
            state.set(Process::Stopped);
            assert!(waiter.join().unwrap());
        });
    }

    #[test]
    fn timed_wait_gives_up() {
        let state = EnumState::new(Process::Starting);
        assert!(!state.wait_for_timeout(Process::Stopped, Duration::from_millis(20)));
        assert_eq!(state.get(), Some(Process::Starting));
    }

    #[test]
    fn interrupted_wait_reasserts_the_flag() {
        let state = EnumState::new(Process::Starting);
        interrupt::reassert();
        assert!(!state.wait_for(Process::Stopped));
        assert!(interrupt::take());
    }

    #[test]
    fn wait_for_change_sees_the_new_value() {
        let state = EnumState::new(Process::Starting);
        thread::scope(|s| {
            let waiter = s.spawn(|| state.wait_for_change());
            while !waiter.is_finished() {
                thread::sleep(Duration::from_millis(10));
                let mut guard = state.lock();
                guard.set(Process::Running);
                guard.wakeup();
            }
            assert_eq!(waiter.join().unwrap(), Some(Process::Running));
        });
    }
}
