use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex, MutexGuard};

use super::interrupt::{self, Unpark};

/// Why a [`MonitorGuard`] wait returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// Woken by a notification (or spuriously).
    Notified,
    /// The deadline passed first.
    TimedOut,
    /// The waiting thread was interrupted. The interrupt flag has been consumed.
    Interrupted,
}

impl WaitOutcome {
    /// Returns `true` for [`WaitOutcome::Interrupted`].
    pub fn is_interrupted(self) -> bool {
        self == WaitOutcome::Interrupted
    }

    /// Returns `true` for [`WaitOutcome::TimedOut`].
    pub fn timed_out(self) -> bool {
        self == WaitOutcome::TimedOut
    }
}

struct Shared<T> {
    state: Mutex<T>,
    cond: Condvar,
}

impl<T: Send> Unpark for Shared<T> {
    fn unpark_all(&self) {
        let _guard = self.state.lock();
        self.cond.notify_all();
    }
}

/// A lock and condition variable pair guarding one value, with classic
/// wait/notify semantics.
///
/// Waits take an optional deadline and are interruptible through
/// [`interrupt`](super::interrupt). Every wait/notify primitive in this crate owns
/// exactly one monitor; monitors are never shared across instances.
pub struct Monitor<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Monitor<T> {
    /// Creates a monitor guarding `value`.
    pub fn new(value: T) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(value),
                cond: Condvar::new(),
            }),
        }
    }

    /// Acquires the monitor.
    pub fn lock(&self) -> MonitorGuard<'_, T> {
        MonitorGuard {
            monitor: self,
            guard: self.shared.state.lock(),
        }
    }

    /// Acquires the monitor and wakes every waiter.
    pub fn notify_all(&self) {
        let _guard = self.shared.state.lock();
        self.shared.cond.notify_all();
    }

    /// Acquires the monitor and wakes one waiter.
    pub fn notify_one(&self) {
        let _guard = self.shared.state.lock();
        self.shared.cond.notify_one();
    }
}

impl<T: Default> Default for Monitor<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

/// Exclusive access to a [`Monitor`]'s value.
pub struct MonitorGuard<'a, T> {
    monitor: &'a Monitor<T>,
    guard: MutexGuard<'a, T>,
}

impl<T> Deref for MonitorGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.guard
    }
}

impl<T> DerefMut for MonitorGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.guard
    }
}

impl<'a, T> MonitorGuard<'a, T> {
    /// Wakes one waiter. It runs once this guard is released.
    pub fn notify_one(&self) {
        self.monitor.shared.cond.notify_one();
    }

    /// Wakes every waiter. They run once this guard is released.
    pub fn notify_all(&self) {
        self.monitor.shared.cond.notify_all();
    }

    /// Returns the monitor this guard belongs to.
    pub fn monitor(&self) -> &'a Monitor<T> {
        self.monitor
    }
}

impl<T: Send + 'static> MonitorGuard<'_, T> {
    /// Releases the monitor, parks until notified or interrupted, and re-acquires it.
    pub fn wait(&mut self) -> WaitOutcome {
        self.wait_until(None)
    }

    /// Like [`wait`](Self::wait) but gives up after `timeout`.
    pub fn wait_for(&mut self, timeout: Duration) -> WaitOutcome {
        self.wait_until(Instant::now().checked_add(timeout))
    }

    /// Parks until notified, interrupted, or `deadline` (if any) passes.
    ///
    /// A pending interrupt is consumed and reported without parking at all.
    pub fn wait_until(&mut self, deadline: Option<Instant>) -> WaitOutcome {
        let target: Arc<dyn Unpark> = self.monitor.shared.clone();
        let _parked = interrupt::park_on(target);
        if interrupt::take() {
            return WaitOutcome::Interrupted;
        }

        let timed_out = match deadline {
            Some(deadline) => self
                .monitor
                .shared
                .cond
                .wait_until(&mut self.guard, deadline)
                .timed_out(),
            None => {
                self.monitor.shared.cond.wait(&mut self.guard);
                false
            }
        };

        if interrupt::take() {
            WaitOutcome::Interrupted
        } else if timed_out {
            WaitOutcome::TimedOut
        } else {
            WaitOutcome::Notified
        }
    }
}

/// Converts a caller timeout into a deadline. Zero means "no deadline", as does a
/// timeout too large to represent.
pub(crate) fn deadline_after(timeout: Duration) -> Option<Instant> {
    if timeout.is_zero() {
        None
    } else {
        Instant::now().checked_add(timeout)
    }
}

/// Returns `true` once `deadline` has passed.
pub(crate) fn expired(deadline: Option<Instant>) -> bool {
    deadline.is_some_and(|d| Instant::now() >= d)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn wait_for_times_out() {
        let monitor = Monitor::new(());
        let start = Instant::now();
        let outcome = monitor.lock().wait_for(Duration::from_millis(30));
        assert_eq!(outcome, WaitOutcome::TimedOut);
        assert!(start.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn interrupt_wakes_a_parked_waiter() {
        let monitor = Monitor::new(false);
        let monitor = &monitor;
        thread::scope(|s| {
            let (tx, rx) = std::sync::mpsc::channel();
            let waiter = s.spawn(move || {
                let mut guard = monitor.lock();
                tx.send(interrupt::current()).unwrap();
                loop {
                    if *guard {
                        return WaitOutcome::Notified;
                    }
                    let outcome = guard.wait();
                    if outcome.is_interrupted() {
                        return outcome;
                    }
                }
            });
            let interrupter = rx.recv().unwrap();
            thread::sleep(Duration::from_millis(20));
            interrupter.interrupt();
            assert_eq!(waiter.join().unwrap(), WaitOutcome::Interrupted);
        });
    }

    #[test]
    fn pending_interrupt_skips_the_park() {
        let monitor = Monitor::new(());
        interrupt::reassert();
        assert_eq!(monitor.lock().wait(), WaitOutcome::Interrupted);
        assert!(!interrupt::is_interrupted());
    }

    #[test]
    fn zero_timeout_means_no_deadline() {
        assert!(deadline_after(Duration::ZERO).is_none());
        assert!(deadline_after(Duration::from_millis(1)).is_some());
        assert!(!expired(None));
    }
}
