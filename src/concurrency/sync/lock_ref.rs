//! `LockRef` — a write-biased reference cell.
//!
//! Writers take an exclusive barrier; readers never take any lock. Instead a writer
//! announces itself on an atomic pending-writer count *before* queueing on the barrier,
//! and readers back off until that count drains:
//!
//! - `writers > 0` means a write is queued or in progress, so [`LockRef::get`] waits.
//! - `generation` advances (release) once per finished write section; a reader that
//!   sees it move while reading retries.
//!
//! A write takes effect at the store made by [`LockRefGuard::unlock_with`], before the
//! guard releases the barrier and bumps `generation`. A reader that slips in between
//! sees exactly the value that unlock publishes, never an intermediate one.
//!
//! Readers therefore never contend with each other and are only delayed by writers.
//! Under a steady stream of writers a reader can be delayed indefinitely.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use crossbeam_utils::{Backoff, CachePadded};
use parking_lot::{Mutex, MutexGuard};

use crate::concurrency::atomic::Signal;
use crate::concurrency::traits::Ref;

/// A shared `Option<Arc<T>>` whose writers exclude readers.
///
/// The barrier is **not** reentrant: a thread holding a [`LockRefGuard`] must not call
/// [`lock`](LockRef::lock) or [`set`](LockRef::set) on the same `LockRef` again.
pub struct LockRef<T> {
    value: ArcSwapOption<T>,
    barrier: Mutex<()>,
    writers: CachePadded<AtomicUsize>,
    generation: CachePadded<AtomicU64>,
    changed: Signal,
}

impl<T> LockRef<T> {
    /// Creates a reference to `value`.
    pub fn new(value: T) -> Self {
        Self::from_arc(Some(Arc::new(value)))
    }

    /// Creates a reference holding nothing.
    pub fn empty() -> Self {
        Self::from_arc(None)
    }

    /// Creates a reference to an already shared value.
    pub fn from_arc(value: Option<Arc<T>>) -> Self {
        Self {
            value: ArcSwapOption::new(value),
            barrier: Mutex::new(()),
            writers: CachePadded::new(AtomicUsize::new(0)),
            generation: CachePadded::new(AtomicU64::new(0)),
            changed: Signal::new(),
        }
    }

    /// Declares write intent and blocks until this thread holds the write barrier.
    ///
    /// From the moment this is called until the returned guard is released, every
    /// [`get`](Self::get) on another thread waits.
    pub fn lock(&self) -> LockRefGuard<'_, T> {
        self.writers.fetch_add(1, Ordering::AcqRel);
        let barrier = self.barrier.lock();
        LockRefGuard {
            owner: self,
            barrier: Some(barrier),
        }
    }

    /// Replaces the value: `lock` followed by [`LockRefGuard::unlock_with`].
    pub fn set(&self, value: Option<Arc<T>>) {
        self.lock().unlock_with(value);
    }

    /// Returns the current value, first waiting out every pending or active writer.
    ///
    /// Takes no lock.
    pub fn get(&self) -> Option<Arc<T>> {
        let backoff = Backoff::new();
        loop {
            let before = self.generation.load(Ordering::Acquire);
            if self.writers.load(Ordering::Acquire) == 0 {
                let value = self.value.load_full();
                if self.generation.load(Ordering::Acquire) == before {
                    return value;
                }
            }
            backoff.snooze();
        }
    }

    /// Returns `true` if the value changed since the last call. Consumes the change.
    pub fn has_new_value(&self) -> bool {
        self.changed.received()
    }

    /// Number of write sections completed so far.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Returns `true` while a write is pending or in progress.
    pub fn is_locked(&self) -> bool {
        self.writers.load(Ordering::Acquire) > 0
    }
}

impl<T> Default for LockRef<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T> Ref<T> for LockRef<T> {
    fn get(&self) -> Option<Arc<T>> {
        LockRef::get(self)
    }

    fn set(&self, value: Option<Arc<T>>) {
        LockRef::set(self, value);
    }
}

impl<T> core::fmt::Debug for LockRef<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LockRef")
            .field("writers", &self.writers.load(Ordering::Relaxed))
            .field("generation", &self.generation())
            .finish_non_exhaustive()
    }
}

/// Write access to a [`LockRef`]. Dropping the guard unlocks without changing the value.
#[must_use = "dropping the guard releases the write lock immediately"]
pub struct LockRefGuard<'a, T> {
    owner: &'a LockRef<T>,
    barrier: Option<MutexGuard<'a, ()>>,
}

impl<T> LockRefGuard<'_, T> {
    /// The value as of locking.
    pub fn value(&self) -> Option<Arc<T>> {
        self.owner.value.load_full()
    }

    /// Releases the write lock, leaving the value unchanged.
    pub fn unlock(self) {}

    /// Stores `value` (only if it is not the very same allocation as the current one,
    /// which also records a change for [`LockRef::has_new_value`]) and releases the
    /// write lock.
    pub fn unlock_with(self, value: Option<Arc<T>>) {
        let current = self.owner.value.load();
        let same = match ((*current).as_ref(), value.as_ref()) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        };
        drop(current);
        if !same {
            self.owner.value.store(value);
            self.owner.changed.send();
        }
    }
}

impl<T> Drop for LockRefGuard<'_, T> {
    fn drop(&mut self) {
        self.owner.generation.fetch_add(1, Ordering::AcqRel);
        drop(self.barrier.take());
        self.owner.writers.fetch_sub(1, Ordering::AcqRel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_reference_reads_none() {
        let r: LockRef<String> = LockRef::empty();
        assert!(r.get().is_none());
        assert!(!r.is_locked());
    }

    #[test]
    fn set_then_get() {
        let r = LockRef::empty();
        r.set(Some(Arc::new("Hello World!")));
        assert_eq!(r.get().as_deref(), Some(&"Hello World!"));
        assert_eq!(r.generation(), 1);
    }

    #[test]
    fn has_new_value_is_edge_triggered() {
        let r = LockRef::empty();
        assert!(!r.has_new_value());
        r.set(Some(Arc::new(1)));
        assert!(r.has_new_value());
        assert!(!r.has_new_value());
    }

    #[test]
    fn storing_the_same_allocation_is_not_a_change() {
        let shared = Arc::new(7);
        let r = LockRef::from_arc(Some(Arc::clone(&shared)));
        r.set(Some(Arc::clone(&shared)));
        assert!(!r.has_new_value());
        r.set(Some(Arc::new(7)));
        assert!(r.has_new_value());
    }

    #[test]
    fn guard_exposes_value_and_drops_cleanly() {
        let r = LockRef::new(3);
        {
            let guard = r.lock();
            assert!(r.is_locked());
            assert_eq!(guard.value().as_deref(), Some(&3));
        }
        assert!(!r.is_locked());
        assert_eq!(r.get().as_deref(), Some(&3));
    }

    #[test]
    fn readers_only_see_published_values() {
        use std::thread;

        let r = LockRef::new(0_u32);
        thread::scope(|s| {
            let reader = s.spawn(|| {
                let mut last = 0;
                while last < 1_000 {
                    let value = *r.get().unwrap();
                    assert!(value >= last);
                    last = value;
                }
            });
            for next in 1..=1_000 {
                let guard = r.lock();
                assert_eq!(guard.value().as_deref(), Some(&(next - 1)));
                guard.unlock_with(Some(Arc::new(next)));
            }
            reader.join().unwrap();
        });
        assert_eq!(r.generation(), 1_000);
    }
}
