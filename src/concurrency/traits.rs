//! Capabilities shared by several primitives.

use std::sync::Arc;

/// A primitive that can be forced out of a blocking wait.
///
/// [`Release`](crate::concurrency::sync::Release) calls [`awake`](Wakeable::awake) on
/// every registered blocker until all of them have left their blocking sections.
pub trait Wakeable: Send + Sync {
    /// Wakes every thread currently parked on `self`. Does not change any state the
    /// waiters are waiting for.
    fn awake(&self);
}

impl<W: Wakeable + ?Sized> Wakeable for Arc<W> {
    fn awake(&self) {
        (**self).awake();
    }
}

impl<W: Wakeable + ?Sized> Wakeable for &W {
    fn awake(&self) {
        (**self).awake();
    }
}

/// A shared reference to a value that may be absent.
///
/// Implemented by [`LockRef`](crate::concurrency::sync::LockRef) and
/// [`NonNullRef`](crate::concurrency::sync::NonNullRef) so callers can treat them alike.
pub trait Ref<T: ?Sized> {
    /// Returns the current value.
    fn get(&self) -> Option<Arc<T>>;

    /// Replaces the current value.
    fn set(&self, value: Option<Arc<T>>);
}
