//! `Notifier` — fan-out of one call to a copy-on-write list of listeners.
//!
//! Registration (`add`/`remove`/`clear`) swaps in a new list, so a dispatch always walks
//! the snapshot that was current when it started and never blocks registration.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use arc_swap::ArcSwap;

/// Multicasts calls to every registered listener.
///
/// `L` is usually a trait object, e.g. `Notifier<dyn Wakeable>`.
pub struct Notifier<L: ?Sized> {
    listeners: ArcSwap<Vec<Arc<L>>>,
}

/// Outcome of one [`Notifier::dispatch`]: every non-empty listener result, in list order,
/// and how many listeners failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatch<R> {
    results: Vec<R>,
    failures: usize,
}

impl<R> Dispatch<R> {
    /// Non-empty results, in the order the listeners were called.
    pub fn results(&self) -> &[R] {
        &self.results
    }

    /// Consumes the dispatch, returning its results.
    pub fn into_results(self) -> Vec<R> {
        self.results
    }

    /// The last non-empty result.
    pub fn last(&self) -> Option<&R> {
        self.results.last()
    }

    /// Consumes the dispatch, returning the last non-empty result.
    pub fn into_last(mut self) -> Option<R> {
        self.results.pop()
    }

    /// Number of listeners that panicked or returned an error.
    pub fn failures(&self) -> usize {
        self.failures
    }
}

impl<L: ?Sized> Notifier<L> {
    /// Creates a notifier with no listeners.
    pub fn new() -> Self {
        Self {
            listeners: ArcSwap::from_pointee(Vec::new()),
        }
    }

    /// Registers `listener` at the end of the list. The same listener may be added twice.
    pub fn add(&self, listener: Arc<L>) {
        self.listeners.rcu(|current| {
            let mut next = Vec::with_capacity(current.len() + 1);
            next.extend(current.iter().cloned());
            next.push(Arc::clone(&listener));
            next
        });
    }

    /// Unregisters the first occurrence of `listener` (by identity). Returns `true` if
    /// it was registered.
    pub fn remove(&self, listener: &Arc<L>) -> bool {
        let mut removed = false;
        self.listeners.rcu(|current| {
            let mut next: Vec<Arc<L>> = current.iter().cloned().collect();
            removed = match next.iter().position(|l| Arc::ptr_eq(l, listener)) {
                Some(index) => {
                    next.remove(index);
                    true
                }
                None => false,
            };
            next
        });
        removed
    }

    /// Unregisters every listener.
    pub fn clear(&self) {
        self.listeners.store(Arc::new(Vec::new()));
    }

    /// Number of registered listeners.
    pub fn len(&self) -> usize {
        self.listeners.load().len()
    }

    /// Returns `true` if no listener is registered.
    pub fn is_empty(&self) -> bool {
        self.listeners.load().is_empty()
    }

    /// Returns `true` if `listener` (by identity) is registered.
    pub fn contains(&self, listener: &Arc<L>) -> bool {
        self.listeners.load().iter().any(|l| Arc::ptr_eq(l, listener))
    }

    /// Snapshot of the registered listeners.
    pub fn listeners(&self) -> Arc<Vec<Arc<L>>> {
        self.listeners.load_full()
    }

    /// Calls `call` on every listener and collects the `Some` results.
    ///
    /// A panicking listener is logged and counted in [`Dispatch::failures`]; the
    /// remaining listeners are still called.
    pub fn dispatch<R, F>(&self, mut call: F) -> Dispatch<R>
    where
        F: FnMut(&L) -> Option<R>,
    {
        self.try_dispatch(|listener| Ok(call(listener)))
    }

    /// Like [`dispatch`](Self::dispatch), for listeners that can fail. Errors are
    /// logged and counted like panics.
    pub fn try_dispatch<R, F>(&self, mut call: F) -> Dispatch<R>
    where
        F: FnMut(&L) -> anyhow::Result<Option<R>>,
    {
        let snapshot = self.listeners.load_full();
        let mut dispatch = Dispatch {
            results: Vec::new(),
            failures: 0,
        };
        for (index, listener) in snapshot.iter().enumerate() {
            match panic::catch_unwind(AssertUnwindSafe(|| call(&**listener))) {
                Ok(Ok(Some(result))) => dispatch.results.push(result),
                Ok(Ok(None)) => {}
                Ok(Err(error)) => {
                    tracing::warn!(listener = index, error = %error, "listener failed");
                    dispatch.failures += 1;
                }
                Err(payload) => {
                    tracing::warn!(
                        listener = index,
                        panic = panic_message(payload.as_ref()),
                        "listener panicked"
                    );
                    dispatch.failures += 1;
                }
            }
        }
        dispatch
    }

    /// Calls `call` on every listener, ignoring results. Returns how many listeners
    /// completed without panicking.
    pub fn broadcast<F>(&self, mut call: F) -> usize
    where
        F: FnMut(&L),
    {
        let mut completed = 0;
        self.dispatch(|listener| {
            call(listener);
            completed += 1;
            None::<()>
        });
        completed
    }
}

impl<L: ?Sized> Default for Notifier<L> {
    fn default() -> Self {
        Self::new()
    }
}

impl<L: ?Sized> core::fmt::Debug for Notifier<L> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Notifier")
            .field("listeners", &self.len())
            .finish()
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "<non-string panic>"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    trait Greeter: Send + Sync {
        fn greet(&self, name: &str) -> Option<String>;
    }

    struct Polite;
    struct Silent;
    struct Broken;

    impl Greeter for Polite {
        fn greet(&self, name: &str) -> Option<String> {
            Some(format!("Hello {name}"))
        }
    }

    impl Greeter for Silent {
        fn greet(&self, _: &str) -> Option<String> {
            None
        }
    }

    impl Greeter for Broken {
        fn greet(&self, _: &str) -> Option<String> {
            panic!("broken greeter")
        }
    }

    #[test]
    fn dispatch_collects_non_empty_results_in_order() {
        let notifier: Notifier<dyn Greeter> = Notifier::new();
        notifier.add(Arc::new(Polite));
        notifier.add(Arc::new(Silent));
        notifier.add(Arc::new(Polite));

        let dispatch = notifier.dispatch(|g| g.greet("Ann"));
        assert_eq!(dispatch.results().len(), 2);
        assert_eq!(dispatch.last().map(String::as_str), Some("Hello Ann"));
        assert_eq!(dispatch.failures(), 0);
    }

    #[test]
    fn panicking_listener_does_not_stop_fan_out() {
        let notifier: Notifier<dyn Greeter> = Notifier::new();
        notifier.add(Arc::new(Broken));
        notifier.add(Arc::new(Polite));

        let dispatch = notifier.dispatch(|g| g.greet("Bo"));
        assert_eq!(dispatch.failures(), 1);
        assert_eq!(dispatch.into_last().as_deref(), Some("Hello Bo"));
    }

    #[test]
    fn try_dispatch_counts_errors() {
        let notifier: Notifier<AtomicUsize> = Notifier::new();
        notifier.add(Arc::new(AtomicUsize::new(0)));
        notifier.add(Arc::new(AtomicUsize::new(5)));

        let dispatch = notifier.try_dispatch(|n| match n.load(Ordering::Relaxed) {
            0 => Err(anyhow::anyhow!("zero")),
            v => Ok(Some(v)),
        });
        assert_eq!(dispatch.results(), &[5]);
        assert_eq!(dispatch.failures(), 1);
    }

    #[test]
    fn remove_is_by_identity() {
        let notifier: Notifier<dyn Greeter> = Notifier::new();
        let a: Arc<dyn Greeter> = Arc::new(Polite);
        let b: Arc<dyn Greeter> = Arc::new(Polite);
        notifier.add(Arc::clone(&a));
        assert!(notifier.contains(&a));
        assert!(!notifier.contains(&b));
        assert!(!notifier.remove(&b));
        assert!(notifier.remove(&a));
        assert!(notifier.is_empty());
    }

    #[test]
    fn broadcast_reports_completed_listeners() {
        let notifier: Notifier<dyn Greeter> = Notifier::new();
        notifier.add(Arc::new(Polite));
        notifier.add(Arc::new(Broken));
        notifier.add(Arc::new(Silent));
        assert_eq!(
            notifier.broadcast(|g| {
                g.greet("Cy");
            }),
            2
        );
        notifier.clear();
        assert_eq!(notifier.len(), 0);
    }
}
