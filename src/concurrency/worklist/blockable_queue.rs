//! A queue whose consumers can be switched between polling and blocking.
//!
//! `BlockableQueue` adds three things to an existing thread-safe queue:
//! - a blocking-mode toggle: in blocking mode an empty `peek`/`poll` parks the caller
//! - a timeout bounding each of those parks (unbounded by default)
//! - [`wakeup`](BlockableQueue::wakeup), which kicks every parked consumer out with
//!   whatever the queue holds (usually nothing) while leaving blocking mode on
//!
//! A blocked call never retries forever: after the park ends (offer, wakeup, timeout or
//! interrupt) it makes exactly one more non-blocking attempt and returns that.

use std::collections::VecDeque;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use crossbeam_queue::{ArrayQueue, SegQueue};
use parking_lot::Mutex;

use crate::concurrency::sync::{deadline_after, Monitor, Wakeable};

/// Sentinel stored in the timeout cell for "no timeout".
const UNBOUNDED: u64 = u64::MAX;

/// A thread-safe queue a [`BlockableQueue`] can wrap.
pub trait SourceQueue<T>: Send + Sync {
    /// Appends `item`; `false` if the queue refused it (for example, because it is full).
    fn offer(&self, item: T) -> bool;

    /// Removes the head element, if any.
    fn poll(&self) -> Option<T>;

    /// Number of queued elements.
    fn len(&self) -> usize;

    /// Returns `true` if nothing is queued.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A [`SourceQueue`] that can show its head element without removing it.
pub trait PeekableQueue<T>: SourceQueue<T> {
    /// Returns a copy of the head element, if any.
    fn peek(&self) -> Option<T>;
}

impl<T: Send> SourceQueue<T> for SegQueue<T> {
    fn offer(&self, item: T) -> bool {
        self.push(item);
        true
    }

    fn poll(&self) -> Option<T> {
        self.pop()
    }

    fn len(&self) -> usize {
        SegQueue::len(self)
    }

    fn is_empty(&self) -> bool {
        SegQueue::is_empty(self)
    }
}

impl<T: Send> SourceQueue<T> for ArrayQueue<T> {
    fn offer(&self, item: T) -> bool {
        self.push(item).is_ok()
    }

    fn poll(&self) -> Option<T> {
        self.pop()
    }

    fn len(&self) -> usize {
        ArrayQueue::len(self)
    }

    fn is_empty(&self) -> bool {
        ArrayQueue::is_empty(self)
    }
}

impl<T: Send> SourceQueue<T> for Mutex<VecDeque<T>> {
    fn offer(&self, item: T) -> bool {
        self.lock().push_back(item);
        true
    }

    fn poll(&self) -> Option<T> {
        self.lock().pop_front()
    }

    fn len(&self) -> usize {
        self.lock().len()
    }
}

impl<T: Send + Clone> PeekableQueue<T> for Mutex<VecDeque<T>> {
    fn peek(&self) -> Option<T> {
        self.lock().front().cloned()
    }
}

/// Configures a [`BlockableQueue`] before it is shared.
pub struct BlockableQueueBuilder<T, Q = SegQueue<T>> {
    source: Q,
    blocking: bool,
    timeout: Option<Duration>,
    _marker: PhantomData<fn(T) -> T>,
}

impl<T, Q: SourceQueue<T>> BlockableQueueBuilder<T, Q> {
    /// Starts in blocking mode when `blocking` is true.
    #[must_use]
    pub fn blocking(mut self, blocking: bool) -> Self {
        self.blocking = blocking;
        self
    }

    /// Bounds each blocking park by `timeout`.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Builds the queue.
    pub fn build(self) -> BlockableQueue<T, Q> {
        let queue = BlockableQueue::with_source(self.source);
        queue.set_blocking(self.blocking);
        if let Some(timeout) = self.timeout {
            queue.set_timeout(timeout);
        }
        queue
    }
}

/// A toggleable blocking/non-blocking wrapper around a [`SourceQueue`].
pub struct BlockableQueue<T, Q = SegQueue<T>> {
    source: Q,
    blocking: AtomicBool,
    timeout_millis: AtomicU64,
    /// Wakeup generation; bumped by [`wakeup`](Self::wakeup).
    monitor: Monitor<u64>,
    _marker: PhantomData<fn(T) -> T>,
}

impl<T: Send> BlockableQueue<T> {
    /// Creates a non-blocking queue over an unbounded lock-free [`SegQueue`].
    pub fn new() -> Self {
        Self::with_source(SegQueue::new())
    }

    /// Starts configuring a queue over a [`SegQueue`].
    pub fn builder() -> BlockableQueueBuilder<T> {
        Self::builder_with_source(SegQueue::new())
    }
}

impl<T: Send> Default for BlockableQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, Q: SourceQueue<T>> BlockableQueue<T, Q> {
    /// Wraps `source` in a non-blocking queue with no timeout.
    pub fn with_source(source: Q) -> Self {
        Self {
            source,
            blocking: AtomicBool::new(false),
            timeout_millis: AtomicU64::new(UNBOUNDED),
            monitor: Monitor::new(0),
            _marker: PhantomData,
        }
    }

    /// Starts configuring a queue over `source`.
    pub fn builder_with_source(source: Q) -> BlockableQueueBuilder<T, Q> {
        BlockableQueueBuilder {
            source,
            blocking: false,
            timeout: None,
            _marker: PhantomData,
        }
    }

    /// Turns blocking mode on or off for subsequent `peek`/`poll` calls.
    pub fn set_blocking(&self, blocking: bool) {
        self.blocking.store(blocking, Ordering::Release);
    }

    /// Returns whether the queue is in blocking mode.
    pub fn is_blocking(&self) -> bool {
        self.blocking.load(Ordering::Acquire)
    }

    /// Bounds each blocking park by `timeout`, rounded up to whole milliseconds. Zero
    /// means no bound.
    pub fn set_timeout(&self, timeout: Duration) {
        let millis = u64::try_from(timeout.as_millis()).unwrap_or(UNBOUNDED - 1);
        // A sub-millisecond bound must not collapse into "no bound".
        let millis = if timeout.is_zero() { 0 } else { millis.max(1) };
        self.timeout_millis.store(millis, Ordering::Release);
    }

    /// Removes the timeout; blocking parks last until an offer or a wakeup.
    pub fn clear_timeout(&self) {
        self.timeout_millis.store(UNBOUNDED, Ordering::Release);
    }

    /// The current timeout, or `None` when unbounded.
    pub fn timeout(&self) -> Option<Duration> {
        match self.timeout_millis.load(Ordering::Acquire) {
            UNBOUNDED => None,
            millis => Some(Duration::from_millis(millis)),
        }
    }

    /// The wrapped queue.
    pub fn source(&self) -> &Q {
        &self.source
    }

    /// Number of queued elements, as reported by the source.
    pub fn len(&self) -> usize {
        self.source.len()
    }

    /// Returns `true` if the source reports nothing queued.
    pub fn is_empty(&self) -> bool {
        self.source.is_empty()
    }

    /// Appends `item` to the source and, in blocking mode, wakes one parked consumer.
    pub fn offer(&self, item: T) -> bool {
        let offered = self.source.offer(item);
        if self.is_blocking() {
            self.monitor.notify_one();
        }
        offered
    }

    /// Forces every consumer currently parked in `peek`/`poll` to return. Blocking mode
    /// stays on for later calls.
    pub fn wakeup(&self) {
        let mut generation = self.monitor.lock();
        *generation = generation.wrapping_add(1);
        generation.notify_all();
    }
}

impl<T, Q: SourceQueue<T>> BlockableQueue<T, Q> {
    /// Removes the head element. In blocking mode an empty queue parks the caller until
    /// an element arrives, a wakeup, the timeout, or an interrupt, and then tries once
    /// more.
    pub fn poll(&self) -> Option<T> {
        self.take_with(|source| source.poll())
    }

    fn take_with(&self, attempt: impl Fn(&Q) -> Option<T>) -> Option<T> {
        let item = attempt(&self.source);
        if item.is_some() || !self.is_blocking() {
            return item;
        }

        let mut generation = self.monitor.lock();
        let item = attempt(&self.source);
        if item.is_some() {
            return item;
        }

        let started = *generation;
        let deadline = self.timeout().and_then(deadline_after);
        while self.source.is_empty() && *generation == started {
            let outcome = generation.wait_until(deadline);
            if outcome.is_interrupted() {
                // Swallowed: the wait already consumed the flag.
                break;
            }
            if outcome.timed_out() {
                tracing::trace!("blockable queue park timed out");
                break;
            }
        }
        drop(generation);

        attempt(&self.source)
    }
}

impl<T, Q: PeekableQueue<T>> BlockableQueue<T, Q> {
    /// Returns a copy of the head element, blocking like [`poll`](Self::poll) when the
    /// queue is empty in blocking mode.
    pub fn peek(&self) -> Option<T> {
        self.take_with(|source| source.peek())
    }
}

impl<T, Q: SourceQueue<T>> Wakeable for BlockableQueue<T, Q> {
    fn awake(&self) {
        self.wakeup();
    }
}

impl<T, Q: SourceQueue<T>> core::fmt::Debug for BlockableQueue<T, Q> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BlockableQueue")
            .field("len", &self.len())
            .field("blocking", &self.is_blocking())
            .field("timeout", &self.timeout())
            .finish()
    }
}
