//! A lock-free Treiber stack of owned elements.
//!
//! This is the classic MPMC stack:
//! - `head` is an atomic pointer to the top node (or null)
//! - every node owns one element and a link to the node below it
//!
//! `push` and `pop` are linearizable with respect to each other. `peek` and `len` only
//! describe the instant they read `head`; by the time they return the stack may already
//! look different.
//!
//! Memory model:
//! - A popped node may still be read by a thread that loaded it just before the pop won
//!   its CAS, so nodes are retired through `crossbeam-epoch` and freed only once every
//!   pinned thread has moved on. This also rules out ABA on `head`.

use core::mem::ManuallyDrop;
use core::ptr;
use core::sync::atomic::Ordering;

use crossbeam_epoch::{self as epoch, Atomic, Owned, Shared};
use crossbeam_utils::Backoff;

struct Node<T> {
    element: ManuallyDrop<T>,
    next: Atomic<Node<T>>,
}

/// An unbounded lock-free LIFO stack.
pub struct AtomicStack<T> {
    head: Atomic<Node<T>>,
}

impl<T> AtomicStack<T> {
    /// Creates an empty stack.
    pub fn new() -> Self {
        Self {
            head: Atomic::null(),
        }
    }

    /// Pushes `element` on top of the stack.
    pub fn push(&self, element: T) {
        let mut node = Owned::new(Node {
            element: ManuallyDrop::new(element),
            next: Atomic::null(),
        });
        let guard = epoch::pin();
        let backoff = Backoff::new();

        loop {
            let head = self.head.load(Ordering::Acquire, &guard);
            node.next.store(head, Ordering::Relaxed);
            match self
                .head
                .compare_exchange(head, node, Ordering::AcqRel, Ordering::Acquire, &guard)
            {
                Ok(_) => return,
                Err(e) => {
                    node = e.new;
                    backoff.spin();
                }
            }
        }
    }

    /// Pops the top element, if any.
    pub fn pop(&self) -> Option<T> {
        let guard = epoch::pin();
        let backoff = Backoff::new();

        loop {
            let head = self.head.load(Ordering::Acquire, &guard);
            // SAFETY: `head` was loaded under `guard`, so it is not reclaimed before the
            // guard is dropped.
            let top = unsafe { head.as_ref() }?;
            let next = top.next.load(Ordering::Acquire, &guard);

            if self
                .head
                .compare_exchange(head, next, Ordering::AcqRel, Ordering::Acquire, &guard)
                .is_ok()
            {
                // SAFETY: the successful CAS unlinked `head`; no other thread can take its
                // element. Destruction is deferred until no pinned thread can observe it,
                // and `ManuallyDrop` keeps the deferred free from dropping the element.
                unsafe {
                    let element = ptr::read(&*top.element);
                    guard.defer_destroy(head);
                    return Some(element);
                }
            }
            backoff.spin();
        }
    }

    /// Returns `true` if the stack looked empty at the instant of the read.
    pub fn is_empty(&self) -> bool {
        let guard = epoch::pin();
        self.head.load(Ordering::Acquire, &guard).is_null()
    }

    /// Approximate number of elements, counted by walking the stack.
    ///
    /// If this returns `n`, all `n` elements may already have been popped by the time the
    /// caller looks at it.
    pub fn len(&self) -> usize {
        let guard = epoch::pin();
        let mut count = 0;
        let mut current = self.head.load(Ordering::Acquire, &guard);
        // SAFETY: every node reached from `head` is protected by `guard`.
        while let Some(node) = unsafe { current.as_ref() } {
            count += 1;
            current = node.next.load(Ordering::Acquire, &guard);
        }
        count
    }
}

impl<T: Copy> AtomicStack<T> {
    /// Returns a copy of the top element. It may already have been popped, or buried
    /// under newer pushes, by the time this returns.
    ///
    /// Limited to `Copy` elements: a popped element is moved out bitwise and its new
    /// owner may free whatever it points to while a peeker is still reading the node.
    pub fn peek(&self) -> Option<T> {
        let guard = epoch::pin();
        let head: Shared<'_, Node<T>> = self.head.load(Ordering::Acquire, &guard);
        // SAFETY: `head` is protected by `guard`, and a `Copy` element owns no resources
        // that its popper could release.
        unsafe { head.as_ref() }.map(|node| *node.element)
    }
}

impl<T> Default for AtomicStack<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for AtomicStack<T> {
    fn drop(&mut self) {
        while self.pop().is_some() {}
    }
}

impl<T> core::fmt::Debug for AtomicStack<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AtomicStack")
            .field("len", &self.len())
            .finish()
    }
}
