//! # `tether` - Thread-Coordination Primitives
//!
//! Small, independent building blocks for coordinating OS threads: a lock-free stack, a
//! lock-striped multiset, a write-biased reference cell, wait/notify state machines, a
//! latch, an edge-triggered counter, a multicast container and a quiescence
//! coordinator.
//!
//! ## Blocking and interruption
//!
//! Every blocking call parks on a monitor owned by the primitive itself; no lock is
//! shared between instances. Waits that take a timeout treat a zero duration as
//! "no limit" and report expiry through their return value, never by panicking.
//!
//! Threads cannot be interrupted from outside in Rust, so waits honour a cooperative
//! per-thread flag instead ([`concurrency::sync::interrupt`]). An interrupted wait
//! returns early with a non-matching result. Most primitives leave the flag set for the
//! caller; [`BlockableQueue`] and [`Release`] swallow it.
//!
//! ## Forcing threads out
//!
//! Primitives implementing [`Wakeable`] can release their current waiters on demand.
//! A [`Release`] keeps a [`Notifier`] of such primitives and wakes them repeatedly
//! until every thread has left its blocking section.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use std::thread;
//! use tether::Gate;
//!
//! let gate = Arc::new(Gate::with("ready"));
//! let waiter = {
//!     let gate = Arc::clone(&gate);
//!     thread::spawn(move || gate.acquire().copied())
//! };
//! gate.open();
//! assert_eq!(waiter.join().unwrap(), Some("ready"));
//! ```

#![warn(missing_docs, clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod collections;
pub mod concurrency;

pub use collections::ConcurrentSet;
pub use concurrency::atomic::Signal;
pub use concurrency::state::{BitState, EnumState, FlagIndexError, Flags, StateFlag};
pub use concurrency::sync::{
    interrupt, Dispatch, Gate, LockRef, NonNullRef, Notifier, Release, WaitOutcome,
};
pub use concurrency::traits::{Ref, Wakeable};
pub use concurrency::worklist::{AtomicStack, BlockableQueue};

// `Signal` must occupy exactly one padded cache line.
const _: () = {
    use core::mem;

    assert!(mem::size_of::<Signal>() == mem::align_of::<Signal>());
};
