//! Thread-coordination primitives.
//!
//! - [`atomic`]: lock-free counters.
//! - [`worklist`]: a lock-free stack and a queue with an optional blocking mode.
//! - [`state`]: state machines threads can wait on.
//! - [`sync`]: monitor-based latches, references and the release coordinator.

pub mod atomic;
pub mod state;
pub mod sync;
pub mod traits;
pub mod worklist;

pub use traits::{Ref, Wakeable};
