//! Concurrent collections.
//!
//! - `concurrent_set`: a lock-striped hash multiset

pub mod concurrent_set;

pub use concurrent_set::{ConcurrentSet, Contains, DEFAULT_TABLE_SIZE};
