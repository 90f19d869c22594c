//! Concurrent worklists: a lock-free stack and a blockable queue.

/// Lock-free Treiber stack.
pub mod atomic_stack;
/// Queue wrapper with a blocking-mode toggle.
pub mod blockable_queue;

pub use atomic_stack::AtomicStack;
pub use blockable_queue::{BlockableQueue, BlockableQueueBuilder, PeekableQueue, SourceQueue};
