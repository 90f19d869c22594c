//! Lock-free atomic building blocks.
//!
//! These types never block: every operation is a handful of hardware atomic RMW
//! instructions. Results that summarize shared state (pending counts and the like) are
//! stale the moment they return.

/// Edge-triggered signal counter.
pub mod signal;

pub use signal::Signal;
