//! Blocking primitives built on one [`Monitor`] per instance.
//!
//! Every wait here can be cut short through [`interrupt`], and the primitives that
//! implement [`Wakeable`] can be forced out of a wait by a [`Release`].

pub mod gate;
pub mod interrupt;
pub mod lock_ref;
mod monitor;
pub mod non_null_ref;
pub mod notifier;
pub mod release;

pub use gate::Gate;
pub use interrupt::Interrupter;
pub use lock_ref::{LockRef, LockRefGuard};
pub use monitor::{Monitor, MonitorGuard, WaitOutcome};
pub use non_null_ref::NonNullRef;
pub use notifier::{Dispatch, Notifier};
pub use release::{Release, ReleaseSection, AWAKE_POLL_INTERVAL};

pub use super::traits::{Ref, Wakeable};

pub(crate) use monitor::{deadline_after, expired};
