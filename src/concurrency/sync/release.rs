//! `Release` — drives a group of blocked threads out of their blocking sections.
//!
//! Blocker threads bracket each potentially blocking call with [`Release::enter`] and
//! [`Release::exit`] (or hold a [`ReleaseSection`]), and register the primitives they
//! block on as [`Wakeable`]s in [`Release::blockers`]. A controller then calls
//! [`lock`](Release::lock) to stop new entries and [`awake`](Release::awake) to wake
//! the registered primitives until every blocker has left.

use std::time::Duration;

use super::interrupt;
use super::monitor::Monitor;
use super::notifier::Notifier;
use crate::concurrency::traits::Wakeable;

/// Longest time [`Release::awake`] waits for an exit before waking the blockers again.
pub const AWAKE_POLL_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Debug, Default)]
struct ReleaseState {
    locked: bool,
    holds: usize,
}

/// Quiescence coordinator between one controller and any number of blocker threads.
#[derive(Default)]
pub struct Release {
    state: Monitor<ReleaseState>,
    blockers: Notifier<dyn Wakeable>,
}

impl Release {
    /// Creates an unlocked release with no blockers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enters a blocking section. Returns `false`, admitting nothing, while locked.
    ///
    /// Every successful `enter` must be paired with one [`exit`](Self::exit).
    pub fn enter(&self) -> bool {
        let mut state = self.state.lock();
        if state.locked {
            return false;
        }
        state.holds += 1;
        true
    }

    /// Leaves a blocking section and tells a pending [`awake`](Self::awake) about it.
    pub fn exit(&self) {
        let mut state = self.state.lock();
        debug_assert!(state.holds > 0, "exit without matching enter");
        state.holds = state.holds.saturating_sub(1);
        state.notify_all();
    }

    /// Enters a blocking section that is left when the returned guard drops. `None`
    /// while locked.
    pub fn section(&self) -> Option<ReleaseSection<'_>> {
        self.enter().then_some(ReleaseSection { release: self })
    }

    /// Stops admitting new blockers.
    pub fn lock(&self) {
        self.state.lock().locked = true;
        tracing::debug!("release locked");
    }

    /// Admits blockers again.
    pub fn unlock(&self) {
        self.state.lock().locked = false;
        tracing::debug!("release unlocked");
    }

    /// Returns `true` while new blockers are turned away.
    pub fn is_locked(&self) -> bool {
        self.state.lock().locked
    }

    /// Number of blockers currently inside their blocking section.
    pub fn holds(&self) -> usize {
        self.state.lock().holds
    }

    /// The primitives woken by [`awake`](Self::awake).
    pub fn blockers(&self) -> &Notifier<dyn Wakeable> {
        &self.blockers
    }

    /// Wakes every registered blocker, over and over, until no thread holds a section.
    ///
    /// Call after [`lock`](Self::lock), otherwise new blockers may keep this looping.
    /// Interrupts do not end the loop; one received meanwhile is re-raised on return.
    pub fn awake(&self) {
        let mut interrupted = false;
        let mut rounds = 0_u64;
        loop {
            let holds = self.holds();
            if holds == 0 {
                break;
            }
            rounds += 1;
            tracing::trace!(holds, round = rounds, "waking blockers");
            self.blockers.broadcast(|blocker| blocker.awake());

            let mut state = self.state.lock();
            if state.holds > 0 && state.wait_for(AWAKE_POLL_INTERVAL).is_interrupted() {
                interrupted = true;
            }
        }
        tracing::debug!(rounds, "release quiescent");
        if interrupted {
            interrupt::reassert();
        }
    }
}

impl core::fmt::Debug for Release {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("Release")
            .field("locked", &state.locked)
            .field("holds", &state.holds)
            .field("blockers", &self.blockers.len())
            .finish()
    }
}

/// A blocking section of a [`Release`]; calls [`Release::exit`] on drop.
#[must_use = "dropping the section exits it immediately"]
#[derive(Debug)]
pub struct ReleaseSection<'a> {
    release: &'a Release,
}

impl Drop for ReleaseSection<'_> {
    fn drop(&mut self) {
        self.release.exit();
    }
}
