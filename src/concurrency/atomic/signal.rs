//! Edge-triggered signal counter.

use core::sync::atomic::{AtomicUsize, Ordering};

use crossbeam_utils::CachePadded;

/// Lets threads tell each other "something happened" without passing data.
///
/// [`send`](Signal::send) bumps a counter of unreceived signals;
/// [`receive`](Signal::receive) takes whatever has accumulated. Signals sent while a
/// receive is in progress are never lost; they stay pending for the next receive.
/// Any thread may send or receive.
#[derive(Default)]
pub struct Signal {
    signals: CachePadded<AtomicUsize>,
}

impl Signal {
    /// Creates a signal with nothing pending.
    pub const fn new() -> Self {
        Self {
            signals: CachePadded::new(AtomicUsize::new(0)),
        }
    }

    /// Sends one signal and returns how many were pending before it.
    #[inline]
    pub fn send(&self) -> usize {
        self.signals.fetch_add(1, Ordering::AcqRel)
    }

    /// Receives every pending signal and returns how many there were.
    ///
    /// Takes the count in one atomic step, so concurrent receivers never claim the same
    /// signal and a `send` that lands afterwards stays pending for the next call.
    #[inline]
    pub fn receive(&self) -> usize {
        self.signals.swap(0, Ordering::AcqRel)
    }

    /// Receives every pending signal; `true` if there was at least one.
    #[inline]
    pub fn received(&self) -> bool {
        self.receive() > 0
    }

    /// Number of signals sent and not yet received. Stale as soon as it returns.
    #[inline]
    pub fn pending(&self) -> usize {
        self.signals.load(Ordering::Acquire)
    }
}

impl core::fmt::Debug for Signal {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Signal")
            .field("pending", &self.pending())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Barrier;
    use std::thread;

    #[test]
    fn send_returns_pre_increment_count() {
        let signal = Signal::new();
        assert_eq!(signal.send(), 0);
        assert_eq!(signal.send(), 1);
        assert_eq!(signal.send(), 2);
        assert_eq!(signal.receive(), 3);
        assert_eq!(signal.pending(), 0);
        assert!(!signal.received());
    }

    #[test]
    fn concurrent_sends_are_never_lost() {
        const SENDERS: usize = 4;
        const PER_SENDER: usize = 10_000;

        let signal = Signal::new();
        let mut received = 0;
        thread::scope(|s| {
            for _ in 0..SENDERS {
                s.spawn(|| {
                    for _ in 0..PER_SENDER {
                        signal.send();
                    }
                });
            }
            while received < SENDERS * PER_SENDER / 2 {
                received += signal.receive();
            }
        });
        received += signal.receive();
        assert_eq!(received, SENDERS * PER_SENDER);
    }

    #[test]
    fn concurrent_receivers_split_the_sends() {
        const RECEIVERS: usize = 6;
        const SENDS: usize = 20_000;

        let signal = Signal::new();
        let barrier = Barrier::new(RECEIVERS + 1);
        let total = thread::scope(|s| {
            let receivers: Vec<_> = (0..RECEIVERS)
                .map(|_| {
                    s.spawn(|| {
                        barrier.wait();
                        let mut got = 0;
                        for _ in 0..SENDS {
                            got += signal.receive();
                        }
                        got
                    })
                })
                .collect();
            barrier.wait();
            for _ in 0..SENDS {
                signal.send();
            }
            receivers
                .into_iter()
                .map(|r| r.join().unwrap())
                .sum::<usize>()
        });
        assert_eq!(total + signal.receive(), SENDS);
        assert_eq!(signal.pending(), 0);
    }
}
