use std::collections::VecDeque;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_queue::ArrayQueue;
use parking_lot::Mutex;
use tether::{BlockableQueue, Gate, Signal};

#[test]
fn blocking_poll_times_out_empty() {
    let queue: BlockableQueue<u32> = BlockableQueue::builder()
        .blocking(true)
        .timeout(Duration::from_millis(100))
        .build();

    let start = Instant::now();
    assert_eq!(queue.poll(), None);
    let waited = start.elapsed();
    assert!(waited >= Duration::from_millis(100), "returned after {waited:?}");
    assert!(waited < Duration::from_secs(2), "returned after {waited:?}");
}

#[test]
fn non_blocking_poll_returns_immediately() {
    let queue: BlockableQueue<u32> = BlockableQueue::new();
    assert!(!queue.is_blocking());
    let start = Instant::now();
    assert_eq!(queue.poll(), None);
    assert!(start.elapsed() < Duration::from_millis(50));
}

#[test]
fn offer_wakes_a_blocked_consumer() {
    let queue: Arc<BlockableQueue<&'static str>> = Arc::new(BlockableQueue::builder().blocking(true).build());
    let consumer = {
        let queue = Arc::clone(&queue);
        thread::spawn(move || queue.poll())
    };
    thread::sleep(Duration::from_millis(50));
    assert!(queue.offer("job"));
    assert_eq!(consumer.join().unwrap(), Some("job"));
    assert!(queue.is_empty());
}

#[test]
fn wakeup_releases_consumers_but_keeps_blocking_mode() {
    let queue: BlockableQueue<u32> = BlockableQueue::builder().blocking(true).build();
    thread::scope(|s| {
        let consumers: Vec<_> = (0..3).map(|_| s.spawn(|| queue.poll())).collect();
        while consumers.iter().any(|c| !c.is_finished()) {
            thread::sleep(Duration::from_millis(10));
            queue.wakeup();
        }
        for consumer in consumers {
            assert_eq!(consumer.join().unwrap(), None);
        }
    });
    assert!(queue.is_blocking());
}

#[test]
fn peek_blocks_on_a_mutex_deque() {
    let queue = BlockableQueue::builder_with_source(Mutex::new(VecDeque::new()))
        .blocking(true)
        .timeout(Duration::from_secs(5))
        .build();
    thread::scope(|s| {
        let peeker = s.spawn(|| queue.peek());
        thread::sleep(Duration::from_millis(30));
        queue.offer(7_u64);
        assert_eq!(peeker.join().unwrap(), Some(7));
    });
    assert_eq!(queue.len(), 1);
    assert_eq!(queue.poll(), Some(7));
}

#[test]
fn bounded_source_rejects_when_full() {
    let queue = BlockableQueue::with_source(ArrayQueue::new(2));
    assert!(queue.offer(1));
    assert!(queue.offer(2));
    assert!(!queue.offer(3));
    assert_eq!(queue.source().capacity(), 2);
    assert_eq!(queue.poll(), Some(1));
}

#[test]
fn gate_opened_after_200ms_releases_acquirer() {
    let gate = Arc::new(Gate::new());
    let waiter = {
        let gate = Arc::clone(&gate);
        thread::spawn(move || {
            let got = gate.acquire().is_some();
            (got, Instant::now())
        })
    };

    thread::sleep(Duration::from_millis(200));
    let opened = Instant::now();
    gate.open();

    let (got, released) = waiter.join().unwrap();
    assert!(got);
    assert!(released.duration_since(opened) < Duration::from_secs(1));
}

#[test]
fn signal_sends_equal_receives_across_threads() {
    let signal = Signal::new();
    let received = std::sync::atomic::AtomicUsize::new(0);
    thread::scope(|s| {
        for _ in 0..4 {
            s.spawn(|| {
                for _ in 0..1000 {
                    signal.send();
                }
            });
        }
        s.spawn(|| {
            for _ in 0..100 {
                received.fetch_add(signal.receive(), std::sync::atomic::Ordering::Relaxed);
                thread::yield_now();
            }
        });
    });
    let total = received.into_inner() + signal.receive();
    assert_eq!(total, 4000);
    assert_eq!(signal.pending(), 0);
}
