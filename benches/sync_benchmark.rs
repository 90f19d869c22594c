use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::collections::HashSet;
use std::sync::Mutex;
use std::thread;
use tether::{AtomicStack, BlockableQueue, ConcurrentSet, LockRef};

const THREADS: usize = 4;
const ITEMS: usize = 1000;

fn bench_stack(c: &mut Criterion) {
    let mut group = c.benchmark_group("stack_push_pop");

    group.bench_function("std_mutex_vec", |b| {
        b.iter(|| {
            let stack = Mutex::new(Vec::new());
            let stack = &stack;
            thread::scope(|s| {
                for t in 0..THREADS {
                    s.spawn(move || {
                        for i in 0..ITEMS {
                            stack.lock().unwrap().push(t * ITEMS + i);
                            black_box(stack.lock().unwrap().pop());
                        }
                    });
                }
            });
        })
    });

    group.bench_function("atomic_stack", |b| {
        b.iter(|| {
            let stack = AtomicStack::new();
            let stack = &stack;
            thread::scope(|s| {
                for t in 0..THREADS {
                    s.spawn(move || {
                        for i in 0..ITEMS {
                            stack.push(t * ITEMS + i);
                            black_box(stack.pop());
                        }
                    });
                }
            });
        })
    });

    group.finish();
}

fn bench_set(c: &mut Criterion) {
    let mut group = c.benchmark_group("set_add_contains");

    group.bench_function("std_mutex_hash_set", |b| {
        b.iter(|| {
            let set = Mutex::new(HashSet::new());
            let set = &set;
            thread::scope(|s| {
                for t in 0..THREADS {
                    s.spawn(move || {
                        for i in 0..ITEMS {
                            set.lock().unwrap().insert(t * ITEMS + i);
                            black_box(set.lock().unwrap().contains(&i));
                        }
                    });
                }
            });
        })
    });

    group.bench_function("concurrent_set", |b| {
        b.iter(|| {
            let set = ConcurrentSet::with_table_size(64);
            let set = &set;
            thread::scope(|s| {
                for t in 0..THREADS {
                    s.spawn(move || {
                        for i in 0..ITEMS {
                            set.add(t * ITEMS + i);
                            black_box(set.contains(&i));
                        }
                    });
                }
            });
        })
    });

    group.finish();
}

fn bench_reads(c: &mut Criterion) {
    let mut group = c.benchmark_group("uncontended_reads");

    let lock_ref = LockRef::new(42_u64);
    group.bench_function("lock_ref_get", |b| b.iter(|| black_box(lock_ref.get())));

    let queue: BlockableQueue<u64> = BlockableQueue::new();
    group.bench_function("blockable_queue_offer_poll", |b| {
        b.iter(|| {
            queue.offer(black_box(1));
            black_box(queue.poll())
        })
    });

    group.finish();
}

criterion_group!(benches, bench_stack, bench_set, bench_reads);
criterion_main!(benches);
