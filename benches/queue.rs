//! Throughput benchmarks for the lock-free MPMC queue (C3).

use std::sync::Arc;
use std::thread;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use veloz_core::LockFreeQueue;

fn bench_single_threaded_push_pop(c: &mut Criterion) {
    c.bench_function("queue_single_threaded_push_pop", |b| {
        let queue: LockFreeQueue<u64> = LockFreeQueue::new();
        b.iter(|| {
            queue.push(black_box(1));
            black_box(queue.pop());
        });
    });
}

fn bench_mpmc_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("queue_mpmc_throughput");
    for producers in [1usize, 2, 4, 8] {
        group.bench_with_input(
            BenchmarkId::from_parameter(producers),
            &producers,
            |b, &producers| {
                b.iter(|| {
                    let queue: Arc<LockFreeQueue<u64>> = Arc::new(LockFreeQueue::new());
                    const PER_PRODUCER: u64 = 1_000;

                    let handles: Vec<_> = (0..producers)
                        .map(|_| {
                            let queue = Arc::clone(&queue);
                            thread::spawn(move || {
                                for i in 0..PER_PRODUCER {
                                    queue.push(i);
                                }
                            })
                        })
                        .collect();
                    for handle in handles {
                        handle.join().unwrap();
                    }

                    let mut drained = 0u64;
                    while queue.pop().is_some() {
                        drained += 1;
                    }
                    black_box(drained);
                });
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_single_threaded_push_pop, bench_mpmc_throughput);
criterion_main!(benches);
