//! Lookup benchmarks for the memoizing caches.
//!
//! Run with: `cargo bench --bench soft_cache`
//!
//! Measures per-lookup latency for hits, for recomputation after
//! reclamation, and for concurrent hits across threads.

use std::collections::hash_map::RandomState;
use std::convert::Infallible;
use std::hint::black_box;
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};

use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use softcache::prelude::*;

const KEYS: u64 = 4_096;
const OPS: u64 = 100_000;
const THREADS: usize = 4;

type Constructor = fn(&u64, ()) -> Result<Option<u64>, Infallible>;

fn square(key: &u64, _: ()) -> Result<Option<u64>, Infallible> {
    Ok(Some(key.wrapping_mul(*key)))
}

fn soft_cache(policy: ReferencePolicy) -> SoftCache<u64, u64, (), Constructor> {
    SoftCache::with_options(
        square as Constructor,
        PolicySource::Fixed(policy),
        16,
        RandomState::new(),
    )
}

// ============================================================================
// Hit Latency (ns/op)
// ============================================================================

fn bench_hit(c: &mut Criterion) {
    let mut group = c.benchmark_group("hit_ns");
    group.throughput(Throughput::Elements(OPS));

    for policy in [ReferencePolicy::Soft, ReferencePolicy::Strong] {
        group.bench_function(format!("soft_cache_{policy}"), |b| {
            b.iter_custom(|iters| {
                let cache = soft_cache(policy);
                let pinned: Vec<_> = (0..KEYS)
                    .map(|key| cache.get_instance(&key, ()).unwrap())
                    .collect();
                let start = Instant::now();
                for _ in 0..iters {
                    for i in 0..OPS {
                        black_box(cache.get_instance(&(i % KEYS), ()).unwrap());
                    }
                }
                let elapsed = start.elapsed();
                drop(pinned);
                elapsed
            })
        });
    }

    group.bench_function("strong_cache", |b| {
        b.iter_custom(|iters| {
            let cache = StrongCache::new(square as Constructor);
            for key in 0..KEYS {
                black_box(cache.get_instance(&key, ()).unwrap());
            }
            let start = Instant::now();
            for _ in 0..iters {
                for i in 0..OPS {
                    black_box(cache.get_instance(&(i % KEYS), ()).unwrap());
                }
            }
            start.elapsed()
        })
    });

    group.finish();
}

// ============================================================================
// Recompute Latency (ns/op)
// ============================================================================

fn bench_recompute(c: &mut Criterion) {
    let mut group = c.benchmark_group("recompute_ns");
    group.throughput(Throughput::Elements(KEYS));

    group.bench_function("after_reclaim", |b| {
        b.iter_custom(|iters| {
            let cache = soft_cache(ReferencePolicy::Soft);
            for key in 0..KEYS {
                black_box(cache.get_instance(&key, ()).unwrap());
            }
            let mut total = Duration::ZERO;
            for _ in 0..iters {
                reclaim_soft_references();
                let start = Instant::now();
                for key in 0..KEYS {
                    black_box(cache.get_instance(&key, ()).unwrap());
                }
                total += start.elapsed();
            }
            total
        })
    });

    group.bench_function("weak_dropped", |b| {
        b.iter_custom(|iters| {
            let cache = soft_cache(ReferencePolicy::Weak);
            let start = Instant::now();
            for _ in 0..iters {
                for key in 0..KEYS {
                    black_box(cache.get_instance(&key, ()).unwrap());
                }
            }
            start.elapsed()
        })
    });

    group.finish();
}

// ============================================================================
// Concurrent Hits
// ============================================================================

fn bench_concurrent_hit(c: &mut Criterion) {
    let mut group = c.benchmark_group("concurrent_hit");
    group.throughput(Throughput::Elements(OPS * THREADS as u64));

    group.bench_function(format!("soft_cache_{THREADS}_threads"), |b| {
        b.iter_custom(|iters| {
            let cache = Arc::new(soft_cache(ReferencePolicy::Strong));
            for key in 0..KEYS {
                black_box(cache.get_instance(&key, ()).unwrap());
            }
            let barrier = Arc::new(Barrier::new(THREADS + 1));
            let handles: Vec<_> = (0..THREADS)
                .map(|tid| {
                    let cache = Arc::clone(&cache);
                    let barrier = Arc::clone(&barrier);
                    thread::spawn(move || {
                        barrier.wait();
                        for _ in 0..iters {
                            for i in 0..OPS {
                                let key = (i + tid as u64 * 977) % KEYS;
                                black_box(cache.get_instance(&key, ()).unwrap());
                            }
                        }
                    })
                })
                .collect();
            barrier.wait();
            let start = Instant::now();
            for handle in handles {
                handle.join().unwrap();
            }
            start.elapsed()
        })
    });

    group.finish();
}

criterion_group!(benches, bench_hit, bench_recompute, bench_concurrent_hit);
criterion_main!(benches);
