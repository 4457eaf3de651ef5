// ==============================================
// VALUE CACHE CONCURRENCY TESTS (integration)
// ==============================================
//
// `clear` racing readers and writers: every read sees either nothing or the
// value stored for that key, and nothing panics.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

use softcache::prelude::*;

fn stored(key: u32) -> String {
    format!("stored-{key}")
}

// ==============================================
// Clear Against Readers And Writers
// ==============================================

mod clear_races {
    use super::*;

    #[test]
    fn clear_is_safe_against_concurrent_get_and_put() {
        let readers = 4;
        let writers = 2;
        let rounds = 2_000;
        let cache: Arc<ValueCache<u32, String>> =
            Arc::new(ValueCache::with_policy(ReferencePolicy::Strong));
        let barrier = Arc::new(Barrier::new(readers + writers + 1));
        let done = Arc::new(AtomicBool::new(false));

        let mut handles = Vec::new();
        for tid in 0..writers {
            let cache = Arc::clone(&cache);
            let barrier = Arc::clone(&barrier);
            handles.push(thread::spawn(move || {
                barrier.wait();
                for round in 0..rounds {
                    let key = ((round * writers + tid) % 128) as u32;
                    cache.put(key, stored(key));
                }
            }));
        }
        for _ in 0..readers {
            let cache = Arc::clone(&cache);
            let barrier = Arc::clone(&barrier);
            handles.push(thread::spawn(move || {
                barrier.wait();
                for round in 0..rounds {
                    let key = (round % 128) as u32;
                    if let Some(value) = cache.get(&key) {
                        assert_eq!(*value, stored(key));
                    }
                }
            }));
        }
        let clearer = {
            let cache = Arc::clone(&cache);
            let done = Arc::clone(&done);
            thread::spawn(move || {
                let mut clears = 0_usize;
                while !done.load(Ordering::Relaxed) {
                    cache.clear();
                    clears += 1;
                    thread::yield_now();
                }
                clears
            })
        };

        barrier.wait();
        for handle in handles {
            handle.join().unwrap();
        }
        done.store(true, Ordering::Relaxed);
        assert!(clearer.join().unwrap() > 0);

        cache.clear();
        assert_eq!(cache.len(), 0);
        assert!(cache.is_empty());
        assert!((0..128).all(|key| cache.get(&key).is_none()));
    }

    #[test]
    fn values_read_before_clear_stay_usable() {
        let threads = 4;
        let cache: Arc<ValueCache<u32, Vec<u32>>> =
            Arc::new(ValueCache::with_policy(ReferencePolicy::Soft));
        let values: Vec<_> = (0..64_u32).map(|key| vec![key; 8]).collect();
        for (key, value) in values.iter().enumerate() {
            cache.put(key as u32, value.clone());
        }
        let barrier = Arc::new(Barrier::new(threads + 1));

        let handles: Vec<_> = (0..threads)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    let held: Vec<_> = (0..64_u32).filter_map(|key| cache.get(&key)).collect();
                    barrier.wait();
                    // The clear happens here.
                    barrier.wait();
                    held.iter()
                        .all(|value| value.len() == 8 && value.iter().all(|x| *x == value[0]))
                })
            })
            .collect();

        barrier.wait();
        cache.clear();
        barrier.wait();

        for handle in handles {
            assert!(handle.join().unwrap());
        }
        assert!(cache.is_empty());
    }
}
