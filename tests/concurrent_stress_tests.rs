//! Concurrent stress tests for high-contention scenarios
//! Tests focused on thread safety, exclusive hand-out and trimming under load

use std::{
    collections::HashSet,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Barrier,
    },
    thread,
    time::Duration,
};

use arraypool::{ArrayPool, ArrayPoolConfig, ReturnPolicy};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[cfg(test)]
mod concurrent_stress_tests {
    use super::*;

    /// Test: M renters on an empty pool get M distinct buffers
    #[test]
    fn stress_concurrent_renters_get_distinct_buffers() {
        init_logging();
        let pool = Arc::new(ArrayPool::<u32>::with_defaults());
        let thread_count = 16;
        let barrier = Arc::new(Barrier::new(thread_count));

        let handles: Vec<_> = (0..thread_count)
            .map(|_| {
                let pool = pool.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait(); // Synchronized start for maximum contention
                    pool.rent_exactly(300, false).unwrap()
                })
            })
            .collect();

        let arrays: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let ids: HashSet<_> = arrays.iter().map(|a| a.id().unwrap()).collect();
        assert_eq!(ids.len(), thread_count);
        assert!(arrays.iter().all(|a| a.len() == 300));

        // One bucket no matter how many threads raced to create it
        assert_eq!(pool.bucket_count(), 1);
        assert_eq!(pool.bucket_stats()[0].rented, thread_count);
        assert_eq!(pool.bucket_stats()[0].current_peak, thread_count);
    }

    /// Test: no buffer is ever handed to two renters at once
    #[test]
    fn stress_exclusive_handout_with_background_trim() {
        init_logging();
        let config = ArrayPoolConfig::new("stress")
            .with_maintenance_interval(Duration::from_millis(1))
            .with_return_policy(ReturnPolicy::strict());
        let pool = Arc::new(ArrayPool::<usize>::new(config).unwrap());

        let thread_count = 8;
        let iterations = 2000;
        let barrier = Arc::new(Barrier::new(thread_count));
        let corruption = Arc::new(AtomicBool::new(false));

        let handles: Vec<_> = (0..thread_count)
            .map(|thread_id| {
                let pool = pool.clone();
                let barrier = barrier.clone();
                let corruption = corruption.clone();
                thread::spawn(move || {
                    barrier.wait();
                    for i in 0..iterations {
                        let len = [16usize, 64, 100][i % 3];
                        let array = pool.rent_exactly(len, false).unwrap();

                        array.write().fill(thread_id);
                        thread::yield_now();
                        if array.read().iter().any(|&v| v != thread_id) {
                            corruption.store(true, Ordering::Relaxed);
                        }

                        pool.return_array(array).unwrap();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert!(!corruption.load(Ordering::Relaxed));
        assert_eq!(pool.total_used_bytes(), 0);

        let stats = pool.stats();
        assert_eq!(stats.rents, (thread_count * iterations) as u64);
        assert_eq!(stats.returns, stats.rents);
        assert_eq!(stats.misuse_failures, 0);
        assert_eq!(stats.ignored_returns, 0);
    }

    /// Test: manual ticks racing with renters never reclaim rented buffers
    #[test]
    fn stress_manual_ticks_during_rentals() {
        init_logging();
        let pool = Arc::new(ArrayPool::<u8>::with_defaults());
        let renters = 6;
        let running = Arc::new(AtomicBool::new(true));
        let barrier = Arc::new(Barrier::new(renters + 2));
        let completed = Arc::new(AtomicUsize::new(0));

        let tickers: Vec<_> = (0..2)
            .map(|_| {
                let pool = pool.clone();
                let running = running.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    while running.load(Ordering::Relaxed) {
                        pool.process_pending_work();
                        thread::yield_now();
                    }
                })
            })
            .collect();

        let handles: Vec<_> = (0..renters)
            .map(|_| {
                let pool = pool.clone();
                let barrier = barrier.clone();
                let completed = completed.clone();
                thread::spawn(move || {
                    barrier.wait();
                    for _ in 0..500 {
                        let held: Vec<_> = (0..4)
                            .map(|_| pool.rent_minimum(200, true).unwrap())
                            .collect();
                        for array in &held {
                            assert_eq!(array.len(), 256);
                            assert!(array.read().iter().all(|&b| b == 0));
                        }
                        for array in held {
                            pool.return_array_with(array, ReturnPolicy::strict()).unwrap();
                        }
                        completed.fetch_add(1, Ordering::Relaxed);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        running.store(false, Ordering::Relaxed);
        for ticker in tickers {
            ticker.join().unwrap();
        }

        assert_eq!(completed.load(Ordering::Relaxed), renters * 500);
        assert_eq!(pool.total_used_bytes(), 0);
        assert_eq!(pool.bucket_stats()[0].rented, 0);
        assert_eq!(pool.stats().misuse_failures, 0);
    }

    /// Test: many length classes created concurrently
    #[test]
    fn stress_concurrent_bucket_creation() {
        init_logging();
        let pool = Arc::new(ArrayPool::<u16>::with_defaults());
        let thread_count = 8;
        let lengths = 64;
        let barrier = Arc::new(Barrier::new(thread_count));

        let handles: Vec<_> = (0..thread_count)
            .map(|_| {
                let pool = pool.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    for len in 1..=lengths {
                        let array = pool.rent_exactly(len, false).unwrap();
                        pool.return_array(array).unwrap();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(pool.bucket_count(), lengths);
        let stats = pool.bucket_stats();
        assert!(stats.iter().zip(1..=lengths).all(|(s, len)| s.length == len));
        assert!(stats.iter().all(|s| s.rented == 0 && s.available >= 1));
    }
}
