//! Adaptive trimming
//! Tests focused on how retained capacity follows the usage window

use std::{
    thread,
    time::{Duration, Instant},
};

use arraypool::{defaults::HISTORY_BINS, ArrayPool, ArrayPoolConfig, PooledArray};

fn manual_pool() -> ArrayPool<u64> {
    let _ = env_logger::builder().is_test(true).try_init();
    ArrayPool::with_defaults()
}

/// Rent `count` buffers at once, then hand them all back
fn demand(pool: &ArrayPool<u64>, len: usize, count: usize) {
    let held: Vec<PooledArray<u64>> = (0..count)
        .map(|_| pool.rent_exactly(len, false).unwrap())
        .collect();
    for array in held {
        pool.return_array(array).unwrap();
    }
}

fn available(pool: &ArrayPool<u64>) -> usize {
    pool.bucket_stats().iter().map(|stats| stats.available).sum()
}

#[cfg(test)]
mod trimming_tests {
    use super::*;

    /// Test: the first tick after a peak keeps every buffer
    #[test]
    fn test_first_tick_keeps_peak() {
        let pool = manual_pool();
        demand(&pool, 128, 50);

        assert_eq!(pool.process_pending_work(), 0);
        assert_eq!(available(&pool), 50);
    }

    /// Test: idle ticks decay the pool monotonically down to nothing
    #[test]
    fn test_idle_decay() {
        let pool = manual_pool();
        let peak = 50;
        demand(&pool, 128, peak);
        pool.process_pending_work();

        let mut previous = available(&pool);
        for _ in 0..HISTORY_BINS {
            pool.process_pending_work();
            let retained = available(&pool);
            assert!(retained <= previous);
            assert!(retained as f64 <= (peak as f64 * 1.1).ceil());
            previous = retained;
        }

        assert_eq!(available(&pool), 0);
        assert_eq!(pool.total_allocated_bytes(), 0);
        assert_eq!(pool.stats().trimmed, peak as u64);
        // The bucket itself survives an empty pool
        assert_eq!(pool.bucket_count(), 1);
    }

    /// Test: steady demand keeps its working set
    #[test]
    fn test_steady_demand_is_retained() {
        let pool = manual_pool();
        for _ in 0..(3 * HISTORY_BINS) {
            demand(&pool, 64, 8);
            pool.process_pending_work();
            assert_eq!(available(&pool), 8);
        }

        let stats = pool.stats();
        assert_eq!(stats.allocations, 8);
        assert_eq!(stats.trimmed, 0);
    }

    /// Test: after a burst the pool settles to the new demand
    #[test]
    fn test_burst_then_lower_demand() {
        let pool = manual_pool();
        demand(&pool, 256, 40);
        pool.process_pending_work();
        assert_eq!(available(&pool), 40);

        for _ in 0..(HISTORY_BINS + 5) {
            demand(&pool, 256, 4);
            pool.process_pending_work();
        }
        assert_eq!(available(&pool), 4);
    }

    /// Test: rented buffers are never reclaimed
    #[test]
    fn test_rented_buffers_survive_trimming() {
        let pool = manual_pool();
        let held: Vec<_> = (0..5)
            .map(|_| pool.rent_exactly(32, false).unwrap())
            .collect();
        let used = pool.total_used_bytes();

        for _ in 0..(2 * HISTORY_BINS) {
            pool.process_pending_work();
        }
        assert_eq!(pool.total_used_bytes(), used);
        assert_eq!(pool.bucket_stats()[0].rented, 5);

        for array in held {
            pool.return_array(array).unwrap();
        }
        assert_eq!(available(&pool), 5);
    }

    /// Test: each length class trims independently
    #[test]
    fn test_buckets_trim_independently() {
        let pool = manual_pool();
        demand(&pool, 16, 20);
        pool.process_pending_work();

        for _ in 0..(HISTORY_BINS + 1) {
            demand(&pool, 32, 3);
            pool.process_pending_work();
        }

        let stats = pool.bucket_stats();
        assert_eq!(stats[0].length, 16);
        assert_eq!(stats[0].available, 0);
        assert_eq!(stats[1].length, 32);
        assert_eq!(stats[1].available, 3);
    }

    /// Test: the background thread trims an idle pool on its own
    #[test]
    fn test_background_maintenance_trims() {
        let _ = env_logger::builder().is_test(true).try_init();
        let config = ArrayPoolConfig::new("trim").with_maintenance_interval(Duration::from_millis(5));
        let pool = ArrayPool::<u64>::new(config).unwrap();
        assert!(pool.is_maintenance_running());

        demand(&pool, 512, 10);
        assert!(available(&pool) > 0);

        let deadline = Instant::now() + Duration::from_secs(10);
        while available(&pool) > 0 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(available(&pool), 0);
        assert!(pool.stats().maintenance_ticks >= HISTORY_BINS as u64);
    }
}
