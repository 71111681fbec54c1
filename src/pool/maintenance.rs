//! Background maintenance driver
//!
//! A named thread that wakes on a fixed period and runs one maintenance
//! tick. It holds only a weak reference to its target, so dropping the pool
//! is never delayed by the driver, and it exits as soon as the handle is
//! stopped or the target is gone.

use std::{
    sync::{
        mpsc::{self, RecvTimeoutError},
        Weak,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use crate::error::{PoolError, Result};

/// Something that can run one maintenance tick
pub trait Maintain: Send + Sync {
    /// Run one tick; returns the number of buffers released
    fn run_maintenance(&self) -> usize;
}

/// Handle to a running maintenance thread
#[derive(Debug)]
pub struct MaintenanceHandle {
    shutdown: Option<mpsc::Sender<()>>,
    thread: Option<JoinHandle<()>>,
    interval: Duration,
}

impl MaintenanceHandle {
    /// Start ticking `target` every `interval`
    pub fn spawn<M: Maintain + 'static>(
        target: Weak<M>,
        interval: Duration,
        name: &str,
    ) -> Result<Self> {
        if interval.is_zero() {
            return Err(PoolError::invalid_parameter(
                "interval",
                "Maintenance interval cannot be zero",
            ));
        }

        let (shutdown, signal) = mpsc::channel::<()>();
        let thread_name = format!("{}-maintenance", name);
        let thread = thread::Builder::new()
            .name(thread_name.clone())
            .spawn(move || {
                log::debug!("{} started, interval {:?}", thread_name, interval);
                loop {
                    match signal.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => match target.upgrade() {
                            Some(target) => {
                                target.run_maintenance();
                            }
                            None => break,
                        },
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                log::debug!("{} stopped", thread_name);
            })
            .map_err(|err| PoolError::from_io(err, "failed to spawn maintenance thread"))?;

        Ok(Self {
            shutdown: Some(shutdown),
            thread: Some(thread),
            interval,
        })
    }

    /// Period between ticks
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Whether the thread is still alive
    pub fn is_running(&self) -> bool {
        self.thread
            .as_ref()
            .map_or(false, |thread| !thread.is_finished())
    }

    /// Stop the thread and wait for it to exit
    pub fn stop(&mut self) {
        // Dropping the sender wakes the thread with Disconnected
        self.shutdown.take();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                log::warn!("maintenance thread panicked");
            }
        }
    }
}

impl Drop for MaintenanceHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    #[derive(Default)]
    struct Counter {
        ticks: AtomicUsize,
    }

    impl Maintain for Counter {
        fn run_maintenance(&self) -> usize {
            self.ticks.fetch_add(1, Ordering::SeqCst);
            0
        }
    }

    #[test]
    fn test_ticks_until_stopped() {
        let counter = Arc::new(Counter::default());
        let mut handle =
            MaintenanceHandle::spawn(Arc::downgrade(&counter), Duration::from_millis(5), "test")
                .unwrap();
        assert!(handle.is_running());
        assert_eq!(handle.interval(), Duration::from_millis(5));

        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while counter.ticks.load(Ordering::SeqCst) < 3 && std::time::Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert!(counter.ticks.load(Ordering::SeqCst) >= 3);

        handle.stop();
        assert!(!handle.is_running());
        let after_stop = counter.ticks.load(Ordering::SeqCst);
        thread::sleep(Duration::from_millis(30));
        assert_eq!(counter.ticks.load(Ordering::SeqCst), after_stop);
    }

    #[test]
    fn test_exits_when_target_dropped() {
        let counter = Arc::new(Counter::default());
        let handle =
            MaintenanceHandle::spawn(Arc::downgrade(&counter), Duration::from_millis(2), "orphan")
                .unwrap();
        drop(counter);

        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while handle.is_running() && std::time::Instant::now() < deadline {
            thread::sleep(Duration::from_millis(2));
        }
        assert!(!handle.is_running());
    }

    #[test]
    fn test_zero_interval_rejected() {
        let counter = Arc::new(Counter::default());
        assert!(MaintenanceHandle::spawn(Arc::downgrade(&counter), Duration::ZERO, "zero").is_err());
    }
}
