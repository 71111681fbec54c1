//! Array pool coordinator
//!
//! This module is organized into focused submodules:
//! - `config`: Configuration structures and builder
//! - `stats`: Statistics tracking
//! - `maintenance`: Background trim driver
//! - `guard`: Scoped rentals
//! - `coordinator`: The pool itself

pub mod config;
pub mod coordinator;
pub mod guard;
pub mod maintenance;
pub mod stats;

pub use config::{ArrayPoolConfig, ArrayPoolConfigBuilder};
pub use coordinator::ArrayPool;
pub use guard::RentedArray;
pub use maintenance::{Maintain, MaintenanceHandle};
pub use stats::{AtomicPoolStats, PoolStats};
