//! # arraypool - Thread-Safe Pool of Fixed-Length Arrays
//!
//! arraypool keeps buffers of each exact length in a bucket of their own and
//! hands them out again instead of allocating, which takes the churn out of
//! workloads that repeatedly request same-shaped buffers (I/O chunking,
//! message framing).
//!
//! ## Features
//!
//! - **Exact and rounded rentals**: exact lengths, power-of-two size classes
//!   and zero-copy slice views over a larger backing array
//! - **Misuse policies**: double returns and foreign buffers are ignored,
//!   reported, adopted or rejected, chosen per pool or per call
//! - **Adaptive trimming**: idle capacity shrinks toward the recent peak
//!   demand, tracked as a rolling high-water mark
//! - **Lock-free**: rent, return and trim never block one another
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │                   ArrayPool<T>                   │
//! │  length → bucket directory   maintenance thread  │
//! ├──────────────────────────────────────────────────┤
//! │  Bucket(64)      │  Bucket(1024)    │  ...       │
//! │  - rented ids    │  - rented ids    │            │
//! │  - available     │  - available     │            │
//! │  - usage window  │  - usage window  │            │
//! └──────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```
//! use arraypool::{ArrayPool, ReturnPolicy};
//!
//! let pool = ArrayPool::<u8>::with_defaults();
//!
//! let frame = pool.rent_slice(1500, true).unwrap();
//! assert_eq!(frame.len(), 1500);
//! assert_eq!(frame.backing().len(), 2048);
//!
//! pool.return_slice_with(frame, ReturnPolicy::strict()).unwrap();
//! assert_eq!(pool.total_used_bytes(), 0);
//! ```

pub mod bucket;
pub mod buffers;
pub mod diagnostics;
pub mod error;
pub mod policy;
pub mod pool;
pub mod sync;

// Main API re-exports
pub use bucket::{Bucket, BucketStats, RentSource, ReturnDisposition, UsageHistory};
pub use buffers::{
    check_length, max_array_length, round_up_to_power_of_two, ArrayMut, ArrayRef, PooledArray,
    PooledSlice, RequestedLength,
};
pub use diagnostics::{DiagnosticSink, LogDiagnostics, SilentDiagnostics};
pub use error::{MisuseKind, PoolError, Result};
pub use policy::{AlreadyReturnedPolicy, NonMemberPolicy, ReturnPolicy};
pub use pool::{
    ArrayPool, ArrayPoolConfig, ArrayPoolConfigBuilder, AtomicPoolStats, PoolStats, RentedArray,
};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const VERSION_MAJOR: u32 = 0;
pub const VERSION_MINOR: u32 = 1;
pub const VERSION_PATCH: u32 = 0;

/// Default configuration constants
pub mod defaults {
    use std::time::Duration;

    /// Number of maintenance intervals in the usage window
    pub const HISTORY_BINS: usize = 10;

    /// Slack kept above the mean peak when trimming
    pub const HEADROOM_FACTOR: f64 = 1.1;

    /// Longest array of a zero-sized element type a pool will hand out
    pub const MAX_ZERO_SIZED_LENGTH: usize = 1 << 20;

    /// Default period between trim ticks
    pub const DEFAULT_MAINTENANCE_INTERVAL: Duration = Duration::from_secs(1);

    pub use crate::sync::bag::{INITIAL_SEGMENT_SLOTS, MAX_SEGMENT_SLOTS};
}
