//! Per-length bucket stores
//!
//! A bucket owns every buffer of one exact length: the rented and available
//! sets, the rolling usage window and the trim decision for its class.

pub mod history;
pub mod store;

pub use history::UsageHistory;
pub use store::{Bucket, BucketStats, RentSource, ReturnDisposition};
