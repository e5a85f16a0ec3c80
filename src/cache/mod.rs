//! Cache Module
//!
//! Provides the in-memory byte cache with sweep-based expiry.

mod entry;
mod stats;
mod store;


// Re-export public types
pub use entry::CacheEntry;
pub use stats::CacheStats;
pub use store::{ExpiringCache, ExpiryMode};
