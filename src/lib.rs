//! Pokecache - A concurrency-safe in-memory byte cache
//!
//! Stores opaque byte payloads by string key and removes stale entries with a
//! periodic background sweep.

pub mod cache;
pub mod config;
pub mod error;
pub mod shell;
pub mod tasks;

pub use cache::{CacheStats, ExpiringCache, ExpiryMode};
pub use config::Config;
pub use tasks::SweepHandle;
