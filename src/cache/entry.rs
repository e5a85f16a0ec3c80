//! Cache Entry Module
//!
//! Defines the structure for individual cache entries and their age.

use std::time::{Duration, Instant};

// == Cache Entry ==
/// A stored payload together with the instant it was added.
///
/// Entries are never mutated; a re-add replaces the whole entry.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The stored payload
    pub value: Vec<u8>,
    /// Creation instant (monotonic)
    pub created_at: Instant,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new entry stamped with the current instant.
    pub fn new(value: Vec<u8>) -> Self {
        Self {
            value,
            created_at: Instant::now(),
        }
    }

    // == Age ==
    /// Returns how long ago the entry was created.
    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }

    // == Is Older Than ==
    /// Checks whether the entry's age strictly exceeds `max_age`.
    ///
    /// An entry exactly `max_age` old is still considered fresh.
    pub fn is_older_than(&self, max_age: Duration) -> bool {
        self.age() > max_age
    }
}
