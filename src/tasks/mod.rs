//! Background Tasks Module
//!
//! Contains background tasks that run periodically alongside cache access.
//!
//! # Tasks
//! - Sweep: Removes entries older than the sweep interval on every tick

mod sweep;

pub use sweep::SweepHandle;
pub(crate) use sweep::spawn_sweep_task;
