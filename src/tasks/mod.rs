//! Background Tasks Module
//!
//! Contains background tasks that run periodically during server operation.
//!
//! # Tasks
//! - Expiry sweep: Drops expired entries from every tier at a fixed interval

mod sweep;

pub use sweep::spawn_sweep_task;
