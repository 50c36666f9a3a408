//! Background Tasks Module
//!
//! Contains background tasks that run periodically while the engine is
//! alive.
//!
//! # Tasks
//! - Maintenance: sweeps expired entries, re-arms a degraded backend, and
//!   snapshots the engine to disk at configured intervals

mod cleanup;

pub use cleanup::spawn_maintenance_task;
