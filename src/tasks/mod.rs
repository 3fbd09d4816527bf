//! Background Tasks Module
//!
//! Contains background tasks that run periodically during server operation,
//! and the bridge that moves blocking cache work off the async executor.
//!
//! # Tasks
//! - Expiry sweep: reclaims storage held by expired cache entries

mod blocking;
mod sweep;

pub use blocking::{lock, run_blocking, shared, SharedCache};
pub use sweep::spawn_sweep_task;
