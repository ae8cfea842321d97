//! Trellis Bridge: binds the cache facade to a host's change detection
//!
//! Synchronous reads come from the current graph snapshot. Anything that has
//! to wait on the data source signals the host once it settles.

pub mod error;
pub mod scheduler;
pub mod bridge;
pub mod two_way;


pub use error::BridgeError;
pub use scheduler::{BroadcastScheduler, Scheduler};
pub use bridge::Bridge;
pub use two_way::TwoWay;
