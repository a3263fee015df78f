//! Background work and bounded fan-out.
//!
//! - [`registry`]: [`TaskRegistry`], submit-now/consume-later background tasks
//!   with pollable status
//! - [`gather`]: run a batch of futures with at most `N` in flight, keeping
//!   submission order

pub mod gather;
pub mod registry;

/// Identifier issued by a [`TaskRegistry`]. Unique for the registry's lifetime.
pub type TaskId = u64;

pub use gather::{gather, gather_settled};
pub use registry::{TaskRegistry, TaskSnapshot, TaskStatus};
