//! Deadline-bounded execution primitives
//!
//! [`call::TimedCall`] runs an operation under a wall-clock limit and
//! forcibly cancels it when the limit passes. [`lock::TimedMutex`] is mutual
//! exclusion with bounded acquisition. Together they keep every phase of a
//! render call and the lifecycle monitor from blocking indefinitely.

pub mod call;
pub mod lock;

pub use call::{TimedCall, TimedCallError};
pub use lock::TimedMutex;
