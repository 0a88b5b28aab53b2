//! Rate-controlled transfer dispatch
//!
//! The dispatcher builds the connection pool, derives the per-account cycle
//! period from the target aggregate rate, and launches one worker task per
//! account, staggered across one cycle. Workers share a cancellation domain:
//! the first failure stops every other worker.

mod dispatcher;
mod group;
mod pacing;
mod selector;
mod stats;
mod types;
mod worker;

pub use dispatcher::Dispatcher;
pub use group::TaskGroup;
pub use pacing::{OVERHEAD_COMPENSATION, Pacing, wait_for, wait_until};
pub use selector::TargetSelector;
pub use stats::RunStats;
pub use types::{DispatchError, RunConfig};
pub use worker::Worker;
