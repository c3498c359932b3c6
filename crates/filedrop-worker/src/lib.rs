//! Filedrop Worker Library
//!
//! Post-processing runs outside the request path: handlers enqueue a
//! [`PostProcessingTask`](filedrop_core::PostProcessingTask) and return; a bounded
//! worker pool executes the transform through a [`TaskHandler`].

pub mod context;
pub mod queue;

pub use context::TaskHandler;
pub use queue::{PostProcessingQueue, QueueConfig, ScheduleError};
