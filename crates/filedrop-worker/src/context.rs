//! Task handler trait
//!
//! The services crate implements this for the conversion pipeline. The queue
//! calls `handle` once per task; an `Err` or a panic is logged and dropped.

use anyhow::Result;
use async_trait::async_trait;

use filedrop_core::PostProcessingTask;

#[async_trait]
pub trait TaskHandler: Send + Sync {
    async fn handle(&self, task: &PostProcessingTask) -> Result<()>;
}
