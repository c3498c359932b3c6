//! Post-processing queue: bounded channel plus semaphore-limited worker pool.
//!
//! Shutdown: [`PostProcessingQueue::shutdown`] closes the channel, lets the pool
//! drain whatever is already queued, and waits until every running task has
//! finished.

use std::sync::{Arc, Mutex};
use std::time::Instant;

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

use filedrop_core::{Config, PostProcessingTask};

use crate::context::TaskHandler;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueConfig {
    pub max_workers: usize,
    pub queue_size: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_workers: 2,
            queue_size: 256,
        }
    }
}

impl QueueConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_workers: config.post_processing_workers(),
            queue_size: config.post_processing_queue_size(),
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("post-processing queue is full")]
    QueueFull,

    #[error("post-processing queue is shut down")]
    Closed,
}

pub struct PostProcessingQueue {
    tx: Mutex<Option<mpsc::Sender<PostProcessingTask>>>,
    pool: tokio::sync::Mutex<Option<JoinHandle<()>>>,
    config: QueueConfig,
}

impl PostProcessingQueue {
    /// Create the queue and spawn its worker pool on the current runtime.
    pub fn new(handler: Arc<dyn TaskHandler>, config: QueueConfig) -> Self {
        let config = QueueConfig {
            max_workers: config.max_workers.max(1),
            queue_size: config.queue_size.max(1),
        };
        let (tx, rx) = mpsc::channel(config.queue_size);

        let pool = tokio::spawn(Self::worker_pool(rx, handler, config.max_workers));

        tracing::info!(
            queue_size = config.queue_size,
            max_workers = config.max_workers,
            "Post-processing queue initialized"
        );

        Self {
            tx: Mutex::new(Some(tx)),
            pool: tokio::sync::Mutex::new(Some(pool)),
            config,
        }
    }

    pub fn config(&self) -> QueueConfig {
        self.config
    }

    /// Enqueue a task without waiting. A full queue drops the task.
    #[tracing::instrument(skip(self, task), fields(path = %task.target_path.display(), transform = %task.transform))]
    pub fn schedule(&self, task: PostProcessingTask) -> Result<(), ScheduleError> {
        let tx = self
            .tx
            .lock()
            .ok()
            .and_then(|guard| guard.clone())
            .ok_or(ScheduleError::Closed)?;

        tx.try_send(task).map_err(|e| match e {
            TrySendError::Full(_) => {
                tracing::warn!("Post-processing queue is full, skipping task");
                ScheduleError::QueueFull
            }
            TrySendError::Closed(_) => ScheduleError::Closed,
        })?;

        tracing::debug!("Post-processing task enqueued");
        Ok(())
    }

    /// Stop accepting tasks, run what is queued, wait for completion.
    pub async fn shutdown(&self) {
        tracing::info!("Initiating post-processing queue shutdown");

        if let Ok(mut guard) = self.tx.lock() {
            guard.take();
        }

        let pool = self.pool.lock().await.take();
        if let Some(pool) = pool {
            if let Err(e) = pool.await {
                tracing::error!(error = %e, "Post-processing worker pool terminated abnormally");
            }
        }

        tracing::info!("Post-processing queue drained");
    }

    async fn worker_pool(
        mut rx: mpsc::Receiver<PostProcessingTask>,
        handler: Arc<dyn TaskHandler>,
        max_workers: usize,
    ) {
        let semaphore = Arc::new(Semaphore::new(max_workers));

        while let Some(task) = rx.recv().await {
            let permit = match semaphore.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => break,
            };
            let handler = handler.clone();

            tokio::spawn(async move {
                let _permit = permit;
                Self::run_task(handler, task).await;
            });
        }

        // Channel closed: wait for in-flight tasks to hand their permits back.
        let permits = u32::try_from(max_workers).unwrap_or(u32::MAX);
        if semaphore.acquire_many(permits).await.is_err() {
            tracing::warn!("Post-processing semaphore closed before drain completed");
        }
        tracing::info!("Post-processing worker pool stopped");
    }

    async fn run_task(handler: Arc<dyn TaskHandler>, task: PostProcessingTask) {
        let start = Instant::now();
        let path = task.target_path.display().to_string();
        let transform = task.transform;

        tracing::info!(path = %path, transform = %transform, "Starting post-processing task");

        // Inner spawn keeps a panicking handler from taking the permit holder down with it.
        let outcome = tokio::spawn(async move { handler.handle(&task).await }).await;
        let duration_ms = start.elapsed().as_secs_f64() * 1000.0;

        match outcome {
            Ok(Ok(())) => tracing::info!(
                path = %path,
                transform = %transform,
                duration_ms = duration_ms,
                "Post-processing task completed"
            ),
            Ok(Err(e)) => tracing::error!(
                path = %path,
                transform = %transform,
                duration_ms = duration_ms,
                error = %e,
                "Post-processing task failed"
            ),
            Err(e) => tracing::error!(
                path = %path,
                transform = %transform,
                duration_ms = duration_ms,
                error = %e,
                "Post-processing task panicked"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use filedrop_core::Transform;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct CountingHandler {
        handled: AtomicUsize,
        delay: Duration,
    }

    #[async_trait]
    impl TaskHandler for CountingHandler {
        async fn handle(&self, task: &PostProcessingTask) -> anyhow::Result<()> {
            tokio::time::sleep(self.delay).await;
            self.handled.fetch_add(1, Ordering::SeqCst);
            match task.file_name() {
                Some("fail.png") => Err(anyhow::anyhow!("corrupt image")),
                Some("panic.png") => panic!("handler bug"),
                _ => Ok(()),
            }
        }
    }

    /// Blocks every task until the gate gets permits.
    struct GatedHandler {
        gate: Arc<Semaphore>,
    }

    #[async_trait]
    impl TaskHandler for GatedHandler {
        async fn handle(&self, _task: &PostProcessingTask) -> anyhow::Result<()> {
            let _permit = self.gate.acquire().await?;
            Ok(())
        }
    }

    fn task(name: &str) -> PostProcessingTask {
        PostProcessingTask::new(format!("/tmp/{name}"), Transform::PngToJpeg)
    }

    fn counting(delay_ms: u64) -> Arc<CountingHandler> {
        Arc::new(CountingHandler {
            handled: AtomicUsize::new(0),
            delay: Duration::from_millis(delay_ms),
        })
    }

    #[tokio::test]
    async fn test_shutdown_drains_queued_tasks() {
        let handler = counting(10);
        let queue = PostProcessingQueue::new(
            handler.clone(),
            QueueConfig {
                max_workers: 2,
                queue_size: 16,
            },
        );

        for i in 0..5 {
            queue.schedule(task(&format!("{i}.png"))).unwrap();
        }
        queue.shutdown().await;

        assert_eq!(handler.handled.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn test_failures_and_panics_are_isolated() {
        let handler = counting(0);
        let queue = PostProcessingQueue::new(handler.clone(), QueueConfig::default());

        queue.schedule(task("fail.png")).unwrap();
        queue.schedule(task("panic.png")).unwrap();
        queue.schedule(task("ok.png")).unwrap();
        queue.shutdown().await;

        assert_eq!(handler.handled.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_schedule_after_shutdown_is_closed() {
        let queue = PostProcessingQueue::new(counting(0), QueueConfig::default());
        queue.shutdown().await;

        assert_eq!(queue.schedule(task("late.png")), Err(ScheduleError::Closed));
    }

    #[tokio::test]
    async fn test_full_queue_rejects_without_blocking() {
        let gate = Arc::new(Semaphore::new(0));
        let queue = PostProcessingQueue::new(
            Arc::new(GatedHandler { gate: gate.clone() }),
            QueueConfig {
                max_workers: 1,
                queue_size: 1,
            },
        );

        let mut rejected = 0;
        for i in 0..10 {
            if queue.schedule(task(&format!("{i}.png"))) == Err(ScheduleError::QueueFull) {
                rejected += 1;
            }
        }
        assert!(rejected > 0);

        gate.add_permits(100);
        queue.shutdown().await;
    }

    #[tokio::test]
    async fn test_zero_sizes_are_clamped() {
        let queue = PostProcessingQueue::new(
            counting(0),
            QueueConfig {
                max_workers: 0,
                queue_size: 0,
            },
        );
        assert_eq!(
            queue.config(),
            QueueConfig {
                max_workers: 1,
                queue_size: 1
            }
        );
        queue.shutdown().await;
    }
}
