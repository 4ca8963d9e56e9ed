use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;

/// Caps how many pipeline runs execute at once; callers beyond the cap wait.
#[derive(Debug, Clone)]
pub struct PipelineSlots {
    semaphore: Arc<Semaphore>,
}

impl PipelineSlots {
    pub fn new(max_concurrency: usize) -> Self {
        let permits = max_concurrency.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(permits)),
        }
    }

    pub async fn run<F>(&self, fut: F) -> F::Output
    where
        F: Future,
    {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .expect("pipeline slot semaphore is closed");
        fut.await
    }

    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }
}
