//! Bounded worker pool for CPU-bound pipeline work.
//!
//! Concurrency is bounded by a semaphore; each closure runs on tokio's
//! blocking thread pool once it holds a permit. A pool of size 0 runs every
//! task inline in the caller, which must produce the same results as the
//! concurrent path.

use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

use crate::error::PoolError;

/// Worker pool with `size` concurrent slots.
#[derive(Debug, Clone)]
pub struct WorkerPool {
    permits: Option<Arc<Semaphore>>,
    size: usize,
}

impl WorkerPool {
    /// Create a pool. `size == 0` means synchronous, in-caller execution.
    pub fn new(size: usize) -> Self {
        let permits = (size > 0).then(|| Arc::new(Semaphore::new(size)));
        Self { permits, size }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Whether tasks run inline in the caller.
    pub fn is_inline(&self) -> bool {
        self.permits.is_none()
    }

    /// Run one blocking task and wait for it.
    pub async fn run<F, T>(&self, task: F) -> Result<T, PoolError>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        match &self.permits {
            None => Ok(task()),
            Some(permits) => run_blocking(permits.clone(), task).await,
        }
    }

    /// Start an empty batch on this pool.
    pub fn batch<T: Send + 'static>(&self) -> Batch<T> {
        Batch {
            permits: self.permits.clone(),
            pending: Vec::new(),
        }
    }
}

async fn run_blocking<F, T>(permits: Arc<Semaphore>, task: F) -> Result<T, PoolError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    let _permit = permits.acquire_owned().await.map_err(|_| PoolError::Closed)?;
    Ok(tokio::task::spawn_blocking(task).await?)
}

enum Pending<T> {
    Done(T),
    Spawned(JoinHandle<Result<T, PoolError>>),
}

/// A group of tasks started together and awaited together.
///
/// Results come back in start order regardless of completion order.
pub struct Batch<T> {
    permits: Option<Arc<Semaphore>>,
    pending: Vec<Pending<T>>,
}

impl<T: Send + 'static> Batch<T> {
    /// Start a blocking task. Inline pools run it immediately.
    pub fn start<F>(&mut self, task: F)
    where
        F: FnOnce() -> T + Send + 'static,
    {
        let pending = match &self.permits {
            None => Pending::Done(task()),
            Some(permits) => Pending::Spawned(tokio::spawn(run_blocking(permits.clone(), task))),
        };
        self.pending.push(pending);
    }

    /// Start an async task (I/O). Inline pools await it immediately.
    pub async fn start_async<Fut>(&mut self, task: Fut)
    where
        Fut: Future<Output = T> + Send + 'static,
    {
        let pending = match &self.permits {
            None => Pending::Done(task.await),
            Some(permits) => {
                let permits = permits.clone();
                Pending::Spawned(tokio::spawn(async move {
                    let _permit = permits.acquire_owned().await.map_err(|_| PoolError::Closed)?;
                    Ok(task.await)
                }))
            }
        };
        self.pending.push(pending);
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Wait for every task. The first scheduler failure is returned; tasks
    /// still running are left to finish on their own.
    pub async fn wait_all(self) -> Result<Vec<T>, PoolError> {
        let mut results = Vec::with_capacity(self.pending.len());
        for pending in self.pending {
            match pending {
                Pending::Done(value) => results.push(value),
                Pending::Spawned(handle) => results.push(handle.await??),
            }
        }
        Ok(results)
    }
}
