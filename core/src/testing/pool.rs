use std::{
    collections::HashSet,
    sync::{Arc, Mutex, PoisonError},
};

use async_trait::async_trait;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Bounded set of worker slots. A test holds a slot from dispatch until its process returns.
#[async_trait]
pub trait ThreadPool: Send + Sync {
    /// Waits (in FIFO order) until a slot is free.
    async fn acquire(&self) -> WorkerSlot;

    fn capacity(&self) -> usize;
}

/// Occupied worker slot; dropping it frees the slot.
#[derive(Debug)]
pub struct WorkerSlot {
    id: usize,
    free_ids: Arc<Mutex<Vec<usize>>>,
    _permit: OwnedSemaphorePermit,
}

impl WorkerSlot {
    pub fn id(&self) -> usize {
        self.id
    }
}

impl Drop for WorkerSlot {
    // The id goes back before the permit is released, so the next waiter always finds one.
    fn drop(&mut self) {
        self.free_ids
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(self.id);
    }
}

#[derive(Debug, Clone)]
pub struct WorkerPool {
    capacity: usize,
    semaphore: Arc<Semaphore>,
    free_ids: Arc<Mutex<Vec<usize>>>,
}

impl WorkerPool {
    pub fn new(capacity: usize) -> Self {
        if capacity == 0 {
            log::warn!("Worker pool capacity must be at least 1, using 1");
        }
        let capacity = capacity.max(1);
        Self {
            capacity,
            semaphore: Arc::new(Semaphore::new(capacity)),
            free_ids: Arc::new(Mutex::new((0..capacity).rev().collect())),
        }
    }
}

#[async_trait]
impl ThreadPool for WorkerPool {
    async fn acquire(&self) -> WorkerSlot {
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .expect("worker pool semaphore is never closed");
        let id = self
            .free_ids
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop()
            .expect("a free slot id exists for every permit");
        WorkerSlot {
            id,
            free_ids: self.free_ids.clone(),
            _permit: permit,
        }
    }

    fn capacity(&self) -> usize {
        self.capacity
    }
}

/// [`WorkerPool`] that remembers which slots were handed out.
#[derive(Debug)]
pub struct SpyThreadPool {
    pool: WorkerPool,
    used: Mutex<HashSet<usize>>,
}

impl SpyThreadPool {
    pub fn new(capacity: usize) -> Self {
        Self {
            pool: WorkerPool::new(capacity),
            used: Mutex::new(HashSet::new()),
        }
    }

    /// Number of distinct slots that have been used so far.
    pub fn thread_count(&self) -> usize {
        self.used.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

#[async_trait]
impl ThreadPool for SpyThreadPool {
    async fn acquire(&self) -> WorkerSlot {
        let slot = self.pool.acquire().await;
        self.used
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(slot.id());
        slot
    }

    fn capacity(&self) -> usize {
        self.pool.capacity()
    }
}
