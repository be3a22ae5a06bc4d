//! Process-wide bounded synthesis worker pool.
//!
//! A permit is reserved by the submitting caller *before* a task is
//! spawned, so a saturated pool makes `feed` wait instead of queueing
//! unbounded work. The permit moves into the task and is released when the
//! task finishes.

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::error::PipelineError;

/// Semaphore-backed pool shared by every unit and request.
#[derive(Debug, Clone)]
pub struct SynthesisPool {
    semaphore: Arc<Semaphore>,
    capacity: usize,
}

impl SynthesisPool {
    #[must_use]
    pub fn new(max_workers: usize) -> Self {
        let capacity = max_workers.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    /// Wait for a free worker slot.
    pub async fn reserve(&self) -> Result<OwnedSemaphorePermit, PipelineError> {
        Arc::clone(&self.semaphore)
            .acquire_owned()
            .await
            .map_err(|_| PipelineError::PoolClosed)
    }

    /// Slots not currently reserved.
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Reject all future reservations.
    pub fn close(&self) {
        self.semaphore.close();
    }
}
