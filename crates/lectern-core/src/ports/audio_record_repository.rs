//! Persistence port for finalized audio records.

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::RepositoryError;
use crate::domain::AudioRecord;

/// Repository for finalized audio records.
///
/// Implementations must enforce uniqueness of `(block_id, position)`:
/// inserting a second record for the same pair fails with
/// [`RepositoryError::Constraint`].
#[async_trait]
pub trait AudioRecordRepository: Send + Sync {
    /// Insert a new record.
    async fn insert(&self, record: &AudioRecord) -> Result<(), RepositoryError>;

    /// Look up the record for one region.
    async fn find(
        &self,
        block_id: &str,
        position: u32,
    ) -> Result<Option<AudioRecord>, RepositoryError>;

    /// All records of a block, ordered by position.
    async fn list_for_block(&self, block_id: &str) -> Result<Vec<AudioRecord>, RepositoryError>;
}

/// Process-local repository for tests and dry runs.
#[derive(Debug, Default)]
pub struct InMemoryAudioRecordRepository {
    records: Mutex<Vec<AudioRecord>>,
}

impl InMemoryAudioRecordRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every stored record in insertion order.
    pub async fn all(&self) -> Vec<AudioRecord> {
        self.records.lock().await.clone()
    }
}

#[async_trait]
impl AudioRecordRepository for InMemoryAudioRecordRepository {
    async fn insert(&self, record: &AudioRecord) -> Result<(), RepositoryError> {
        let mut records = self.records.lock().await;
        if records
            .iter()
            .any(|r| r.block_id == record.block_id && r.position == record.position)
        {
            return Err(RepositoryError::Constraint(format!(
                "audio record already exists for block '{}' position {}",
                record.block_id, record.position
            )));
        }
        records.push(record.clone());
        Ok(())
    }

    async fn find(
        &self,
        block_id: &str,
        position: u32,
    ) -> Result<Option<AudioRecord>, RepositoryError> {
        let records = self.records.lock().await;
        Ok(records
            .iter()
            .find(|r| r.block_id == block_id && r.position == position)
            .cloned())
    }

    async fn list_for_block(&self, block_id: &str) -> Result<Vec<AudioRecord>, RepositoryError> {
        let records = self.records.lock().await;
        let mut found: Vec<AudioRecord> = records
            .iter()
            .filter(|r| r.block_id == block_id)
            .cloned()
            .collect();
        found.sort_by_key(|r| r.position);
        Ok(found)
    }
}
