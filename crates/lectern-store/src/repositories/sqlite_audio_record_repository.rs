//! `SQLite` implementation of the audio record repository.

use async_trait::async_trait;
use lectern_core::{AudioRecord, AudioRecordRepository, RepositoryError};
use sqlx::SqlitePool;

use super::row_mappers::{RECORD_SELECT_COLUMNS, record_to_params, row_to_record};

/// `SQLite` implementation of [`AudioRecordRepository`].
///
/// One row per `(block_id, position)`; a second insert for the same region
/// fails with [`RepositoryError::Constraint`].
pub struct SqliteAudioRecordRepository {
    pool: SqlitePool,
}

impl SqliteAudioRecordRepository {
    /// Create a new repository over an initialized pool.
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

/// Map `SQLx` errors, singling out unique violations.
fn map_sqlx_error(e: sqlx::Error) -> RepositoryError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() {
            return RepositoryError::Constraint(db.message().to_string());
        }
    }
    RepositoryError::Storage(e.to_string())
}

#[async_trait]
impl AudioRecordRepository for SqliteAudioRecordRepository {
    async fn insert(&self, record: &AudioRecord) -> Result<(), RepositoryError> {
        let params = record_to_params(record)?;

        sqlx::query(&format!(
            "INSERT INTO audio_records ({RECORD_SELECT_COLUMNS}) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
        ))
        .bind(&record.block_id)
        .bind(i64::from(record.position))
        .bind(&record.audio_url)
        .bind(params.duration_ms)
        .bind(record.format.as_str())
        .bind(params.sample_rate)
        .bind(&params.voice_settings)
        .bind(&record.model)
        .bind(params.text_length)
        .bind(params.segment_count)
        .bind(record.status.as_str())
        .bind(&params.created_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn find(
        &self,
        block_id: &str,
        position: u32,
    ) -> Result<Option<AudioRecord>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {RECORD_SELECT_COLUMNS} FROM audio_records \
             WHERE block_id = ? AND position = ?"
        ))
        .bind(block_id)
        .bind(i64::from(position))
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.as_ref().map(row_to_record).transpose()
    }

    async fn list_for_block(&self, block_id: &str) -> Result<Vec<AudioRecord>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {RECORD_SELECT_COLUMNS} FROM audio_records \
             WHERE block_id = ? ORDER BY position"
        ))
        .bind(block_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.iter().map(row_to_record).collect()
    }
}
