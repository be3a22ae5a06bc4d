//! Row mapping helpers for `SQLite` queries.

use chrono::{DateTime, Utc};
use lectern_core::{AudioFormat, AudioRecord, AudioStatus, RepositoryError, VoiceSettings};
use sqlx::Row;

/// Shared SELECT column list for audio record queries.
pub const RECORD_SELECT_COLUMNS: &str = "block_id, position, audio_url, duration_ms, format, sample_rate, voice_settings, model, text_length, segment_count, status, created_at";

fn column<'r, T>(row: &'r sqlx::sqlite::SqliteRow, name: &str) -> Result<T, RepositoryError>
where
    T: sqlx::Decode<'r, sqlx::Sqlite> + sqlx::Type<sqlx::Sqlite>,
{
    row.try_get(name)
        .map_err(|e| RepositoryError::Storage(e.to_string()))
}

fn unsigned<T: TryFrom<i64>>(value: i64, name: &str) -> Result<T, RepositoryError> {
    T::try_from(value)
        .map_err(|_| RepositoryError::Serialization(format!("{name} out of range: {value}")))
}

/// Parse an RFC 3339 timestamp as written by [`record_to_params`].
pub fn parse_datetime(value: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Serialization(format!("bad created_at '{value}': {e}")))
}

/// Parse a database row into an [`AudioRecord`].
pub fn row_to_record(row: &sqlx::sqlite::SqliteRow) -> Result<AudioRecord, RepositoryError> {
    let format: String = column(row, "format")?;
    let status: String = column(row, "status")?;
    let voice_json: String = column(row, "voice_settings")?;
    let created_at: String = column(row, "created_at")?;

    let voice_settings: VoiceSettings = serde_json::from_str(&voice_json)
        .map_err(|e| RepositoryError::Serialization(e.to_string()))?;

    Ok(AudioRecord {
        block_id: column(row, "block_id")?,
        position: unsigned(column::<i64>(row, "position")?, "position")?,
        audio_url: column(row, "audio_url")?,
        duration_ms: unsigned(column::<i64>(row, "duration_ms")?, "duration_ms")?,
        format: format
            .parse::<AudioFormat>()
            .map_err(RepositoryError::Serialization)?,
        sample_rate: unsigned(column::<i64>(row, "sample_rate")?, "sample_rate")?,
        voice_settings,
        model: column(row, "model")?,
        text_length: unsigned(column::<i64>(row, "text_length")?, "text_length")?,
        segment_count: unsigned(column::<i64>(row, "segment_count")?, "segment_count")?,
        status: AudioStatus::parse(&status)
            .ok_or_else(|| RepositoryError::Serialization(format!("unknown status '{status}'")))?,
        created_at: parse_datetime(&created_at)?,
    })
}

fn signed<T>(value: T, name: &str) -> Result<i64, RepositoryError>
where
    T: Copy + std::fmt::Display,
    i64: TryFrom<T>,
{
    i64::try_from(value)
        .map_err(|_| RepositoryError::Serialization(format!("{name} out of range: {value}")))
}

/// Stored forms of the record fields that need conversion before binding.
pub struct RecordParams {
    pub duration_ms: i64,
    pub sample_rate: i64,
    pub voice_settings: String,
    pub text_length: i64,
    pub segment_count: i64,
    pub created_at: String,
}

/// Convert the numeric and structured fields of a record to their stored form.
pub fn record_to_params(record: &AudioRecord) -> Result<RecordParams, RepositoryError> {
    Ok(RecordParams {
        duration_ms: signed(record.duration_ms, "duration_ms")?,
        sample_rate: i64::from(record.sample_rate),
        voice_settings: serde_json::to_string(&record.voice_settings)
            .map_err(|e| RepositoryError::Serialization(e.to_string()))?,
        text_length: signed(record.text_length, "text_length")?,
        segment_count: signed(record.segment_count, "segment_count")?,
        created_at: record.created_at.to_rfc3339(),
    })
}
