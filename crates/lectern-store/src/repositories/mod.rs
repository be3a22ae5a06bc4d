//! Repository implementations using `SQLite`.
//!
//! The `SqlitePool` is confined to this module and never exposed through
//! the port trait signatures.

mod row_mappers;
mod sqlite_audio_record_repository;

pub use sqlite_audio_record_repository::SqliteAudioRecordRepository;
