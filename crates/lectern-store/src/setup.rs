//! Database setup and initialization.
//!
//! Entry points call [`setup_database`] with the resolved database path;
//! tests use [`setup_test_database`] for a private in-memory database.

use std::path::Path;

use anyhow::Result;
use sqlx::SqlitePool;
use sqlx::sqlite::SqliteConnectOptions;

/// Open (creating if needed) the `SQLite` database at `db_path` and ensure
/// the schema exists.
///
/// # Example
///
/// ```rust,no_run
/// use lectern_store::setup_database;
/// use std::path::Path;
///
/// # async fn example() -> anyhow::Result<()> {
/// let pool = setup_database(Path::new("/var/lib/lectern/audio.db")).await?;
/// # Ok(())
/// # }
/// ```
pub async fn setup_database(db_path: &Path) -> Result<SqlitePool> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let pool = SqlitePool::connect_with(
        SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true),
    )
    .await?;

    create_schema(&pool).await?;
    Ok(pool)
}

/// Fresh in-memory database with the production schema.
///
/// Limited to one connection: every `:memory:` connection is its own database.
#[cfg(any(test, feature = "test-utils"))]
pub async fn setup_test_database() -> Result<SqlitePool> {
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;
    create_schema(&pool).await?;
    Ok(pool)
}

/// Create tables and indexes. Safe to call repeatedly.
async fn create_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r"
        CREATE TABLE IF NOT EXISTS audio_records (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            block_id TEXT NOT NULL,
            position INTEGER NOT NULL,
            audio_url TEXT,
            duration_ms INTEGER NOT NULL,
            format TEXT NOT NULL CHECK (format IN ('mp3', 'wav', 'pcm')),
            sample_rate INTEGER NOT NULL,
            voice_settings TEXT NOT NULL,
            model TEXT NOT NULL,
            text_length INTEGER NOT NULL,
            segment_count INTEGER NOT NULL,
            status TEXT NOT NULL CHECK (status IN ('completed', 'partial')),
            created_at TEXT NOT NULL
        )
        ",
    )
    .execute(pool)
    .await?;

    // One artifact per region
    sqlx::query(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_audio_records_block_position \
         ON audio_records(block_id, position)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
