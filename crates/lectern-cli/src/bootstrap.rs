//! CLI bootstrap - the composition root.
//!
//! This module is the ONLY place where infrastructure is wired together
//! for the CLI adapter:
//! - Speech providers (via lectern-tts), configured from the environment
//! - Audio record repository (via lectern-store, `SQLite`)
//! - Audio storage: local files, or HTTP object storage with local fallback
//! - The shared synthesis pool (via lectern-pipeline)

use std::path::PathBuf;
use std::sync::Arc;

use lectern_core::{AudioRecordRepository, AudioStoragePort, PipelineSettings};
use lectern_pipeline::SynthesisPool;
use lectern_store::{
    FallbackStorage, HttpObjectStorage, HttpStorageConfig, LocalAudioStorage,
    SqliteAudioRecordRepository, setup_database,
};
use lectern_tts::ProviderRegistry;

use crate::error::CliError;

/// Bootstrap configuration for the CLI.
#[derive(Debug, Clone)]
pub struct CliConfig {
    /// `SQLite` database for audio records.
    pub db_path: PathBuf,
    /// Directory region audio is written to.
    pub out_dir: PathBuf,
    /// Pipeline tuning knobs.
    pub settings: PipelineSettings,
    /// Remote object storage, tried before `out_dir` when present.
    pub remote_storage: Option<HttpStorageConfig>,
}

impl CliConfig {
    /// Settings and remote storage from the process environment.
    pub fn from_env(db_path: PathBuf, out_dir: PathBuf) -> Result<Self, CliError> {
        Self::from_lookup(db_path, out_dir, |key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable lookup.
    pub fn from_lookup(
        db_path: PathBuf,
        out_dir: PathBuf,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, CliError> {
        let settings = PipelineSettings::from_lookup(&lookup)?;
        // Absent URL just means local-only storage.
        let remote_storage = HttpStorageConfig::from_lookup(&lookup).ok();
        Ok(Self {
            db_path,
            out_dir,
            settings,
            remote_storage,
        })
    }
}

/// Fully composed infrastructure for CLI commands.
pub struct CliContext {
    /// Every built-in provider, configured or not.
    pub registry: ProviderRegistry,
    /// Audio record persistence.
    pub records: Arc<dyn AudioRecordRepository>,
    /// Where region audio is uploaded.
    pub storage: Arc<dyn AudioStoragePort>,
    /// Worker pool shared by every narration in this process.
    pub pool: SynthesisPool,
    /// Pipeline tuning knobs.
    pub settings: PipelineSettings,
}

/// Providers only; enough for commands that never touch storage.
pub fn provider_registry() -> Result<ProviderRegistry, CliError> {
    Ok(ProviderRegistry::from_env()?)
}

/// Wire every adapter for a narration run.
pub async fn bootstrap(config: CliConfig) -> Result<CliContext, CliError> {
    let registry = provider_registry()?;

    let pool = setup_database(&config.db_path)
        .await
        .map_err(|e| CliError::Database(format!("{}: {e:#}", config.db_path.display())))?;
    let records: Arc<dyn AudioRecordRepository> = Arc::new(SqliteAudioRecordRepository::new(pool));

    let local: Arc<dyn AudioStoragePort> = Arc::new(LocalAudioStorage::new(config.out_dir));
    let storage: Arc<dyn AudioStoragePort> = match config.remote_storage {
        Some(remote) => {
            tracing::debug!("Using HTTP object storage with local fallback");
            let remote: Arc<dyn AudioStoragePort> = Arc::new(HttpObjectStorage::new(remote)?);
            Arc::new(FallbackStorage::new(remote, local))
        }
        None => local,
    };

    Ok(CliContext {
        registry,
        records,
        storage,
        pool: SynthesisPool::new(config.settings.max_workers),
        settings: config.settings,
    })
}
