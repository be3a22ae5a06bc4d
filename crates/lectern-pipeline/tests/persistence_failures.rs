//! Storage and repository failures are logged, never fatal: the region
//! still completes so playback of its segments is not blocked.

mod common;

use std::sync::Arc;

use async_trait::async_trait;
use common::{Harness, ScriptedProvider, completions, run};
use lectern_core::{
    AudioRecord, AudioRecordRepository, AudioStoragePort, InMemoryAudioRecordRepository,
    InMemoryAudioStorage, RepositoryError, StorageError,
};
use lectern_pipeline::VisualOrchestrator;
use mockall::mock;
use mockall::predicate::eq;

mock! {
    pub Storage {}

    #[async_trait]
    impl AudioStoragePort for Storage {
        async fn upload(
            &self,
            key: &str,
            bytes: &[u8],
            content_type: &str,
        ) -> Result<String, StorageError>;
    }
}

mock! {
    pub Records {}

    #[async_trait]
    impl AudioRecordRepository for Records {
        async fn insert(&self, record: &AudioRecord) -> Result<(), RepositoryError>;
        async fn find(
            &self,
            block_id: &str,
            position: u32,
        ) -> Result<Option<AudioRecord>, RepositoryError>;
        async fn list_for_block(&self, block_id: &str) -> Result<Vec<AudioRecord>, RepositoryError>;
    }
}

#[tokio::test]
async fn test_upload_failure_completes_without_url() {
    let harness = Harness::new(ScriptedProvider::new());

    let mut storage = MockStorage::new();
    storage
        .expect_upload()
        .with(eq("block-9/0.mp3"), mockall::predicate::always(), eq("audio/mpeg"))
        .times(1)
        .returning(|_, _, _| Err(StorageError::Upload("bucket unavailable".to_string())));

    let records = Arc::new(InMemoryAudioRecordRepository::new());
    let ctx = harness.context_with("block-9", Arc::new(storage), records.clone());
    let mut orchestrator = VisualOrchestrator::new(ctx).unwrap();

    let events = run(&mut orchestrator, &["Upload of this will fail."]).await;

    assert_eq!(completions(&events), vec![(0, None)]);
    let stored = records.all().await;
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].audio_url, None);
}

#[tokio::test]
async fn test_record_insert_failure_still_completes() {
    let harness = Harness::new(ScriptedProvider::new());

    let mut repo = MockRecords::new();
    repo.expect_insert()
        .times(1)
        .returning(|_| Err(RepositoryError::Storage("database is locked".to_string())));

    let storage = Arc::new(InMemoryAudioStorage::new());
    let ctx = harness.context_with("block-9", storage.clone(), Arc::new(repo));
    let mut orchestrator = VisualOrchestrator::new(ctx).unwrap();

    let events = run(&mut orchestrator, &["The record will not be saved."]).await;

    assert_eq!(
        completions(&events),
        vec![(0, Some("mem://block-9/0.mp3".to_string()))]
    );
    assert_eq!(storage.len().await, 1);
}

#[tokio::test]
async fn test_no_upload_for_visual_only_block() {
    let harness = Harness::new(ScriptedProvider::new());

    let mut storage = MockStorage::new();
    storage.expect_upload().never();
    let mut repo = MockRecords::new();
    repo.expect_insert().never();

    let ctx = harness.context_with("block-9", Arc::new(storage), Arc::new(repo));
    let mut orchestrator = VisualOrchestrator::new(ctx).unwrap();

    let events = run(&mut orchestrator, &["$$e^{i\\pi} + 1 = 0$$"]).await;
    assert!(completions(&events).is_empty());
}
