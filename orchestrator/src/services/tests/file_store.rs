//! Tests for FileBatchStore
//!
//! Every test works in its own temporary directory.

use std::sync::Arc;

use shared::BatchStatus;

use super::common::{test_job, test_sample};
use crate::error::OrchestratorError;
use crate::services::FileBatchStore;
use crate::traits::BatchStore;

fn store_in(dir: &tempfile::TempDir) -> FileBatchStore {
    FileBatchStore::with_base_dir(dir.path().to_path_buf())
}

#[tokio::test]
async fn test_empty_store_reads_as_empty() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);

    assert!(store.list().await.unwrap().is_empty());
    assert!(store.get_by_job_id("batch_0_00000000").await.unwrap().is_none());
    assert!(store.samples_for("batch_0_00000000").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_create_then_update_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);

    let mut job = test_job("batch_1_aaaaaaaa");
    store.create(&job).await.unwrap();

    job.mark_running();
    job.record_success(250);
    job.finish(BatchStatus::Completed);
    store.update(&job).await.unwrap();

    let stored = store.get_by_job_id(&job.id).await.unwrap().expect("stored job");
    assert_eq!(stored, job);
    assert!(dir.path().join("batches.json").exists());
    assert!(!dir.path().join("batches.json.tmp").exists(), "temp file should be renamed away");
}

#[tokio::test]
async fn test_duplicate_create_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    let job = test_job("batch_1_bbbbbbbb");

    store.create(&job).await.unwrap();
    let result = store.create(&job).await;

    assert!(matches!(result, Err(OrchestratorError::PersistenceError { .. })));
    assert_eq!(store.list().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_samples_are_filtered_by_batch() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);

    let first: Vec<_> = (0..3).map(|n| test_sample("batch_a", n)).collect();
    let second: Vec<_> = (0..2).map(|n| test_sample("batch_b", n)).collect();
    store.append_samples("batch_a", &first).await.unwrap();
    store.append_samples("batch_b", &second).await.unwrap();
    store.append_samples("batch_a", &[]).await.unwrap();

    let stored = store.samples_for("batch_a").await.unwrap();
    assert_eq!(stored, first);
    assert_eq!(store.samples_for("batch_b").await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_concurrent_writers_lose_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(store_in(&dir));

    let mut handles = Vec::new();
    for writer in 0..8 {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            let id = format!("batch_{writer}_cccccccc");
            let job = test_job(&id);
            store.create(&job).await.unwrap();
            for n in 0..5 {
                store.append_samples(&id, &[test_sample(&id, n)]).await.unwrap();
                store.update(&job).await.unwrap();
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(store.list().await.unwrap().len(), 8);
    for writer in 0..8 {
        let id = format!("batch_{writer}_cccccccc");
        assert_eq!(store.samples_for(&id).await.unwrap().len(), 5, "samples missing for {id}");
    }
}

#[tokio::test]
async fn test_corrupt_batches_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    tokio::fs::write(dir.path().join("batches.json"), "{not json").await.unwrap();
    let store = store_in(&dir);

    assert!(store.list().await.is_err());
}
