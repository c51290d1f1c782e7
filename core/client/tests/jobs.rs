mod common;

use httpmock::prelude::*;
use monai_cloud_client::types::{JobStatus, NewJob};
use monai_cloud_client::{wait_for_job, ApiError, PollOutcome};
use serde_json::json;
use tempfile::tempdir;
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn test_create_job_with_bare_id() {
    let server = MockServer::start_async().await;
    let create = server
        .mock_async(|when, then| {
            when.method(POST)
                .path(common::path("experiments/e1/jobs"))
                .json_body(json!({ "action": "train", "specs": { "num_epochs": 1 } }));
            then.status(201).json_body(json!("j1"));
        })
        .await;

    let client = common::client(&server);
    let job = NewJob {
        action: "train".into(),
        specs: json!({ "num_epochs": 1 }),
        parent_job_id: None,
    };
    assert_eq!(client.create_job("e1", &job).await.unwrap(), "j1");
    create.assert_async().await;
}

#[tokio::test]
async fn test_list_jobs() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path(common::path("experiments/e1/jobs"));
            then.status(200).json_body(json!([
                common::job_body("j1", "Done"),
                common::job_body("j2", "RUNNING")
            ]));
        })
        .await;

    let client = common::client(&server);
    let jobs = client.list_jobs("e1").await.unwrap();
    assert_eq!(jobs[0].status, JobStatus::Done);
    assert_eq!(jobs[1].status, JobStatus::Running);
}

#[tokio::test]
async fn test_cancel_job() {
    let server = MockServer::start_async().await;
    let cancel = server
        .mock_async(|when, then| {
            when.method(POST)
                .path(common::path("experiments/e1/jobs/j1:cancel"))
                .header("Authorization", common::bearer());
            then.status(200);
        })
        .await;

    let client = common::client(&server);
    client.cancel_job("e1", "j1").await.unwrap();
    cancel.assert_async().await;
}

#[tokio::test]
async fn test_download_checks_status_first() {
    let server = MockServer::start_async().await;
    let status = server
        .mock_async(|when, then| {
            when.method(GET).path(common::path("experiments/e1/jobs/j1"));
            then.status(200).json_body(common::job_body("j1", "Running"));
        })
        .await;
    let download = server
        .mock_async(|when, then| {
            when.method(GET)
                .path(common::path("experiments/e1/jobs/j1:download"));
            then.status(200).body(b"archive".to_vec());
        })
        .await;

    let dir = tempdir().unwrap();
    let client = common::client(&server);
    let err = client.download_job("e1", "j1", dir.path()).await.unwrap_err();
    assert!(matches!(
        err,
        ApiError::JobNotDone {
            status: JobStatus::Running,
            ..
        }
    ));
    status.assert_hits_async(1).await;
    download.assert_hits_async(0).await;
    assert!(!dir.path().join("j1.tar.gz").exists());
}

#[tokio::test]
async fn test_download_writes_archive() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path(common::path("experiments/e1/jobs/j1"));
            then.status(200).json_body(common::job_body("j1", "done"));
        })
        .await;
    let archive = vec![0x1f, 0x8b, 0x08, 0x00, 1, 2, 3, 4];
    let download = server
        .mock_async(|when, then| {
            when.method(GET)
                .path(common::path("experiments/e1/jobs/j1:download"));
            then.status(200)
                .header("content-type", "application/gzip")
                .body(archive.clone());
        })
        .await;

    let dir = tempdir().unwrap();
    let client = common::client(&server);
    let path = client.download_job("e1", "j1", dir.path()).await.unwrap();

    assert_eq!(path, dir.path().join("j1.tar.gz"));
    assert_eq!(std::fs::read(&path).unwrap(), archive);
    assert!(!dir.path().join("j1.tar.gz.part").exists());
    download.assert_async().await;
}

#[tokio::test]
async fn test_failed_download_removes_partial_file() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path(common::path("experiments/e1/jobs/j1"));
            then.status(200).json_body(common::job_body("j1", "Done"));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path(common::path("experiments/e1/jobs/j1:download"));
            then.status(200).body("results");
        })
        .await;

    // A non-empty directory under the final name makes the rename fail.
    let dir = tempdir().unwrap();
    let blocked = dir.path().join("j1.tar.gz");
    std::fs::create_dir(&blocked).unwrap();
    std::fs::write(blocked.join("keep"), b"x").unwrap();

    let client = common::client(&server);
    let err = client
        .download_job("e1", "j1", dir.path())
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::Io(_)));
    assert!(!dir.path().join("j1.tar.gz.part").exists());
    assert!(blocked.join("keep").exists());
}

#[tokio::test]
async fn test_poll_against_server_reports_failure() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path(common::path("experiments/e1/jobs/j1"));
            then.status(200).json_body(json!({
                "id": "j1",
                "status": "Error",
                "result": { "detailed_status": { "message": "out of memory" } }
            }));
        })
        .await;

    let client = common::client(&server);
    let outcome = wait_for_job(
        &client,
        "e1",
        "j1",
        &common::fast_poll(),
        &CancellationToken::new(),
    )
    .await
    .unwrap();
    match outcome {
        PollOutcome::Failed(job) => {
            assert_eq!(job.status, JobStatus::Error);
            assert!(job.result.is_some());
        },
        other => panic!("expected a failed job, got {other:?}"),
    }
}

#[tokio::test]
async fn test_poll_missing_job_propagates() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path(common::path("experiments/e1/jobs/j1"));
            then.status(404).body("job not found");
        })
        .await;

    let client = common::client(&server);
    let result = wait_for_job(
        &client,
        "e1",
        "j1",
        &common::fast_poll(),
        &CancellationToken::new(),
    )
    .await;
    assert!(matches!(result, Err(ApiError::UnexpectedStatus { .. })));
}
