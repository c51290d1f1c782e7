mod common;

use std::time::Duration;

use httpmock::prelude::*;
use monai_cloud_client::types::JobStatus;
use monai_cloud_client::{ApiError, PollConfig, PollOutcome, Workflow, WorkflowConfig};
use serde_json::json;
use tempfile::tempdir;

fn workflow(download_dir: &std::path::Path) -> WorkflowConfig {
    let config = format!(
        r#"
        download_dir = "{}"

        [dataset]
        name = "spleen"
        type = "semantic_segmentation"
        format = "monai"
        client_url = "https://storage.example.org/spleen"
        client_id = "id"
        client_secret = "secret"

        [experiment]
        name = "spleen-train"
        network_arch = "monai_vista3d"

        [job]
        action = "train"
        "#,
        download_dir.display().to_string().replace('\\', "/")
    );
    toml::from_str(&config).unwrap()
}

#[tokio::test]
async fn test_end_to_end() {
    let server = MockServer::start_async().await;
    let create_dataset = server
        .mock_async(|when, then| {
            when.method(POST)
                .path(common::path("datasets"))
                .json_body(common::dataset_payload());
            then.status(201).json_body(json!({ "id": "d1" }));
        })
        .await;
    let create_experiment = server
        .mock_async(|when, then| {
            when.method(POST)
                .path(common::path("experiments"))
                .json_body_partial(r#"{ "train_datasets": ["d1"] }"#);
            then.status(201)
                .json_body(json!({ "id": "e1", "network_arch": "monai_vista3d" }));
        })
        .await;
    let create_job = server
        .mock_async(|when, then| {
            when.method(POST)
                .path(common::path("experiments/e1/jobs"))
                .json_body_partial(r#"{ "action": "train" }"#);
            then.status(201).json_body(json!("j1"));
        })
        .await;
    let job = server
        .mock_async(|when, then| {
            when.method(GET).path(common::path("experiments/e1/jobs/j1"));
            then.status(200).json_body(common::job_body("j1", "Done"));
        })
        .await;
    let download = server
        .mock_async(|when, then| {
            when.method(GET)
                .path(common::path("experiments/e1/jobs/j1:download"));
            then.status(200).body(b"results".to_vec());
        })
        .await;
    let cancel = server
        .mock_async(|when, then| {
            when.method(POST)
                .path(common::path("experiments/e1/jobs/j1:cancel"));
            then.status(200);
        })
        .await;
    let delete_experiment = server
        .mock_async(|when, then| {
            when.method(DELETE).path(common::path("experiments/e1"));
            then.status(200);
        })
        .await;
    let delete_dataset = server
        .mock_async(|when, then| {
            when.method(DELETE).path(common::path("datasets/d1"));
            then.status(200);
        })
        .await;

    let dir = tempdir().unwrap();
    let client = common::client(&server);
    let report = Workflow::new(&client, workflow(dir.path()), common::fast_poll())
        .run()
        .await
        .unwrap();

    assert_eq!(report.dataset_id, "d1");
    assert_eq!(report.experiment_id, "e1");
    assert_eq!(report.job_id, "j1");
    assert!(matches!(report.outcome, PollOutcome::Finished(_)));
    assert_eq!(report.archive, Some(dir.path().join("j1.tar.gz")));
    assert_eq!(std::fs::read(dir.path().join("j1.tar.gz")).unwrap(), b"results");
    assert!(report.cleanup.unwrap().is_clean());

    create_dataset.assert_hits_async(1).await;
    create_experiment.assert_hits_async(1).await;
    create_job.assert_hits_async(1).await;
    download.assert_hits_async(1).await;
    cancel.assert_hits_async(0).await;
    delete_experiment.assert_hits_async(1).await;
    delete_dataset.assert_hits_async(1).await;
    assert!(job.hits_async().await >= 2);
}

#[tokio::test]
async fn test_timed_out_job_is_cancelled_before_cleanup() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path(common::path("datasets"));
            then.status(201).json_body(json!({ "id": "d1" }));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(POST).path(common::path("experiments"));
            then.status(201).json_body(json!({ "id": "e1" }));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(POST).path(common::path("experiments/e1/jobs"));
            then.status(201).json_body(json!({ "id": "j1" }));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path(common::path("experiments/e1/jobs/j1"));
            then.status(200).json_body(common::job_body("j1", "Running"));
        })
        .await;
    let download = server
        .mock_async(|when, then| {
            when.method(GET)
                .path(common::path("experiments/e1/jobs/j1:download"));
            then.status(200).body("results");
        })
        .await;
    let cancel = server
        .mock_async(|when, then| {
            when.method(POST)
                .path(common::path("experiments/e1/jobs/j1:cancel"));
            then.status(200);
        })
        .await;
    let delete_experiment = server
        .mock_async(|when, then| {
            when.method(DELETE).path(common::path("experiments/e1"));
            then.status(200);
        })
        .await;
    let delete_dataset = server
        .mock_async(|when, then| {
            when.method(DELETE).path(common::path("datasets/d1"));
            then.status(200);
        })
        .await;

    let poll = PollConfig {
        interval: Duration::from_millis(10),
        timeout: Duration::from_millis(50),
        ..Default::default()
    };
    let dir = tempdir().unwrap();
    let client = common::client(&server);
    let report = Workflow::new(&client, workflow(dir.path()), poll)
        .run()
        .await
        .unwrap();

    match &report.outcome {
        PollOutcome::TimedOut { last_status, .. } => {
            assert_eq!(last_status, &Some(JobStatus::Running))
        },
        other => panic!("expected a timeout, got {other:?}"),
    }
    assert!(report.archive.is_none());
    download.assert_hits_async(0).await;
    // Once after the timeout, once more during cleanup since the mock still reports Running.
    cancel.assert_hits_async(2).await;
    delete_experiment.assert_hits_async(1).await;
    delete_dataset.assert_hits_async(1).await;
}

#[tokio::test]
async fn test_failed_job_skips_download() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path(common::path("experiments"));
            then.status(201).json_body(json!({ "id": "e1" }));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(POST).path(common::path("experiments/e1/jobs"));
            then.status(201).json_body(json!("j1"));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path(common::path("experiments/e1/jobs/j1"));
            then.status(200).json_body(common::job_body("j1", "ERROR"));
        })
        .await;
    let download = server
        .mock_async(|when, then| {
            when.method(GET)
                .path(common::path("experiments/e1/jobs/j1:download"));
            then.status(200);
        })
        .await;

    let mut config = workflow(tempdir().unwrap().path());
    config.dataset = toml::from_str(r#"id = "existing""#).unwrap();
    config.cleanup = false;

    let client = common::client(&server);
    let report = Workflow::new(&client, config, common::fast_poll())
        .run()
        .await
        .unwrap();

    assert_eq!(report.dataset_id, "existing");
    assert!(matches!(
        report.outcome.clone().into_result(),
        Err(ApiError::JobFailed {
            status: JobStatus::Error,
            ..
        })
    ));
    assert!(report.cleanup.is_none());
    download.assert_hits_async(0).await;
}

#[tokio::test]
async fn test_failure_midway_deletes_created_resources() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path(common::path("datasets"));
            then.status(201).json_body(json!({ "id": "d1" }));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(POST).path(common::path("experiments"));
            then.status(400).body("unknown network_arch");
        })
        .await;
    let delete_dataset = server
        .mock_async(|when, then| {
            when.method(DELETE).path(common::path("datasets/d1"));
            then.status(200);
        })
        .await;

    let dir = tempdir().unwrap();
    let client = common::client(&server);
    let err = Workflow::new(&client, workflow(dir.path()), common::fast_poll())
        .run()
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(reqwest::StatusCode::BAD_REQUEST));
    delete_dataset.assert_hits_async(1).await;
}

#[tokio::test]
async fn test_kept_workflow_leaves_timed_out_job_running() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path(common::path("experiments"));
            then.status(201).json_body(json!({ "id": "e1" }));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(POST).path(common::path("experiments/e1/jobs"));
            then.status(201).json_body(json!("j1"));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path(common::path("experiments/e1/jobs/j1"));
            then.status(200).json_body(common::job_body("j1", "Running"));
        })
        .await;
    let cancel = server
        .mock_async(|when, then| {
            when.method(POST)
                .path(common::path("experiments/e1/jobs/j1:cancel"));
            then.status(200);
        })
        .await;
    let delete_experiment = server
        .mock_async(|when, then| {
            when.method(DELETE).path(common::path("experiments/e1"));
            then.status(200);
        })
        .await;

    let dir = tempdir().unwrap();
    let mut config = workflow(dir.path());
    config.dataset = toml::from_str(r#"id = "d1""#).unwrap();
    config.cleanup = false;
    let poll = PollConfig {
        interval: Duration::from_millis(10),
        timeout: Duration::from_millis(40),
        ..Default::default()
    };

    let client = common::client(&server);
    let report = Workflow::new(&client, config, poll).run().await.unwrap();

    assert!(matches!(report.outcome, PollOutcome::TimedOut { .. }));
    assert!(report.cleanup.is_none());
    cancel.assert_hits_async(0).await;
    delete_experiment.assert_hits_async(0).await;
}
