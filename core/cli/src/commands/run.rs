use std::path::Path;

use anyhow::{Context, Result};
use monai_cloud_client::{ClientConfig, PollOutcome, Workflow, WorkflowConfig};
use tracing::{info, warn};

pub async fn exec(path: &Path, keep: bool, config: &ClientConfig) -> Result<()> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Could not read the workflow {}", path.to_string_lossy()))?;
    let mut workflow_config: WorkflowConfig = toml::from_str(&content)
        .with_context(|| format!("Could not parse {} as toml", path.to_string_lossy()))?;
    if keep {
        workflow_config.cleanup = false;
    }

    let client = config.connect().await?;
    let workflow = Workflow::new(&client, workflow_config, config.poll.clone());

    let cancel = workflow.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, no longer waiting for the job");
            cancel.cancel();
        }
    });

    let report = workflow.run().await.context("Workflow failed")?;
    println!("dataset:    {}", report.dataset_id);
    println!("experiment: {}", report.experiment_id);
    println!("job:        {}", report.job_id);
    if let Some(archive) = &report.archive {
        println!("archive:    {}", archive.display());
    }
    if let Some(cleanup) = &report.cleanup {
        for (step, e) in &cleanup.failed {
            warn!("could not clean up {step:?}: {e}");
        }
        info!(
            "deleted {} resources, {} left behind",
            cleanup.completed.len(),
            cleanup.failed.len()
        );
    }

    check_outcome(report.outcome, &report.job_id)
}

/// Anything but Done fails the command, keeping timeouts apart from job failures.
fn check_outcome(outcome: PollOutcome, job_id: &str) -> Result<()> {
    outcome
        .into_result()
        .with_context(|| format!("Job {job_id} did not finish"))?;
    Ok(())
}
