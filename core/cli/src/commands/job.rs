use anyhow::{Context, Result};
use monai_cloud_client::types::NewJob;
use monai_cloud_client::{wait_for_job, ClientConfig};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::args::JobSubCmd;
use crate::utils::{print_json, read_json};

pub async fn exec(cmd: JobSubCmd, config: &ClientConfig) -> Result<()> {
    let client = config.connect().await?;

    match cmd {
        JobSubCmd::Submit {
            experiment,
            action,
            specs,
            parent,
        } => {
            let specs = match specs {
                Some(path) => read_json(&path)?,
                None => serde_json::json!({}),
            };
            let job = NewJob {
                action,
                specs,
                parent_job_id: parent,
            };
            let job_id = client
                .create_job(&experiment, &job)
                .await
                .with_context(|| format!("Failed to submit a job to experiment {experiment}"))?;
            println!("{job_id}");
            Ok(())
        },
        JobSubCmd::List { experiment } => {
            let jobs = client
                .list_jobs(&experiment)
                .await
                .with_context(|| format!("Failed to list the jobs of experiment {experiment}"))?;
            print_json(&jobs)
        },
        JobSubCmd::Status { experiment, job } => {
            let job = client
                .get_job(&experiment, &job)
                .await
                .with_context(|| format!("Failed to get job {job}"))?;
            print_json(&job)
        },
        JobSubCmd::Wait {
            experiment,
            job,
            timeout,
            interval,
        } => {
            let mut poll = config.poll.clone();
            if let Some(timeout) = timeout {
                poll.timeout = timeout;
            }
            if let Some(interval) = interval {
                poll.interval = interval;
            }

            let cancel = CancellationToken::new();
            let ctrl_c = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    ctrl_c.cancel();
                }
            });

            let outcome = wait_for_job(&client, &experiment, &job, &poll, &cancel).await?;
            let job = outcome.into_result()?;
            info!("job {} finished with status {}", job.id, job.status);
            print_json(&job)
        },
        JobSubCmd::Cancel { experiment, job } => {
            client
                .cancel_job(&experiment, &job)
                .await
                .with_context(|| format!("Failed to cancel job {job}"))?;
            println!("Cancelled job {job}");
            Ok(())
        },
        JobSubCmd::Download {
            experiment,
            job,
            output,
        } => {
            let dir = output.unwrap_or_else(|| config.download_dir.clone());
            let archive = client
                .download_job(&experiment, &job, &dir)
                .await
                .with_context(|| format!("Failed to download the result of job {job}"))?;
            println!("{}", archive.display());
            Ok(())
        },
    }
}
