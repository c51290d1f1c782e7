use std::path::{Path, PathBuf};

use monai_cloud_types::{CreatedJob, Job, NewJob};
use reqwest::{Method, Response, StatusCode};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::client::{decode_listing, ApiClient};
use crate::error::ApiError;

const EXPERIMENTS: &str = "experiments";
const JOBS: &str = "jobs";

impl ApiClient {
    /// Submits a job under `experiment_id` and returns its id.
    pub async fn create_job(&self, experiment_id: &str, job: &NewJob) -> Result<String, ApiError> {
        let url = self.session().endpoint(&[EXPERIMENTS, experiment_id, JOBS])?;
        let response = self
            .send(Method::POST, url, StatusCode::CREATED, |req| req.json(job))
            .await?;
        let created: CreatedJob = response.json().await?;
        let job_id = created.into_id();
        info!(
            "submitted {} job {job_id} for experiment {experiment_id}",
            job.action
        );
        Ok(job_id)
    }

    pub async fn get_job(&self, experiment_id: &str, job_id: &str) -> Result<Job, ApiError> {
        let url = self
            .session()
            .endpoint(&[EXPERIMENTS, experiment_id, JOBS, job_id])?;
        let response = self.send(Method::GET, url, StatusCode::OK, |req| req).await?;
        Ok(response.json().await?)
    }

    pub async fn list_jobs(&self, experiment_id: &str) -> Result<Vec<Job>, ApiError> {
        let url = self.session().endpoint(&[EXPERIMENTS, experiment_id, JOBS])?;
        let response = self.send(Method::GET, url, StatusCode::OK, |req| req).await?;
        decode_listing(response.json().await?, JOBS)
    }

    /// Asks the server to stop a job. Only meaningful while the job is Pending or Running.
    pub async fn cancel_job(&self, experiment_id: &str, job_id: &str) -> Result<(), ApiError> {
        let action = format!("{job_id}:cancel");
        let url = self
            .session()
            .endpoint(&[EXPERIMENTS, experiment_id, JOBS, action.as_str()])?;
        self.send(Method::POST, url, StatusCode::OK, |req| req)
            .await?;
        info!("cancelled job {job_id}");
        Ok(())
    }

    /// Streams the result archive of a finished job to `{dir}/{job_id}.tar.gz`.
    ///
    /// The job is fetched first and the download is refused with [`ApiError::JobNotDone`]
    /// unless its status is Done. The archive is written to a `.part` file and renamed once
    /// complete, so an interrupted download never leaves a file under the final name.
    pub async fn download_job(
        &self,
        experiment_id: &str,
        job_id: &str,
        dir: &Path,
    ) -> Result<PathBuf, ApiError> {
        let job = self.get_job(experiment_id, job_id).await?;
        if !job.status.is_done() {
            return Err(ApiError::JobNotDone {
                job_id: job_id.to_string(),
                status: job.status,
            });
        }

        let action = format!("{job_id}:download");
        let url = self
            .session()
            .endpoint(&[EXPERIMENTS, experiment_id, JOBS, action.as_str()])?;
        let mut response = self.send(Method::GET, url, StatusCode::OK, |req| req).await?;

        tokio::fs::create_dir_all(dir).await?;
        let target = dir.join(format!("{job_id}.tar.gz"));
        let partial = dir.join(format!("{job_id}.tar.gz.part"));

        let written = match write_archive(&mut response, &partial, &target).await {
            Ok(written) => written,
            Err(e) => {
                if let Err(remove) = tokio::fs::remove_file(&partial).await {
                    debug!("could not remove {}: {remove}", partial.display());
                }
                return Err(e);
            },
        };

        debug!("wrote {written} bytes");
        info!("downloaded results of job {job_id} to {}", target.display());
        Ok(target)
    }
}

/// Streams the body into `partial` and moves it to `target` once complete.
async fn write_archive(
    response: &mut Response,
    partial: &Path,
    target: &Path,
) -> Result<u64, ApiError> {
    let mut file = tokio::fs::File::create(partial).await?;
    let mut written = 0u64;
    while let Some(chunk) = response.chunk().await? {
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;
    drop(file);
    tokio::fs::rename(partial, target).await?;
    Ok(written)
}
