//! Bookkeeping of created resources so they can be torn down in dependency order.
//!
//! Jobs belong to experiments and experiments reference datasets. Deleting in the wrong order
//! is rejected by the server, and deleting an experiment while one of its jobs is running
//! leaves the job orphaned. [`CleanupTracker`] records what was created and replays the
//! deletions in a safe order: cancel live jobs, delete experiments, then datasets.

use monai_cloud_types::{Dataset, Experiment};
use tracing::{info, warn};

use crate::client::ApiClient;
use crate::error::ApiError;

#[derive(Clone, Debug, PartialEq, Eq)]
struct TrackedExperiment {
    id: String,
    datasets: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct TrackedJob {
    experiment_id: String,
    job_id: String,
}

/// One deletion the tracker will perform.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CleanupStep {
    /// Cancel the job if the server still reports it Pending or Running.
    CancelJob {
        experiment_id: String,
        job_id: String,
    },
    DeleteExperiment(String),
    DeleteDataset(String),
}

/// What [`CleanupTracker::cleanup`] managed to do.
#[derive(Debug, Default)]
pub struct CleanupReport {
    pub completed: Vec<CleanupStep>,
    pub failed: Vec<(CleanupStep, ApiError)>,
}

impl CleanupReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

#[derive(Clone, Debug, Default)]
pub struct CleanupTracker {
    datasets: Vec<String>,
    experiments: Vec<TrackedExperiment>,
    jobs: Vec<TrackedJob>,
}

impl CleanupTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.datasets.is_empty() && self.experiments.is_empty() && self.jobs.is_empty()
    }

    pub fn track_dataset(&mut self, id: impl Into<String>) {
        self.datasets.push(id.into());
    }

    /// Records an experiment together with the datasets it references. Referenced datasets do
    /// not need to be tracked themselves.
    pub fn track_experiment(&mut self, id: impl Into<String>, datasets: Vec<String>) {
        self.experiments.push(TrackedExperiment {
            id: id.into(),
            datasets,
        });
    }

    pub fn track_job(&mut self, experiment_id: impl Into<String>, job_id: impl Into<String>) {
        self.jobs.push(TrackedJob {
            experiment_id: experiment_id.into(),
            job_id: job_id.into(),
        });
    }

    /// Tracked experiments that still reference `dataset_id`.
    pub fn referencing_experiments(&self, dataset_id: &str) -> Vec<String> {
        self.experiments
            .iter()
            .filter(|e| e.datasets.iter().any(|d| d == dataset_id))
            .map(|e| e.id.clone())
            .collect()
    }

    /// The deletions `cleanup` would run, in order. Newest resources go first within each
    /// kind.
    pub fn plan(&self) -> Vec<CleanupStep> {
        let jobs = self.jobs.iter().rev().map(|j| CleanupStep::CancelJob {
            experiment_id: j.experiment_id.clone(),
            job_id: j.job_id.clone(),
        });
        let experiments = self
            .experiments
            .iter()
            .rev()
            .map(|e| CleanupStep::DeleteExperiment(e.id.clone()));
        let datasets = self
            .datasets
            .iter()
            .rev()
            .map(|d| CleanupStep::DeleteDataset(d.clone()));
        jobs.chain(experiments).chain(datasets).collect()
    }

    /// Cancels the job if it is not terminal yet and stops tracking it.
    pub async fn cancel_job(
        &mut self,
        client: &ApiClient,
        experiment_id: &str,
        job_id: &str,
    ) -> Result<(), ApiError> {
        let job = client.get_job(experiment_id, job_id).await?;
        if !job.status.is_terminal() {
            client.cancel_job(experiment_id, job_id).await?;
        }
        self.jobs
            .retain(|j| !(j.experiment_id == experiment_id && j.job_id == job_id));
        Ok(())
    }

    /// Cancels the experiment's tracked jobs that are still live, then deletes it.
    pub async fn delete_experiment(
        &mut self,
        client: &ApiClient,
        experiment_id: &str,
    ) -> Result<(), ApiError> {
        let jobs: Vec<String> = self
            .jobs
            .iter()
            .filter(|j| j.experiment_id == experiment_id)
            .map(|j| j.job_id.clone())
            .collect();
        for job_id in jobs {
            self.cancel_job(client, experiment_id, &job_id).await?;
        }

        client.delete::<Experiment>(experiment_id).await?;
        self.experiments.retain(|e| e.id != experiment_id);
        Ok(())
    }

    /// Deletes a dataset, refusing while a tracked experiment still references it.
    pub async fn delete_dataset(
        &mut self,
        client: &ApiClient,
        dataset_id: &str,
    ) -> Result<(), ApiError> {
        let experiments = self.referencing_experiments(dataset_id);
        if !experiments.is_empty() {
            return Err(ApiError::DatasetInUse {
                dataset_id: dataset_id.to_string(),
                experiments,
            });
        }

        client.delete::<Dataset>(dataset_id).await?;
        self.datasets.retain(|d| d != dataset_id);
        Ok(())
    }

    /// Runs every step of [`plan`](Self::plan). A failed step is recorded and the rest still
    /// run; a dataset whose experiment could not be deleted is then refused rather than
    /// deleted out of order.
    pub async fn cleanup(&mut self, client: &ApiClient) -> CleanupReport {
        let mut report = CleanupReport::default();

        for step in self.plan() {
            let result = match &step {
                CleanupStep::CancelJob {
                    experiment_id,
                    job_id,
                } => self.cancel_job(client, experiment_id, job_id).await,
                CleanupStep::DeleteExperiment(id) => self.delete_experiment(client, id).await,
                CleanupStep::DeleteDataset(id) => self.delete_dataset(client, id).await,
            };

            match result {
                Ok(()) => report.completed.push(step),
                Err(e) => {
                    warn!("cleanup step {step:?} failed: {e}");
                    report.failed.push((step, e));
                },
            }
        }

        info!(
            "cleanup finished: {} completed, {} failed",
            report.completed.len(),
            report.failed.len()
        );
        report
    }
}
