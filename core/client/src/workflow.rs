use std::path::PathBuf;

use monai_cloud_types::{
    latest_base_experiment,
    Experiment,
    ExperimentFilter,
    NewDataset,
    NewExperiment,
    NewJob,
};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::cleanup::{CleanupReport, CleanupTracker};
use crate::client::ApiClient;
use crate::error::ApiError;
use crate::poll::{wait_for_job, PollConfig, PollOutcome};

/// A dataset to create, or one that already exists on the server.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum DatasetSource {
    Existing { id: String },
    New(NewDataset),
}

/// Which experiment field the workflow's dataset is placed in.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DatasetRole {
    Train,
    Eval,
    Inference,
}

/// Picks the newest base experiment of an architecture at run time.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct BaseSelector {
    pub network_arch: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ExperimentStep {
    #[serde(flatten)]
    pub experiment: NewExperiment,
    #[serde(default = "default_roles")]
    pub dataset_roles: Vec<DatasetRole>,
    #[serde(default)]
    pub base: Option<BaseSelector>,
}

fn default_roles() -> Vec<DatasetRole> {
    vec![DatasetRole::Train]
}

fn default_true() -> bool {
    true
}

/// Everything needed to go from a dataset to a downloaded result.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct WorkflowConfig {
    pub dataset: DatasetSource,
    pub experiment: ExperimentStep,
    pub job: NewJob,
    #[serde(default)]
    pub poll: Option<PollConfig>,
    /// Where to store the result archive. Nothing is downloaded when unset.
    #[serde(default)]
    pub download_dir: Option<PathBuf>,
    /// Delete what the workflow created once it is done, or after a failure.
    #[serde(default = "default_true")]
    pub cleanup: bool,
}

#[derive(Debug)]
pub struct WorkflowReport {
    pub dataset_id: String,
    pub experiment_id: String,
    pub job_id: String,
    pub outcome: PollOutcome,
    pub archive: Option<PathBuf>,
    pub cleanup: Option<CleanupReport>,
}

/// Runs dataset, experiment, job, poll, download and cleanup in order.
pub struct Workflow<'a> {
    client: &'a ApiClient,
    config: WorkflowConfig,
    poll: PollConfig,
    cancel: CancellationToken,
    tracker: CleanupTracker,
}

impl<'a> Workflow<'a> {
    /// `default_poll` applies when the workflow does not carry its own `[poll]` table.
    pub fn new(client: &'a ApiClient, config: WorkflowConfig, default_poll: PollConfig) -> Self {
        let poll = config.poll.clone().unwrap_or(default_poll);
        Self {
            client,
            config,
            poll,
            cancel: CancellationToken::new(),
            tracker: CleanupTracker::new(),
        }
    }

    /// A token that stops the polling step when cancelled. With `cleanup` set the job is then
    /// cancelled on the server and cleanup still runs; otherwise it is left running.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub async fn run(mut self) -> Result<WorkflowReport, ApiError> {
        match self.execute().await {
            Ok(mut report) => {
                if self.config.cleanup {
                    report.cleanup = Some(self.tracker.cleanup(self.client).await);
                }
                Ok(report)
            },
            Err(e) => {
                if self.config.cleanup && !self.tracker.is_empty() {
                    warn!("workflow failed, deleting what it created: {e}");
                    self.tracker.cleanup(self.client).await;
                }
                Err(e)
            },
        }
    }

    async fn execute(&mut self) -> Result<WorkflowReport, ApiError> {
        let dataset_id = match &self.config.dataset {
            DatasetSource::Existing { id } => id.clone(),
            DatasetSource::New(dataset) => {
                let dataset = self.client.create_dataset(dataset).await?;
                self.tracker.track_dataset(dataset.id.clone());
                dataset.id
            },
        };

        let experiment = self.prepare_experiment(&dataset_id).await?;
        let created = self.client.create_experiment(&experiment).await?;
        let experiment_id = created.id;
        self.tracker
            .track_experiment(experiment_id.clone(), experiment.dataset_ids());

        let job_id = self
            .client
            .create_job(&experiment_id, &self.config.job)
            .await?;
        self.tracker.track_job(experiment_id.clone(), job_id.clone());

        let outcome = wait_for_job(
            self.client,
            &experiment_id,
            &job_id,
            &self.poll,
            &self.cancel,
        )
        .await?;

        let mut archive = None;
        match &outcome {
            PollOutcome::Finished(_) => {
                if let Some(dir) = &self.config.download_dir {
                    archive = Some(
                        self.client
                            .download_job(&experiment_id, &job_id, dir)
                            .await?,
                    );
                }
            },
            PollOutcome::Failed(job) => {
                warn!(
                    "job {job_id} ended with status {}, its logs are in the job result",
                    job.status
                );
            },
            PollOutcome::TimedOut { .. } | PollOutcome::Cancelled { .. } => {
                if self.config.cleanup {
                    info!("job {job_id} is still live, cancelling it");
                    self.client.cancel_job(&experiment_id, &job_id).await?;
                } else {
                    info!("job {job_id} is still live, leaving it running");
                }
            },
        }

        Ok(WorkflowReport {
            dataset_id,
            experiment_id,
            job_id,
            outcome,
            archive,
            cleanup: None,
        })
    }

    async fn prepare_experiment(&self, dataset_id: &str) -> Result<NewExperiment, ApiError> {
        let step = &self.config.experiment;
        let mut experiment = step.experiment.clone();

        for role in &step.dataset_roles {
            match role {
                DatasetRole::Train => {
                    if !experiment.train_datasets.iter().any(|d| d == dataset_id) {
                        experiment.train_datasets.push(dataset_id.to_string());
                    }
                },
                DatasetRole::Eval => experiment.eval_dataset = Some(dataset_id.to_string()),
                DatasetRole::Inference => {
                    experiment.inference_dataset = Some(dataset_id.to_string())
                },
            }
        }

        if let Some(selector) = &step.base {
            let filter = ExperimentFilter {
                network_arch: Some(selector.network_arch.clone()),
                ..Default::default()
            };
            let candidates = self.client.list::<Experiment>(&filter).await?;
            let base = latest_base_experiment(
                &candidates,
                &selector.network_arch,
                selector.name.as_deref(),
            )
            .ok_or_else(|| {
                ApiError::UnexpectedBody(format!(
                    "no base experiment found for {}",
                    selector.network_arch
                ))
            })?;
            info!(
                "using base experiment {} version {}",
                base.id,
                base.version.as_deref().unwrap_or("unknown")
            );
            experiment.base_experiment = vec![base.id.clone()];
        }

        Ok(experiment)
    }
}
