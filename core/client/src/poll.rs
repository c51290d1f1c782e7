use std::time::Duration;

use async_trait::async_trait;
use monai_cloud_types::{Job, JobStatus};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::client::ApiClient;
use crate::error::ApiError;

/// Anything that can report the current state of a job.
#[async_trait]
pub trait JobSource: Sync {
    async fn job(&self, experiment_id: &str, job_id: &str) -> Result<Job, ApiError>;
}

#[async_trait]
impl JobSource for ApiClient {
    async fn job(&self, experiment_id: &str, job_id: &str) -> Result<Job, ApiError> {
        self.get_job(experiment_id, job_id).await
    }
}

/// How [`wait_for_job`] paces its requests and when it gives up.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    /// Delay between the first two requests.
    #[serde(with = "humantime_serde")]
    pub interval: Duration,
    /// Give up once this much time has passed since the first request.
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
    /// Upper bound for the delay once backoff kicks in.
    #[serde(with = "humantime_serde")]
    pub max_interval: Duration,
    /// Factor applied to the delay after every request. `1.0` keeps the interval fixed.
    pub backoff_multiplier: f64,
    /// Fraction of the delay added or removed at random, between `0.0` and `1.0`.
    pub jitter: f64,
    /// Transient failures (connection errors, 5xx) tolerated in a row before giving up.
    pub max_consecutive_errors: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            timeout: Duration::from_secs(60 * 60),
            max_interval: Duration::from_secs(60),
            backoff_multiplier: 1.0,
            jitter: 0.0,
            max_consecutive_errors: 0,
        }
    }
}

impl PollConfig {
    /// Delay before request number `attempt + 1`, before jitter.
    pub fn base_delay(&self, attempt: u32) -> Duration {
        if !self.backoff_multiplier.is_finite() || self.backoff_multiplier <= 1.0 {
            return self.interval;
        }
        let factor = self.backoff_multiplier.powi(attempt.min(i32::MAX as u32) as i32);
        let delay = self.interval.as_secs_f64() * factor;
        let cap = self.max_interval.max(self.interval).as_secs_f64();
        Duration::from_secs_f64(delay.min(cap))
    }

    fn delay(&self, attempt: u32) -> Duration {
        let delay = self.base_delay(attempt);
        // clamp passes NaN through
        if !self.jitter.is_finite() {
            return delay;
        }
        let jitter = self.jitter.clamp(0.0, 1.0);
        if jitter == 0.0 {
            return delay;
        }
        let scale = rand::thread_rng().gen_range(1.0 - jitter..=1.0 + jitter);
        delay.mul_f64(scale)
    }
}

/// How a call to [`wait_for_job`] ended.
#[derive(Clone, Debug, PartialEq)]
pub enum PollOutcome {
    /// The job reached Done.
    Finished(Job),
    /// The job reached Error or a status this client does not know.
    Failed(Job),
    /// The timeout elapsed before the job reached a terminal status.
    TimedOut {
        job_id: String,
        last_status: Option<JobStatus>,
        elapsed: Duration,
    },
    /// The cancellation token fired.
    Cancelled {
        job_id: String,
        last_status: Option<JobStatus>,
    },
}

impl PollOutcome {
    /// The last status observed, if any.
    pub fn status(&self) -> Option<&JobStatus> {
        match self {
            Self::Finished(job) | Self::Failed(job) => Some(&job.status),
            Self::TimedOut { last_status, .. } | Self::Cancelled { last_status, .. } => {
                last_status.as_ref()
            },
        }
    }

    /// Whether the job may still be running on the server.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished(_) | Self::Failed(_))
    }

    /// Turns anything but Done into an error.
    pub fn into_result(self) -> Result<Job, ApiError> {
        match self {
            Self::Finished(job) => Ok(job),
            Self::Failed(job) => Err(ApiError::JobFailed {
                job_id: job.id,
                status: job.status,
            }),
            Self::TimedOut {
                job_id,
                last_status,
                elapsed,
            } => Err(ApiError::Timeout {
                job_id,
                last_status,
                elapsed,
            }),
            Self::Cancelled { job_id, .. } => Err(ApiError::PollCancelled { job_id }),
        }
    }
}

/// Polls a job until it reaches a terminal status, the timeout elapses, or `cancel` fires.
///
/// A change of status is logged at `info`, an unchanged status at `debug`. Errors returned by
/// the source end the loop, except transient ones while fewer than
/// `config.max_consecutive_errors` have happened in a row. Neither a pending request nor the
/// delay between requests runs past `config.timeout`.
pub async fn wait_for_job<S>(
    source: &S,
    experiment_id: &str,
    job_id: &str,
    config: &PollConfig,
    cancel: &CancellationToken,
) -> Result<PollOutcome, ApiError>
where
    S: JobSource + ?Sized,
{
    let start = Instant::now();
    // 30 years, tokio's own far future.
    let deadline = start
        .checked_add(config.timeout)
        .unwrap_or_else(|| start + Duration::from_secs(86400 * 365 * 30));
    let mut last_status: Option<JobStatus> = None;
    let mut consecutive_errors = 0;
    let mut attempt = 0;

    loop {
        let polled = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Ok(PollOutcome::Cancelled { job_id: job_id.to_string(), last_status });
            },
            polled = tokio::time::timeout_at(deadline, source.job(experiment_id, job_id)) => polled,
        };

        let polled = match polled {
            Ok(polled) => polled,
            Err(_) => {
                let elapsed = start.elapsed();
                warn!(
                    "timed out waiting for job {job_id} after {elapsed:?} with a request pending"
                );
                return Ok(PollOutcome::TimedOut {
                    job_id: job_id.to_string(),
                    last_status,
                    elapsed,
                });
            },
        };

        match polled {
            Ok(job) => {
                consecutive_errors = 0;
                match &last_status {
                    Some(previous) if *previous == job.status => {
                        debug!("job {job_id} still {}", job.status);
                    },
                    Some(previous) => {
                        info!("job {job_id} moved from {previous} to {}", job.status);
                    },
                    None => info!("job {job_id} is {}", job.status),
                }
                last_status = Some(job.status.clone());

                if job.status.is_terminal() {
                    return Ok(if job.status.is_done() {
                        PollOutcome::Finished(job)
                    } else {
                        PollOutcome::Failed(job)
                    });
                }
            },
            Err(e) if e.is_transient() && consecutive_errors < config.max_consecutive_errors => {
                consecutive_errors += 1;
                warn!(
                    "polling job {job_id} failed ({consecutive_errors}/{}): {e}",
                    config.max_consecutive_errors
                );
            },
            Err(e) => return Err(e),
        }

        let elapsed = start.elapsed();
        if elapsed > config.timeout {
            warn!("timed out waiting for job {job_id} after {elapsed:?}");
            return Ok(PollOutcome::TimedOut {
                job_id: job_id.to_string(),
                last_status,
                elapsed,
            });
        }

        let delay = config
            .delay(attempt)
            .min(config.timeout.saturating_sub(elapsed));
        attempt = attempt.saturating_add(1);
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Ok(PollOutcome::Cancelled { job_id: job_id.to_string(), last_status });
            },
            _ = tokio::time::sleep(delay) => {},
        }
    }
}
