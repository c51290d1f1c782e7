//! Client for the MONAI Cloud REST API.
//!
//! [`ApiClient`] holds an authenticated [`Session`] and exposes the dataset, experiment and job
//! endpoints. [`wait_for_job`] polls a job until it settles, [`CleanupTracker`] deletes created
//! resources in dependency order and [`Workflow`] chains everything from dataset creation to
//! downloading the result.

pub mod cleanup;
pub mod client;
pub mod config;
pub mod error;
mod jobs;
pub mod poll;
pub mod session;
pub mod workflow;

pub use cleanup::{CleanupReport, CleanupStep, CleanupTracker};
pub use client::{ApiClient, Resource};
pub use config::ClientConfig;
pub use error::ApiError;
pub use monai_cloud_types as types;
pub use poll::{wait_for_job, JobSource, PollConfig, PollOutcome};
pub use session::Session;
pub use workflow::{Workflow, WorkflowConfig, WorkflowReport};
