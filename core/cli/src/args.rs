use std::path::PathBuf;
use std::time::Duration;

use clap::{arg, ArgAction, Parser, Subcommand};
use monai_cloud_client::config::MONAI_CLOUD_HOME_DIR;

#[derive(Parser)]
#[command(about, name = "monai-cloud", version)]
pub struct Args {
    /// Path to the toml configuration file
    #[arg(short, long, global = true, default_value_t = String::from(MONAI_CLOUD_HOME_DIR.join("config.toml").to_string_lossy().as_ref()))]
    pub config: String,
    /// Override the host from the configuration file.
    #[arg(long, global = true)]
    pub host: Option<String>,
    /// Enable code locations when printing logs.
    #[arg(long, global = true, default_value_t = false)]
    pub with_log_locations: bool,
    /// Increases the level of verbosity (the max level is -vvv).
    #[arg(short, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Check that the configured api key is accepted.
    Login,
    /// Manage datasets.
    #[command(subcommand)]
    Dataset(DatasetSubCmd),
    /// Manage experiments.
    #[command(subcommand)]
    Experiment(ExperimentSubCmd),
    /// Submit, watch and collect jobs.
    #[command(subcommand)]
    Job(JobSubCmd),
    /// Run a whole workflow described in a toml file: dataset, experiment, job, download and
    /// cleanup.
    Run {
        /// Path to the workflow file.
        workflow: PathBuf,
        /// Keep the created resources instead of deleting them at the end.
        #[arg(long)]
        keep: bool,
    },
    /// Work with dataset manifests.
    #[command(subcommand)]
    Manifest(ManifestSubCmd),
    /// Print the loaded configuration.
    PrintConfig {
        /// Print the default configuration instead of loading the current one.
        #[arg(short, long)]
        default: bool,
    },
    /// Generate shell completions
    Completions { shell: clap_complete::shells::Shell },
}

#[derive(Subcommand)]
pub enum DatasetSubCmd {
    /// Create a dataset from a json payload.
    Create {
        /// Json file with name, type, format, client_url, client_id and client_secret.
        file: PathBuf,
    },
    /// List datasets.
    List {
        /// Only datasets of this type.
        #[arg(long = "type")]
        kind: Option<String>,
        /// Only datasets of this format.
        #[arg(long)]
        format: Option<String>,
    },
    /// Show a dataset.
    Get { id: String },
    /// Delete a dataset. Delete the experiments using it first.
    Delete { id: String },
}

#[derive(Subcommand)]
pub enum ExperimentSubCmd {
    /// Create an experiment from a json payload.
    Create { file: PathBuf },
    /// List experiments.
    List {
        #[arg(long)]
        network_arch: Option<String>,
        /// Only list experiments owned by the current user.
        #[arg(long)]
        user_only: bool,
        #[arg(long)]
        name: Option<String>,
    },
    /// Show an experiment.
    Get { id: String },
    /// Delete an experiment. Cancel its running jobs first.
    Delete { id: String },
    /// Show the newest base experiment of an architecture.
    Base {
        #[arg(long)]
        network_arch: String,
        #[arg(long)]
        name: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum JobSubCmd {
    /// Submit a job and print its id.
    Submit {
        experiment: String,
        /// The action to run, for example train or inference.
        #[arg(long)]
        action: String,
        /// Json file with the job specs.
        #[arg(long)]
        specs: Option<PathBuf>,
        /// Job this one continues from.
        #[arg(long)]
        parent: Option<String>,
    },
    /// List the jobs of an experiment.
    List { experiment: String },
    /// Show a job.
    Status { experiment: String, job: String },
    /// Wait until a job is Done, fails, or the timeout elapses.
    Wait {
        experiment: String,
        job: String,
        /// Overrides the configured poll timeout, e.g. `30m`.
        #[arg(long, value_parser = humantime_serde::re::humantime::parse_duration)]
        timeout: Option<Duration>,
        /// Overrides the configured poll interval, e.g. `10s`.
        #[arg(long, value_parser = humantime_serde::re::humantime::parse_duration)]
        interval: Option<Duration>,
    },
    /// Cancel a pending or running job.
    Cancel { experiment: String, job: String },
    /// Download the result archive of a finished job.
    Download {
        experiment: String,
        job: String,
        /// Directory to store `<job>.tar.gz` in. Defaults to `download_dir` from the config.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
pub enum ManifestSubCmd {
    /// Check a local copy of a manifest.json before creating a dataset from it.
    Validate { file: PathBuf },
}
