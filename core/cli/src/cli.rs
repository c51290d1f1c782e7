use anyhow::Result;
use clap::{CommandFactory, Parser};
use monai_cloud_client::ClientConfig;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use crate::args::{Args, Command};
use crate::commands::{dataset, experiment, job, login, manifest, print_config, run};

pub struct Cli {
    args: Args,
}

impl Cli {
    pub fn new(args: Args) -> Self {
        Self { args }
    }

    pub fn parse() -> Self {
        Self {
            args: Args::parse(),
        }
    }

    pub async fn exec(self) -> Result<()> {
        self.setup();

        let Args {
            config: config_path,
            host,
            cmd,
            ..
        } = self.args;
        let config = || load_config(&config_path, host.as_deref());

        match cmd {
            Command::Completions { shell } => {
                clap_complete::generate(
                    shell,
                    &mut Args::command(),
                    "monai-cloud",
                    &mut std::io::stdout(),
                );
                Ok(())
            },
            Command::Manifest(cmd) => manifest::exec(cmd).await,
            Command::PrintConfig { default } => print_config::exec(default, &config_path),
            Command::Login => login::exec(&config()?).await,
            Command::Dataset(cmd) => dataset::exec(cmd, &config()?).await,
            Command::Experiment(cmd) => experiment::exec(cmd, &config()?).await,
            Command::Job(cmd) => job::exec(cmd, &config()?).await,
            Command::Run { workflow, keep } => run::exec(&workflow, keep, &config()?).await,
        }
    }

    fn setup(&self) {
        // Build the filter from cli args, or environment variable
        let env_filter = EnvFilter::builder()
            .with_default_directive(
                match self.args.verbose {
                    0 => LevelFilter::INFO,
                    1 => LevelFilter::DEBUG,
                    _2_or_more => LevelFilter::TRACE,
                }
                .into(),
            )
            .from_env_lossy();

        tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_file(self.args.with_log_locations)
                    .with_line_number(self.args.with_log_locations),
            )
            .with(env_filter)
            .init();
    }
}

/// Loads the configuration file and applies the command line overrides.
fn load_config(path: &str, host: Option<&str>) -> Result<ClientConfig> {
    let mut config = ClientConfig::load(path)?;
    if let Some(host) = host {
        config.host = host.to_string();
    }
    Ok(config)
}
