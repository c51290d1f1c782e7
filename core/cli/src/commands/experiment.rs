use anyhow::{Context, Result};
use monai_cloud_client::types::{
    latest_base_experiment,
    Experiment,
    ExperimentFilter,
    NewExperiment,
};
use monai_cloud_client::ClientConfig;

use crate::args::ExperimentSubCmd;
use crate::utils::{print_json, read_json};

pub async fn exec(cmd: ExperimentSubCmd, config: &ClientConfig) -> Result<()> {
    let client = config.connect().await?;

    match cmd {
        ExperimentSubCmd::Create { file } => {
            let payload: NewExperiment = read_json(&file)?;
            let experiment = client
                .create_experiment(&payload)
                .await
                .context("Failed to create experiment")?;
            print_json(&experiment)
        },
        ExperimentSubCmd::List {
            network_arch,
            user_only,
            name,
        } => {
            let filter = ExperimentFilter {
                network_arch,
                user_only: user_only.then_some(true),
                name,
            };
            let experiments = client
                .list::<Experiment>(&filter)
                .await
                .context("Failed to list experiments")?;
            print_json(&experiments)
        },
        ExperimentSubCmd::Get { id } => {
            let experiment = client
                .get::<Experiment>(&id)
                .await
                .with_context(|| format!("Failed to get experiment {id}"))?;
            print_json(&experiment)
        },
        ExperimentSubCmd::Delete { id } => {
            client
                .delete::<Experiment>(&id)
                .await
                .with_context(|| format!("Failed to delete experiment {id}"))?;
            println!("Deleted experiment {id}");
            Ok(())
        },
        ExperimentSubCmd::Base { network_arch, name } => {
            let filter = ExperimentFilter {
                network_arch: Some(network_arch.clone()),
                ..Default::default()
            };
            let experiments = client
                .list::<Experiment>(&filter)
                .await
                .context("Failed to list base experiments")?;
            let base = latest_base_experiment(&experiments, &network_arch, name.as_deref())
                .with_context(|| format!("No base experiment found for {network_arch}"))?;
            print_json(base)
        },
    }
}
