use anyhow::{Context, Result};
use monai_cloud_client::types::{Dataset, DatasetFilter, NewDataset};
use monai_cloud_client::ClientConfig;

use crate::args::DatasetSubCmd;
use crate::utils::{print_json, read_json};

pub async fn exec(cmd: DatasetSubCmd, config: &ClientConfig) -> Result<()> {
    let client = config.connect().await?;

    match cmd {
        DatasetSubCmd::Create { file } => {
            let payload: NewDataset = read_json(&file)?;
            let dataset = client
                .create_dataset(&payload)
                .await
                .context("Failed to create dataset")?;
            print_json(&dataset)
        },
        DatasetSubCmd::List { kind, format } => {
            let datasets = client
                .list::<Dataset>(&DatasetFilter { kind, format })
                .await
                .context("Failed to list datasets")?;
            print_json(&datasets)
        },
        DatasetSubCmd::Get { id } => {
            let dataset = client
                .get::<Dataset>(&id)
                .await
                .with_context(|| format!("Failed to get dataset {id}"))?;
            print_json(&dataset)
        },
        DatasetSubCmd::Delete { id } => {
            client
                .delete::<Dataset>(&id)
                .await
                .with_context(|| format!("Failed to delete dataset {id}"))?;
            println!("Deleted dataset {id}");
            Ok(())
        },
    }
}
