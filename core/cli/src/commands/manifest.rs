use anyhow::{Context, Result};
use monai_cloud_client::types::Manifest;

use crate::args::ManifestSubCmd;
use crate::utils::read_json;

pub async fn exec(cmd: ManifestSubCmd) -> Result<()> {
    match cmd {
        ManifestSubCmd::Validate { file } => {
            let manifest: Manifest = read_json(&file)?;
            manifest
                .validate()
                .with_context(|| format!("Invalid manifest {}", file.to_string_lossy()))?;
            println!(
                "{} entries, {} with labels",
                manifest.data.len(),
                manifest.labeled()
            );
            Ok(())
        },
    }
}
