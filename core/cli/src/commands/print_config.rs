use anyhow::Result;
use monai_cloud_client::ClientConfig;

pub fn exec(default: bool, config_path: &str) -> Result<()> {
    let config = match default {
        true => ClientConfig::default(),
        false => ClientConfig::load(config_path)?,
    };
    print!("{}", redacted(config).serialize()?);
    Ok(())
}

fn redacted(mut config: ClientConfig) -> ClientConfig {
    if config.api_key.is_some() {
        config.api_key = Some("<redacted>".to_string());
    }
    config
}
