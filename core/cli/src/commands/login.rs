use anyhow::Result;
use monai_cloud_client::ClientConfig;

pub async fn exec(config: &ClientConfig) -> Result<()> {
    let client = config.connect().await?;
    println!(
        "Logged in to {} as user {}",
        client.session().host(),
        client.session().user_id()
    );
    Ok(())
}
