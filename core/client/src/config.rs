use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{env, fs};

use anyhow::{anyhow, Context, Result};
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};

use crate::client::ApiClient;
use crate::poll::PollConfig;

/// Environment variable that overrides the `api_key` of the configuration file.
pub const API_KEY_ENV: &str = "MONAI_CLOUD_API_KEY";

lazy_static! {
    pub static ref MONAI_CLOUD_HOME_DIR: PathBuf = env::var("MONAI_CLOUD_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            env::var("HOME")
                .map(PathBuf::from)
                .unwrap_or_default()
                .join(".monai-cloud")
        });
}

/// Client settings, stored as toml.
#[derive(Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClientConfig {
    /// Base url of the service, without the `/api/v1` suffix.
    pub host: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Applies to every single request, downloads included.
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
    pub download_dir: PathBuf,
    pub poll: PollConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: "http://localhost:8000".to_string(),
            api_key: None,
            request_timeout: Duration::from_secs(10 * 60),
            download_dir: PathBuf::from("."),
            poll: PollConfig::default(),
        }
    }
}

impl ClientConfig {
    pub fn default_path() -> PathBuf {
        MONAI_CLOUD_HOME_DIR.join("config.toml")
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(anyhow!(
                "The configuration file '{}' does not exist. Run `print-config --default` to get a starting point.",
                path.to_string_lossy()
            ));
        }

        let content = fs::read_to_string(path).with_context(|| {
            format!(
                "IO: Could not load the configuration file '{}'.",
                path.to_string_lossy()
            )
        })?;

        toml::from_str(&content).with_context(|| {
            format!(
                "Could not parse the configuration file '{}' as toml.",
                path.to_string_lossy()
            )
        })
    }

    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        fs::write(&path, self.serialize()?).with_context(|| {
            format!(
                "Could not write the configuration file: {}",
                path.as_ref().to_string_lossy()
            )
        })
    }

    pub fn serialize(&self) -> Result<String> {
        toml::to_string(self).context("failed to serialize config")
    }

    /// The api key from the environment, falling back to the file.
    pub fn api_key(&self) -> Option<String> {
        env::var(API_KEY_ENV)
            .ok()
            .filter(|key| !key.is_empty())
            .or_else(|| self.api_key.clone())
    }

    pub fn http_client(&self) -> Result<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(self.request_timeout)
            .user_agent(concat!("monai-cloud/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build the http client")
    }

    /// Logs in with the configured host and key.
    pub async fn connect(&self) -> Result<ApiClient> {
        let api_key = self.api_key().with_context(|| {
            format!("No api key configured: set `api_key` in the config file or {API_KEY_ENV}")
        })?;
        ApiClient::login(self.http_client()?, &self.host, &api_key)
            .await
            .with_context(|| format!("Failed to log in at {}", self.host))
    }
}
