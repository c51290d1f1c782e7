#![allow(dead_code)]

use std::time::Duration;

use httpmock::MockServer;
use monai_cloud_client::session::parse_host;
use monai_cloud_client::{ApiClient, PollConfig, Session};
use serde_json::{json, Value};

pub const USER: &str = "u1";
pub const TOKEN: &str = "token-1";

/// A client with an already established session against the mock server.
pub fn client(server: &MockServer) -> ApiClient {
    let host = parse_host(&server.base_url()).unwrap();
    ApiClient::new(reqwest::Client::new(), Session::from_parts(host, USER, TOKEN))
}

pub fn path(suffix: &str) -> String {
    format!("/api/v1/users/{USER}/{suffix}")
}

pub fn bearer() -> String {
    format!("Bearer {TOKEN}")
}

pub fn fast_poll() -> PollConfig {
    PollConfig {
        interval: Duration::from_millis(10),
        timeout: Duration::from_secs(5),
        ..Default::default()
    }
}

pub fn dataset_payload() -> Value {
    json!({
        "name": "spleen",
        "type": "semantic_segmentation",
        "format": "monai",
        "client_url": "https://storage.example.org/spleen",
        "client_id": "id",
        "client_secret": "secret"
    })
}

pub fn job_body(id: &str, status: &str) -> Value {
    json!({ "id": id, "status": status, "action": "train" })
}
