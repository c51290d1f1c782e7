use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// Payload of `POST /datasets`.
///
/// The dataset points at externally hosted object storage. The storage root is expected to
/// hold a `manifest.json` (see [`Manifest`](crate::Manifest)).
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewDataset {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
    pub format: String,
    pub client_url: String,
    pub client_id: String,
    pub client_secret: String,
}

impl NewDataset {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let required = [
            ("name", &self.name),
            ("type", &self.kind),
            ("format", &self.format),
            ("client_url", &self.client_url),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(ValidationError::MissingField(field));
            }
        }
        Ok(())
    }
}

impl fmt::Debug for NewDataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewDataset")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("kind", &self.kind)
            .field("format", &self.format)
            .field("client_url", &self.client_url)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

/// A dataset as reported by the server.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Dataset {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub client_url: Option<String>,
    #[serde(default)]
    pub client_id: Option<String>,
    /// Fields this client does not model, kept for display.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Query parameters accepted by `GET /datasets`.
#[derive(Clone, Debug, Default, Serialize, PartialEq, Eq)]
pub struct DatasetFilter {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}
