use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// Network architecture whose experiments are built from a user supplied bundle.
pub const CUSTOM_BUNDLE_ARCH: &str = "monai_custom";

/// Payload of `POST /experiments`.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct NewExperiment {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub network_arch: String,
    /// Ids of the experiments this one starts from.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub base_experiment: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub train_datasets: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eval_dataset: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inference_dataset: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_params: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bundle_url: Option<String>,
}

impl NewExperiment {
    /// Every dataset id the experiment references, in declaration order and without repeats.
    pub fn dataset_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = Vec::new();
        let all = self
            .train_datasets
            .iter()
            .chain(self.eval_dataset.iter())
            .chain(self.inference_dataset.iter());
        for id in all {
            if !ids.contains(id) {
                ids.push(id.clone());
            }
        }
        ids
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::MissingField("name"));
        }
        if self.network_arch.trim().is_empty() {
            return Err(ValidationError::MissingField("network_arch"));
        }
        if self.network_arch == CUSTOM_BUNDLE_ARCH
            && self.bundle_url.as_deref().map_or(true, str::is_empty)
        {
            return Err(ValidationError::BundleUrlRequired(
                self.network_arch.clone(),
            ));
        }
        if self.dataset_ids().is_empty() {
            return Err(ValidationError::NoDatasets);
        }
        Ok(())
    }
}

/// An experiment as reported by the server.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Experiment {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub network_arch: Option<String>,
    #[serde(default)]
    pub base_experiment: Vec<String>,
    #[serde(default)]
    pub train_datasets: Vec<String>,
    #[serde(default)]
    pub eval_dataset: Option<String>,
    #[serde(default)]
    pub inference_dataset: Option<String>,
    #[serde(default)]
    pub model_params: Option<serde_json::Value>,
    #[serde(default)]
    pub bundle_url: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Query parameters accepted by `GET /experiments`.
#[derive(Clone, Debug, Default, Serialize, PartialEq, Eq)]
pub struct ExperimentFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_arch: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_only: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Picks the base experiment with the highest version among those matching `network_arch`
/// and, when given, `name`.
///
/// The server only filters coarsely, so the final choice happens here. Versions are compared
/// component by component on `.`, numerically where both sides are numbers. Experiments
/// without a version sort lowest.
pub fn latest_base_experiment<'a>(
    experiments: &'a [Experiment],
    network_arch: &str,
    name: Option<&str>,
) -> Option<&'a Experiment> {
    experiments
        .iter()
        .filter(|e| e.network_arch.as_deref() == Some(network_arch))
        .filter(|e| name.map_or(true, |n| e.name.as_deref() == Some(n)))
        .max_by(|a, b| compare_versions(a.version.as_deref(), b.version.as_deref()))
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
enum VersionPart<'a> {
    Number(u64),
    Text(&'a str),
}

fn version_parts(version: &str) -> Vec<VersionPart<'_>> {
    version
        .trim_start_matches('v')
        .split('.')
        .map(|part| match part.parse::<u64>() {
            Ok(n) => VersionPart::Number(n),
            Err(_) => VersionPart::Text(part),
        })
        .collect()
}

fn compare_versions(a: Option<&str>, b: Option<&str>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => version_parts(a).cmp(&version_parts(b)),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => Ordering::Equal,
    }
}
