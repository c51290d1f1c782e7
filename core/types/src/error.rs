use thiserror::Error;

/// A payload rejected before it is sent to the server.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Network architecture '{0}' requires a bundle_url")]
    BundleUrlRequired(String),

    #[error("Experiment must reference at least one dataset")]
    NoDatasets,

    #[error("Manifest has no data entries")]
    EmptyManifest,

    #[error("Manifest entry {0} has an empty path")]
    EmptyPath(usize),

    #[error("Manifest image id '{0}' is used more than once")]
    DuplicateImageId(String),
}
