use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// Index file stored as `manifest.json` at the root of a dataset's object storage.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Manifest {
    #[serde(default)]
    pub root_path: String,
    pub data: Vec<ManifestEntry>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ManifestEntry {
    pub image: ManifestFile,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<ManifestFile>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ManifestFile {
    pub path: String,
    #[serde(default)]
    pub id: Option<String>,
}

impl Manifest {
    /// Checks what can be checked without touching the storage: entries exist, paths are
    /// non-empty and image ids are unique.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.data.is_empty() {
            return Err(ValidationError::EmptyManifest);
        }

        let mut seen = HashSet::new();
        for (index, entry) in self.data.iter().enumerate() {
            let mut files = std::iter::once(&entry.image).chain(entry.label.iter());
            if files.any(|file| file.path.trim().is_empty()) {
                return Err(ValidationError::EmptyPath(index));
            }
            if let Some(id) = &entry.image.id {
                if !seen.insert(id.as_str()) {
                    return Err(ValidationError::DuplicateImageId(id.clone()));
                }
            }
        }

        Ok(())
    }

    /// Number of entries that carry a label.
    pub fn labeled(&self) -> usize {
        self.data.iter().filter(|e| e.label.is_some()).count()
    }
}
