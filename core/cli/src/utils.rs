use std::path::Path;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Reads a json file into `T`.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Could not read {}", path.to_string_lossy()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Could not parse {} as json", path.to_string_lossy()))
}

/// Prints a value as pretty json on stdout.
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
