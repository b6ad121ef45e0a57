use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

pub fn overwrite_dir<P: AsRef<Path>>(path: P) -> Result<()> {
    let path_ref = path.as_ref();
    let path_str = path_ref.to_string_lossy();

    if fs::exists(path_ref)
        .with_context(|| format!("Failed to check if directory exists: {}", path_str))?
    {
        fs::remove_dir_all(path_ref)
            .with_context(|| format!("Failed to remove existing directory: {}", path_str))?;
    }

    fs::create_dir_all(path_ref)
        .with_context(|| format!("Failed to create directory: {}", path_str))
}

/// Pretty-printed JSON artifact.
pub fn write_json<P: AsRef<Path>, T: Serialize + ?Sized>(path: P, value: &T) -> Result<()> {
    let path_ref = path.as_ref();
    let json = serde_json::to_string_pretty(value)
        .with_context(|| format!("Failed to serialize {}", path_ref.display()))?;
    fs::write(path_ref, json).with_context(|| format!("Failed to write {}", path_ref.display()))
}

pub fn write_text<P: AsRef<Path>>(path: P, text: &str) -> Result<()> {
    let path_ref = path.as_ref();
    fs::write(path_ref, text).with_context(|| format!("Failed to write {}", path_ref.display()))
}

/// True when `path` is a file with at least one byte in it.
pub fn non_empty_file<P: AsRef<Path>>(path: P) -> bool {
    fs::metadata(path)
        .map(|meta| meta.is_file() && meta.len() > 0)
        .unwrap_or(false)
}
