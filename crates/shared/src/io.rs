use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::models::DigestData;

pub const PREVIEW_FILENAME: &str = "last_preview.html";
pub const SNAPSHOT_FILENAME: &str = "last_digest.json";

/// Directory for dry-run output, created on demand
pub fn output_dir(base: &Path) -> Result<PathBuf> {
    let dir = base.join("out");
    fs::create_dir_all(&dir).context("Failed to create output directory")?;
    Ok(dir)
}

pub fn save_preview(dir: &Path, html: &str) -> Result<PathBuf> {
    let filepath = dir.join(PREVIEW_FILENAME);
    fs::write(&filepath, html).context("Failed to write preview file")?;
    Ok(filepath)
}

/// Save an assembled issue so it can be rendered again later
pub fn save_snapshot(dir: &Path, data: &DigestData) -> Result<PathBuf> {
    let filepath = dir.join(SNAPSHOT_FILENAME);

    let json = serde_json::to_string_pretty(data).context("Failed to serialize digest")?;

    fs::write(&filepath, json).context("Failed to write digest snapshot")?;

    Ok(filepath)
}

pub fn load_snapshot(filepath: &Path) -> Result<DigestData> {
    if !filepath.exists() {
        anyhow::bail!("Digest snapshot not found: {}", filepath.display());
    }

    let content = fs::read_to_string(filepath)
        .with_context(|| format!("Failed to read digest snapshot: {}", filepath.display()))?;

    let data: DigestData = serde_json::from_str(&content).with_context(|| {
        format!(
            "Failed to parse digest JSON from {}. The file may be corrupted or not a digest snapshot.",
            filepath.display()
        )
    })?;

    if data.version != "1.0" {
        anyhow::bail!(
            "Unsupported digest snapshot version: {}. Expected 1.0. Please regenerate it with weekly-digest --dry-run.",
            data.version
        );
    }

    if !data.digest.has_content() {
        anyhow::bail!(
            "Digest snapshot {} has no selected content. The file may be incomplete.",
            filepath.display()
        );
    }

    Ok(data)
}
