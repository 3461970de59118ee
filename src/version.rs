//! `version.json` patch bump.
//!
//! The site polls `version.json` to tell clients a new build is out, so every
//! release bumps the patch number and stamps the date.

use crate::{config::SiteConfig, log};
use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::{fs, path::Path};

/// Contents of `version.json`. Unknown fields are kept as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionFile {
    pub version: String,
    #[serde(default)]
    pub last_updated: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for VersionFile {
    fn default() -> Self {
        Self {
            version: "0.0.0".into(),
            last_updated: String::new(),
            extra: Map::new(),
        }
    }
}

impl VersionFile {
    /// Read a version file, starting from `0.0.0` when missing or invalid.
    pub fn read_or_default(path: &Path) -> Self {
        fs::read_to_string(path)
            .ok()
            .and_then(|content| serde_json::from_str(&content).ok())
            .unwrap_or_default()
    }

    /// Increment the patch number and stamp `date`.
    pub fn bump(&mut self, date: NaiveDate) {
        self.version = bump_patch(&self.version);
        self.last_updated = date.format("%Y-%m-%d").to_string();
    }
}

/// `1.4.9` → `1.4.10`. Unparsable parts count as 0.
fn bump_patch(version: &str) -> String {
    let mut parts: Vec<u64> = version
        .split('.')
        .map(|part| part.trim().parse().unwrap_or(0))
        .collect();
    parts.resize(parts.len().max(3), 0);
    parts[2] += 1;

    parts
        .iter()
        .map(u64::to_string)
        .collect::<Vec<_>>()
        .join(".")
}

/// Bump the site's `version.json` and write it back.
pub fn bump_version(config: &SiteConfig) -> Result<VersionFile> {
    let path = config.version_file();
    let mut data = VersionFile::read_or_default(&path);
    data.bump(Utc::now().date_naive());

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(&data)?;
    fs::write(&path, json).with_context(|| format!("Failed to write {}", path.display()))?;

    log!("version"; "updated to {} ({})", data.version, data.last_updated);
    Ok(data)
}
