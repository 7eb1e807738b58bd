//! Domain descriptor loading

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use xsd2sql::DomainConfig;

/// Load every `*.toml` and `*.json` descriptor in `dir`, sorted by file name.
///
/// Files whose name starts with `_` are ignored. A descriptor without a
/// `domain` key is named after its file stem. A missing directory is not an
/// error; the built-in domains still apply.
pub fn load_domain_configs(dir: &Path) -> Result<Vec<DomainConfig>> {
    if !dir.is_dir() {
        warn!(dir = %dir.display(), "config directory not found, using built-in domains only");
        return Ok(Vec::new());
    }

    let mut paths = fs::read_dir(dir)
        .with_context(|| format!("Failed to read config directory: {:?}", dir))?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<Vec<PathBuf>>>()
        .with_context(|| format!("Failed to list config directory: {:?}", dir))?;
    paths.sort();

    let mut configs = Vec::new();
    for path in paths {
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        if stem.starts_with('_') {
            debug!(path = %path.display(), "ignoring disabled descriptor");
            continue;
        }

        let config = match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => load_toml(&path, stem)?,
            Some("json") => load_json(&path, stem)?,
            _ => continue,
        };
        info!(domain = %config.domain, path = %path.display(), "loaded domain descriptor");
        configs.push(config);
    }

    Ok(configs)
}

fn read(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read domain descriptor: {:?}", path))
}

fn load_toml(path: &Path, stem: &str) -> Result<DomainConfig> {
    let mut table: toml::Table = toml::from_str(&read(path)?)
        .with_context(|| format!("Failed to parse domain descriptor: {:?}", path))?;
    if !table.contains_key("domain") {
        table.insert("domain".to_string(), toml::Value::String(stem.to_string()));
    }

    toml::Value::Table(table)
        .try_into()
        .with_context(|| format!("Invalid domain descriptor: {:?}", path))
}

fn load_json(path: &Path, stem: &str) -> Result<DomainConfig> {
    let mut value: serde_json::Value = serde_json::from_str(&read(path)?)
        .with_context(|| format!("Failed to parse domain descriptor: {:?}", path))?;
    if let Some(object) = value.as_object_mut() {
        object
            .entry("domain")
            .or_insert_with(|| serde_json::Value::String(stem.to_string()));
    }

    serde_json::from_value(value).with_context(|| format!("Invalid domain descriptor: {:?}", path))
}
