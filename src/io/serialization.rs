// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Configuration serialization and deserialization.
//!
//! The configuration can be written and read as YAML or JSON. The format is
//! picked from the file extension.

use crate::models::config::AppConfig;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// `<config_dir>/maskforge/config.yaml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs_next::config_dir().map(|dir| dir.join("maskforge").join("config.yaml"))
}

/// Export configuration to YAML format.
pub fn export_yaml(config: &AppConfig, path: &Path) -> Result<()> {
    let yaml = serde_yaml::to_string(config)?;
    std::fs::write(path, yaml)?;
    Ok(())
}

/// Export configuration to JSON format.
pub fn export_json(config: &AppConfig, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(config)?;
    std::fs::write(path, json)?;
    Ok(())
}

pub fn import_yaml(path: &Path) -> Result<AppConfig> {
    let yaml = std::fs::read_to_string(path)?;
    let config = serde_yaml::from_str(&yaml)?;
    Ok(config)
}

pub fn import_json(path: &Path) -> Result<AppConfig> {
    let json = std::fs::read_to_string(path)?;
    let config = serde_json::from_str(&json)?;
    Ok(config)
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

/// Load the configuration at `path`. A missing file yields the defaults.
pub fn load_config(path: &Path) -> Result<AppConfig> {
    if !path.exists() {
        log::info!("No configuration at {}, using defaults", path.display());
        return Ok(AppConfig::default());
    }
    let config = if is_json(path) {
        import_json(path)
    } else {
        import_yaml(path)
    };
    config.with_context(|| format!("Failed to read configuration {}", path.display()))
}
