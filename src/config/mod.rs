//! Configuration module for CScan-RS
//!
//! Handles loading and validating settings from YAML files and environment variables.

mod settings;

pub use settings::*;
pub(crate) use settings::seconds;

use anyhow::Result;
use std::path::{Path, PathBuf};
use tracing::info;

/// Environment variable pointing at an explicit settings file
pub const SETTINGS_PATH_VAR: &str = "CSCAN_SETTINGS_PATH";

/// Candidate settings files, in lookup order
pub fn search_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Ok(path) = std::env::var(SETTINGS_PATH_VAR) {
        paths.push(PathBuf::from(path));
    }
    paths.push(PathBuf::from("settings.yml"));
    paths.push(PathBuf::from("config/settings.yml"));
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("cscan-rs").join("settings.yml"));
    }
    paths
}

/// Load settings from `explicit`, or from the first existing search path,
/// or fall back to defaults. Environment overrides are applied last.
pub fn load(explicit: Option<&Path>) -> Result<Settings> {
    let mut settings = match explicit {
        Some(path) => Settings::from_file(path)?,
        None => match search_paths().into_iter().find(|p| p.is_file()) {
            Some(path) => {
                info!("Loading settings from {}", path.display());
                Settings::from_file(&path)?
            }
            None => {
                info!("No settings file found, using defaults");
                Settings::default()
            }
        },
    };
    settings.merge_env();
    settings.validate()?;
    Ok(settings)
}
