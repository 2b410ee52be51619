use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use quiz_engine::EngineConfig;
use tracing::debug;

/// `<platform config dir>/quiz/config.toml`, when a config dir exists.
pub fn default_settings_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "quiz").map(|dirs| dirs.config_dir().join("config.toml"))
}

/// Reads engine settings from `explicit`, else the default path if present,
/// else defaults. Environment overrides are applied last.
pub fn load(explicit: Option<&Path>) -> Result<EngineConfig> {
    let path = match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => default_settings_path().filter(|path| path.is_file()),
    };
    let config = match path {
        Some(path) => {
            debug!(path = %path.display(), "loading engine settings");
            let raw = fs::read_to_string(&path)
                .with_context(|| format!("failed to read settings {}", path.display()))?;
            EngineConfig::from_toml_str(&raw)
                .with_context(|| format!("invalid settings in {}", path.display()))?
        }
        None => EngineConfig::default(),
    };
    Ok(config.with_env_overrides())
}
