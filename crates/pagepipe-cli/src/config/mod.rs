//! Configuration loading and resolution.

use std::path::{Path, PathBuf};

use pagepipe::PipeConfig;

use crate::error::{CliError, CliResult};

/// Environment variable naming a config file.
pub const CONFIG_ENV: &str = "PAGEPIPE_CONFIG";

/// Resolve the config file path from the flag, environment, and standard locations.
///
/// Returns `None` when no config file applies and defaults should be used.
pub fn resolve_config_path(explicit: Option<&str>) -> Option<PathBuf> {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .ok()
        .map(PathBuf::from);
    resolve_config_path_in(
        explicit,
        std::env::var(CONFIG_ENV).ok(),
        Path::new("."),
        home.as_deref(),
    )
}

/// Resolution order: explicit path, `$PAGEPIPE_CONFIG`, `./.pagepipe/config.json`,
/// then `~/.pagepipe/config.json`. Only the last two must exist to be picked.
pub fn resolve_config_path_in(
    explicit: Option<&str>,
    env_path: Option<String>,
    cwd: &Path,
    home: Option<&Path>,
) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(PathBuf::from(path));
    }

    if let Some(path) = env_path.filter(|p| !p.is_empty()) {
        return Some(PathBuf::from(path));
    }

    let cwd_config = cwd.join(".pagepipe").join("config.json");
    if cwd_config.exists() {
        return Some(cwd_config);
    }

    let home_config = home?.join(".pagepipe").join("config.json");
    home_config.exists().then_some(home_config)
}

/// Load the effective configuration.
pub fn load_config(explicit: Option<&str>) -> CliResult<(PipeConfig, Option<PathBuf>)> {
    match resolve_config_path(explicit) {
        Some(path) => {
            if !path.exists() {
                return Err(CliError::ConfigNotFound(path.display().to_string()));
            }
            let config = PipeConfig::load(&path)?;
            tracing::info!("Config: {}", path.display());
            Ok((config, Some(path)))
        }
        None => Ok((PipeConfig::default(), None)),
    }
}
