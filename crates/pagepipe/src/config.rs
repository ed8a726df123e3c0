//! Cache tuning and transport configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::types::{PipeError, PipeResult};

/// Default page size of the grid control.
pub const DEFAULT_PAGE_SIZE: usize = 25;

/// Default HTTP timeout in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Tuning knobs for the page cache and its HTTP transport.
///
/// Pipe factor tiers are checked in order: "all", then the default page
/// size, then the large-page threshold, then everything else.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipeConfig {
    /// Page size the grid control shows by default.
    pub default_page_size: usize,
    /// Pipe factor when the request length equals `default_page_size`.
    pub default_factor: usize,
    /// Pipe factor for "all" and for lengths above `large_page_threshold`.
    pub large_factor: usize,
    pub large_page_threshold: usize,
    /// Pipe factor for every other length.
    pub other_factor: usize,
    /// HTTP request timeout.
    pub timeout_ms: u64,
    pub user_agent: String,
}

impl Default for PipeConfig {
    fn default() -> Self {
        Self {
            default_page_size: DEFAULT_PAGE_SIZE,
            default_factor: 6,
            large_factor: 2,
            large_page_threshold: 49,
            other_factor: 4,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            user_agent: format!("pagepipe/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl PipeConfig {
    /// Load a JSON config file. Missing keys take their defaults.
    pub fn load(path: &Path) -> PipeResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: PipeConfig = serde_json::from_str(&raw).map_err(|e| {
            PipeError::Config(format!("cannot parse {}: {e}", path.display()))
        })?;
        config.validate()?;
        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Write this config as pretty JSON, creating parent directories.
    pub fn save(&self, path: &Path) -> PipeResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn validate(&self) -> PipeResult<()> {
        if self.default_page_size == 0 {
            return Err(PipeError::Config(
                "default_page_size must be at least 1".to_string(),
            ));
        }
        for (name, factor) in [
            ("default_factor", self.default_factor),
            ("large_factor", self.large_factor),
            ("other_factor", self.other_factor),
        ] {
            if factor == 0 {
                return Err(PipeError::Config(format!("{name} must be at least 1")));
            }
        }
        if self.timeout_ms == 0 {
            return Err(PipeError::Config("timeout_ms must be at least 1".to_string()));
        }
        Ok(())
    }
}
