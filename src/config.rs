// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Configuration management
//!
//! Layers, lowest first: built-in defaults, an optional TOML file, then
//! `CABLETRACE_*` environment variables (`CABLETRACE_MAX_SEGMENTS=50`).

use crate::compat::CompatibilityTable;
use crate::trace::{PathBuilder, DEFAULT_MAX_SEGMENTS};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable prefix
pub const ENV_PREFIX: &str = "CABLETRACE";

/// Application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding topology.json
    pub data_dir: PathBuf,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Ceiling on cables per traced path
    pub max_segments: usize,
    /// Cable compatibility rules
    pub compatibility: CompatibilityTable,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            log_level: "info".to_string(),
            max_segments: DEFAULT_MAX_SEGMENTS,
            compatibility: CompatibilityTable::default(),
        }
    }
}

impl Config {
    /// Path builder honoring `max_segments`
    #[must_use]
    pub fn path_builder(&self) -> PathBuilder {
        PathBuilder::new(self.max_segments)
    }
}

fn default_data_dir() -> PathBuf {
    directories::ProjectDirs::from("com", "hyperpolymath", "cabletrace")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".cabletrace"))
}

/// Load configuration from defaults, `file` and the environment
pub fn load(file: Option<&Path>) -> Result<Config> {
    let defaults = config::Config::try_from(&Config::default())
        .context("Failed to serialize default configuration")?;

    let mut builder = config::Config::builder().add_source(defaults);
    if let Some(path) = file {
        if !path.exists() {
            anyhow::bail!("Configuration file not found: {}", path.display());
        }
        builder = builder.add_source(config::File::from(path).format(config::FileFormat::Toml));
    }
    builder = builder.add_source(config::Environment::with_prefix(ENV_PREFIX).try_parsing(true));

    builder
        .build()
        .context("Failed to build configuration")?
        .try_deserialize()
        .context("Failed to parse configuration")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NodeKind;
    use std::fs;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.max_segments, 100);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.path_builder().max_segments(), 100);
    }

    #[test]
    fn test_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cabletrace.toml");
        fs::write(
            &path,
            r#"
max_segments = 12
data_dir = "/srv/plant"

[compatibility.pairs]
interface = ["interface"]
"#,
        )
        .unwrap();

        let config = load(Some(&path)).unwrap();
        assert_eq!(config.max_segments, 12);
        assert_eq!(config.data_dir, PathBuf::from("/srv/plant"));
        assert!(!config
            .compatibility
            .is_compatible(NodeKind::Interface, NodeKind::FrontPort));
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load(Some(&dir.path().join("absent.toml"))).is_err());
    }
}
