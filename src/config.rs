// LTM Gateway - Configuration
// Copyright 2026 Joseph Stone - All Rights Reserved
//
// Gateway and engine defaults. Loaded from an optional JSON file; any
// missing field falls back to its default.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Master gateway configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Root for LMDB store and call log
    pub data_dir: PathBuf,
    /// LMDB map size in megabytes
    pub map_size_mb: usize,
    pub awaken: AwakenDefaults,
    /// Recent memories fed to the dreamstate pass when a sleep call omits it
    pub sleep_recent_memories_limit: usize,
    /// Bounded wait for the final flush on shutdown
    pub shutdown_timeout_secs: u64,
    /// Append every tool call to LOGS/calls.log
    pub call_log: bool,
    /// env_logger filter when RUST_LOG is unset
    pub log_filter: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AwakenDefaults {
    pub recent_memories_limit: usize,
    pub important_memories_threshold: u32,
    pub important_memories_limit: usize,
}

impl Default for AwakenDefaults {
    fn default() -> Self {
        Self {
            recent_memories_limit: 10,
            important_memories_threshold: 7,
            important_memories_limit: 5,
        }
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            data_dir: crate::paths::data_root().to_path_buf(),
            map_size_mb: 64,
            awaken: AwakenDefaults::default(),
            sleep_recent_memories_limit: 10,
            shutdown_timeout_secs: 5,
            call_log: true,
            log_filter: "info".to_string(),
        }
    }
}

impl GatewayConfig {
    /// Load from a JSON file, or defaults when no file is given
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => {
                let json = std::fs::read_to_string(p)
                    .with_context(|| format!("Failed to read config file {:?}", p))?;
                Self::from_json(&json).with_context(|| format!("Invalid config JSON in {:?}", p))
            }
            None => Ok(Self::default()),
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the engine cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.map_size_mb == 0 {
            anyhow::bail!("map_size_mb must be greater than zero");
        }
        if self.shutdown_timeout_secs == 0 {
            anyhow::bail!("shutdown_timeout_secs must be greater than zero");
        }
        Ok(())
    }

    pub fn map_size_bytes(&self) -> usize {
        self.map_size_mb.saturating_mul(1024 * 1024)
    }

    pub fn shutdown_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.shutdown_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = GatewayConfig::default();
        assert_eq!(config.awaken.important_memories_threshold, 7);
        assert_eq!(config.map_size_bytes(), 64 * 1024 * 1024);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config = GatewayConfig::from_json(
            r#"{"data_dir": "/tmp/ltm", "awaken": {"recent_memories_limit": 3}}"#,
        )
        .unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/tmp/ltm"));
        assert_eq!(config.awaken.recent_memories_limit, 3);
        assert_eq!(config.awaken.important_memories_limit, 5);
        assert_eq!(config.shutdown_timeout_secs, 5);
    }

    #[test]
    fn zero_timeout_rejected() {
        assert!(GatewayConfig::from_json(r#"{"shutdown_timeout_secs": 0}"#).is_err());
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ltm.json");
        std::fs::write(&path, r#"{"call_log": false}"#).unwrap();
        let config = GatewayConfig::load(Some(&path)).unwrap();
        assert!(!config.call_log);
        assert!(GatewayConfig::load(Some(&dir.path().join("missing.json"))).is_err());
    }
}
