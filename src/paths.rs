// LTM Gateway - Path Resolution
// Copyright 2026 Joseph Stone - All Rights Reserved
//
// Single source of truth for where the gateway keeps its data.
// Cached via OnceLock for zero-overhead repeated access.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

static DATA_ROOT_CACHE: OnceLock<PathBuf> = OnceLock::new();

const ROOT_ENV: &str = "LTM_GATEWAY_ROOT";
const ROOT_DIR_NAME: &str = ".ltm-gateway";

/// Default data directory.
///
/// Resolution order:
///   1. LTM_GATEWAY_ROOT environment variable
///   2. HOME env + /.ltm-gateway
///   3. ./.ltm-gateway
pub fn data_root() -> &'static Path {
    DATA_ROOT_CACHE.get_or_init(|| {
        resolve_root(std::env::var(ROOT_ENV).ok(), std::env::var("HOME").ok())
    })
}

fn resolve_root(root_env: Option<String>, home: Option<String>) -> PathBuf {
    if let Some(root) = root_env.filter(|r| !r.trim().is_empty()) {
        return PathBuf::from(root);
    }
    if let Some(home) = home.filter(|h| !h.trim().is_empty()) {
        return PathBuf::from(home).join(ROOT_DIR_NAME);
    }
    PathBuf::from(ROOT_DIR_NAME)
}

/// LMDB environment directory under a data dir
pub fn store_dir(data_dir: &Path) -> PathBuf {
    data_dir.join("STORE/LTM.DB")
}

/// Persistent tool-call log under a data dir
pub fn call_log_path(data_dir: &Path) -> PathBuf {
    data_dir.join("LOGS/calls.log")
}
