// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Data directory and configuration file resolution.

use std::path::{Path, PathBuf};

use printbox_core::PrintboxConfig;
use printbox_core::error::Result;
use tracing::{info, warn};

/// Environment variable pointing at an explicit config file.
pub const ENV_CONFIG_PATH: &str = "PRINTBOX_CONFIG";

const CONFIG_FILE: &str = "config.json";

/// Return the application data directory, creating it if needed.
pub fn data_dir() -> PathBuf {
    let dir = dirs_fallback().join("printbox");
    std::fs::create_dir_all(&dir).ok();
    dir
}

/// `$PRINTBOX_CONFIG`, else `config.json` in the data directory.
pub fn config_path() -> PathBuf {
    match std::env::var_os(ENV_CONFIG_PATH) {
        Some(path) => PathBuf::from(path),
        None => data_dir().join(CONFIG_FILE),
    }
}

/// Load, apply environment overrides, and validate.
pub fn load_config() -> Result<PrintboxConfig> {
    let path = config_path();
    let mut config = load_or_init(&path)?;
    config.apply_env();
    config.validate()?;
    info!(
        path = %path.display(),
        printer = %config.printer.address(),
        "configuration ready"
    );
    Ok(config)
}

/// Load `path`, writing the defaults there first if it does not exist yet
/// so operators have a file to edit.
pub fn load_or_init(path: &Path) -> Result<PrintboxConfig> {
    if !path.exists() {
        let defaults = PrintboxConfig::default();
        match defaults.save(path) {
            Ok(()) => info!(path = %path.display(), "wrote default configuration"),
            Err(e) => warn!(path = %path.display(), error = %e, "could not write default configuration"),
        }
        return Ok(defaults);
    }
    PrintboxConfig::load(path)
}

fn dirs_fallback() -> PathBuf {
    // Try XDG data dir, then fallback to home
    if let Ok(xdg) = std::env::var("XDG_DATA_HOME") {
        return PathBuf::from(xdg);
    }
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".local").join("share");
    }
    // Last resort
    PathBuf::from("/tmp")
}
