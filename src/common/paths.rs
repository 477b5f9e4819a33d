//! Configuration file paths
//!
//! Uses the directories crate for platform-appropriate locations:
//! - Linux: `~/.config/gdbmi-engine/`
//! - macOS: `~/Library/Application Support/gdbmi-engine/`
//! - Windows: `%APPDATA%\gdbmi-engine\`

use std::path::PathBuf;

const PROJECT_NAME: &str = "gdbmi-engine";

/// Get the configuration directory path
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", PROJECT_NAME)
        .map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the configuration file
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("config.toml"))
}
