//! Configuration file handling

use serde::Deserialize;
use std::path::PathBuf;

use super::paths::config_path;
use super::{Error, Result};

/// Main configuration structure for a debug session
#[derive(Debug, Deserialize, Default)]
pub struct DebuggerConfig {
    /// Debugger executable settings
    #[serde(default)]
    pub gdb: GdbConfig,

    /// Session behavior settings
    #[serde(default)]
    pub session: SessionConfig,
}

/// Debugger executable configuration
#[derive(Debug, Deserialize, Default)]
pub struct GdbConfig {
    /// Path to the gdb executable; searched in PATH when absent
    pub executable: Option<PathBuf>,

    /// Additional arguments passed to gdb at launch
    #[serde(default)]
    pub args: Vec<String>,

    /// Commands sent to gdb right after the session starts
    #[serde(default)]
    pub initial_commands: Vec<String>,
}

/// Session behavior settings
#[derive(Debug, Deserialize)]
pub struct SessionConfig {
    /// Send `-enable-pretty-printing` on session start
    #[serde(default = "default_true")]
    pub enable_pretty_printing: bool,

    /// Send `catch throw` / `catch catch` on session start
    #[serde(default)]
    pub catch_exceptions: bool,

    /// Automatically select the first frame with source info after a stop
    #[serde(default = "default_true")]
    pub auto_switch_frame: bool,

    /// Child window requested from dynamic variable objects
    /// (`-var-set-update-range 0 N`)
    #[serde(default = "default_update_range")]
    pub dynamic_update_range: i64,

    /// Maximum stack depth fetched by a backtrace request
    #[serde(default = "default_backtrace_depth")]
    pub backtrace_depth: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            enable_pretty_printing: default_true(),
            catch_exceptions: false,
            auto_switch_frame: default_true(),
            dynamic_update_range: default_update_range(),
            backtrace_depth: default_backtrace_depth(),
        }
    }
}

fn default_true() -> bool {
    true
}
fn default_update_range() -> i64 {
    100
}
fn default_backtrace_depth() -> u32 {
    30
}

impl DebuggerConfig {
    /// Load configuration from the default config file
    ///
    /// Returns default configuration if the file doesn't exist
    pub fn load() -> Result<Self> {
        if let Some(path) = config_path() {
            if path.exists() {
                let content = std::fs::read_to_string(&path).map_err(|e| Error::FileRead {
                    path: path.display().to_string(),
                    error: e.to_string(),
                })?;
                return toml::from_str(&content).map_err(|e| Error::ConfigParse(e.to_string()));
            }
        }
        Ok(Self::default())
    }

    /// Resolve the gdb executable
    ///
    /// Falls back to searching PATH if not explicitly configured
    pub fn gdb_executable(&self) -> Result<PathBuf> {
        if let Some(path) = &self.gdb.executable {
            return Ok(path.clone());
        }
        which::which("gdb").map_err(|_| Error::GdbNotFound {
            searched: "$PATH".to_string(),
        })
    }
}
