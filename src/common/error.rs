//! Error types for the MI engine
//!
//! Parse-level errors are always recoverable: callers log the offending
//! line or record and move on. Transport errors end the session.

use std::io;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the MI engine
#[derive(Error, Debug)]
pub enum Error {
    // === MI Parse Errors ===
    #[error("Malformed MI output: {0}")]
    Parse(String),

    #[error("Line matches no MI record shape: {0}")]
    UnparsableLine(String),

    // === Session Errors ===
    #[error("No debug session active")]
    SessionNotActive,

    #[error("Debug session already active")]
    SessionAlreadyActive,

    #[error("Debugger process is gone: {0}")]
    TransportClosed(String),

    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

    #[error("Failed to read file '{path}': {error}")]
    FileRead { path: String, error: String },

    #[error("gdb executable not found. Searched: {searched}")]
    GdbNotFound { searched: String },

    // === IO Errors ===
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    /// Create a parse error for a malformed value or record
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse(message.into())
    }

    /// Create an unparsable-line error, preserving the raw line for logs
    pub fn unparsable(line: impl Into<String>) -> Self {
        Self::UnparsableLine(line.into())
    }
}
