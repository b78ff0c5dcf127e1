//! Error types for taskbar-notifier

use std::path::PathBuf;
use thiserror::Error;

/// Window enumeration errors (recovered as an empty snapshot)
#[derive(Debug, Error)]
pub enum EnumError {
    #[error("EnumWindows failed: {0}")]
    EnumWindows(String),
}

/// Overlay errors (notification skipped, state machine unaffected)
#[derive(Debug, Error)]
pub enum OverlayError {
    #[error("RegisterClass({0}) failed")]
    ClassRegistration(&'static str),

    #[error("CreateWindowEx → {0}")]
    Create(String),
}

/// Data file errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{}:{line}: {reason}", path.display())]
    Malformed {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("{}: unsupported version line {found:?}", path.display())]
    Version { path: PathBuf, found: String },
}

/// External editor errors
#[derive(Debug, Error)]
pub enum EditorError {
    #[error("Failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
}
