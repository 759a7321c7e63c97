//! Plug-in errors.

use std::path::PathBuf;
use std::process::ExitStatus;

use labcurves_host::HostError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PluginError {
    #[error("procedure not found: {0}")]
    NotFound(String),
    #[error("procedure already registered: {0}")]
    Duplicate(String),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("host error: {0}")]
    Host(#[from] HostError),
    #[error("could not create carrier image: {0}")]
    CarrierCreation(#[source] HostError),
    #[error("failed to run {}: {source}", .binary.display())]
    ToolSpawn {
        binary: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("external tool exited with {status}: {stderr}")]
    ToolFailed { status: ExitStatus, stderr: String },
    #[error("external tool did not rewrite {}", .0.display())]
    ToolDidNotRewrite(PathBuf),
    #[error("external tool removed {}", .0.display())]
    OutputMissing(PathBuf),
    #[error("could not reload {}: {source}", .path.display())]
    Reload {
        path: PathBuf,
        #[source]
        source: HostError,
    },
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for plug-in operations.
pub type PluginResult<T> = std::result::Result<T, PluginError>;
