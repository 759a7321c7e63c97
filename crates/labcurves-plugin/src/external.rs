//! The external L*a*b* curves binary as a sidecar process.
//!
//! The tool receives the temporary file path as its last argument and is
//! expected to rewrite that file in place. It is run without a shell and
//! the caller blocks until it exits.

use std::collections::hash_map::DefaultHasher;
use std::fs;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};

use tracing::{debug, info, warn};

use crate::config::ToolConfig;
use crate::error::{PluginError, PluginResult};

/// Directory under the plug-in install directory holding the tool.
pub const TOOL_DIR: &str = "LabCurves";

/// File name of the tool binary.
#[cfg(windows)]
pub const TOOL_NAME: &str = "LabCurves.exe";
#[cfg(not(windows))]
pub const TOOL_NAME: &str = "LabCurves";

/// How many trailing characters of stderr to keep in errors.
const STDERR_TAIL: usize = 500;

/// What the tool did to the file it was given.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileState {
    /// Contents differ from before the run.
    Rewritten,
    /// Byte-for-byte what was there before the run.
    Unchanged,
    /// The file no longer exists.
    Missing,
}

/// Result of a successful tool run.
#[derive(Debug, Clone, Copy)]
pub struct ToolRun {
    pub status: ExitStatus,
    pub file: FileState,
}

/// A resolved external tool invocation.
#[derive(Debug, Clone)]
pub struct ExternalTool {
    binary: PathBuf,
    args: Vec<String>,
}

impl ExternalTool {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            args: Vec::new(),
        }
    }

    /// Arguments placed before the file path.
    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    /// Resolve the binary from configuration.
    ///
    /// Order: explicit path, `<install dir>/LabCurves/LabCurves`, the first
    /// `LabCurves` on `PATH`, and finally the install-relative path again so
    /// a spawn failure names where the tool was expected.
    pub fn from_config(config: &ToolConfig) -> Self {
        let binary = match &config.binary {
            Some(path) => path.clone(),
            None => {
                let beside = Self::beside(&Self::install_dir(config));
                if beside.exists() {
                    beside
                } else {
                    which::which(TOOL_NAME).unwrap_or(beside)
                }
            }
        };
        debug!(binary = %binary.display(), "Resolved external tool");
        Self::new(binary).with_args(config.args.clone())
    }

    /// Expected tool location for a plug-in installed in `install_dir`.
    pub fn beside(install_dir: &Path) -> PathBuf {
        install_dir.join(TOOL_DIR).join(TOOL_NAME)
    }

    fn install_dir(config: &ToolConfig) -> PathBuf {
        if let Some(dir) = &config.install_dir {
            return dir.clone();
        }
        std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf))
            .unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Run the tool on `file` and wait for it to exit.
    ///
    /// A non-zero exit is an error carrying the tail of the tool's stderr.
    pub fn run(&self, file: &Path) -> PluginResult<ToolRun> {
        let before = digest(file);

        info!(
            binary = %self.binary.display(),
            file = %file.display(),
            "Running external tool"
        );

        let output = Command::new(&self.binary)
            .args(&self.args)
            .arg(file)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|source| PluginError::ToolSpawn {
                binary: self.binary.clone(),
                source,
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stdout.trim().is_empty() {
            debug!(stdout = %stdout.trim_end(), "External tool output");
        }

        if !output.status.success() {
            warn!(status = %output.status, stderr = %stderr.trim_end(), "External tool failed");
            return Err(PluginError::ToolFailed {
                status: output.status,
                stderr: tail(stderr.trim_end(), STDERR_TAIL),
            });
        }

        let file_state = match (before, digest(file)) {
            (_, None) => FileState::Missing,
            (before, after) if before == after => FileState::Unchanged,
            _ => FileState::Rewritten,
        };
        debug!(status = %output.status, ?file_state, "External tool finished");

        Ok(ToolRun {
            status: output.status,
            file: file_state,
        })
    }
}

/// Length and content hash, or `None` if the file cannot be read.
fn digest(path: &Path) -> Option<(usize, u64)> {
    let bytes = fs::read(path).ok()?;
    let mut hasher = DefaultHasher::new();
    bytes.hash(&mut hasher);
    Some((bytes.len(), hasher.finish()))
}

fn tail(text: &str, max_chars: usize) -> String {
    let count = text.chars().count();
    text.chars().skip(count.saturating_sub(max_chars)).collect()
}
