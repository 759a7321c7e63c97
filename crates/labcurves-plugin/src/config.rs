//! Plug-in configuration.
//!
//! Every field has a default, so an empty JSON object is a valid
//! configuration file.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{PluginError, PluginResult};

/// How to find and run the external curves binary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolConfig {
    /// Explicit binary path. Overrides install-relative lookup.
    pub binary: Option<PathBuf>,
    /// Directory the plug-in is installed in. Defaults to the directory of
    /// the running executable.
    pub install_dir: Option<PathBuf>,
    /// Arguments placed before the temporary file path.
    pub args: Vec<String>,
    /// Treat an untouched temporary file as a failure.
    pub require_rewrite: bool,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            binary: None,
            install_dir: None,
            args: Vec::new(),
            require_rewrite: true,
        }
    }
}

/// Complete plug-in configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginConfig {
    pub tool: ToolConfig,
    /// Extension requested from the host's temp naming facility.
    pub temp_extension: String,
    /// Named buffer carrying the source pixels to the carrier image.
    pub source_buffer: String,
    /// Named buffer carrying the processed pixels back.
    pub result_buffer: String,
    /// Name of the layer composited from the visible layers.
    pub visible_layer_name: String,
    /// Name of the layer holding the processed result.
    pub result_layer_name: String,
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            tool: ToolConfig::default(),
            temp_extension: "tif".to_string(),
            source_buffer: "labcurves-source".to_string(),
            result_buffer: "labcurves-result".to_string(),
            visible_layer_name: "Lab curves".to_string(),
            result_layer_name: "Lab curves result".to_string(),
        }
    }
}

impl PluginConfig {
    /// Parse a JSON configuration.
    pub fn from_json(json: &str) -> PluginResult<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| PluginError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON configuration file.
    pub fn load(path: &Path) -> PluginResult<Self> {
        let json = fs::read_to_string(path)?;
        let config = Self::from_json(&json)
            .map_err(|e| PluginError::Config(format!("{}: {e}", path.display())))?;
        debug!(path = %path.display(), "Loaded plug-in configuration");
        Ok(config)
    }

    fn validate(&self) -> PluginResult<()> {
        if self.source_buffer.is_empty() || self.result_buffer.is_empty() {
            return Err(PluginError::Config("buffer names must not be empty".into()));
        }
        if self.source_buffer == self.result_buffer {
            return Err(PluginError::Config(
                "source and result buffers must differ".into(),
            ));
        }
        Ok(())
    }
}
