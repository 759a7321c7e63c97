//! Lab Curves Plugin - round-trips an image through an external L*a*b* curves tool.
//!
//! The procedure snapshots a layer (or the visible composite), hands it to
//! the external binary as a temporary TIFF, and pastes the rewritten file
//! back as a new layer inside one undo group.

pub mod config;
pub mod error;
pub mod external;
pub mod procedure;
pub mod registry;

pub use config::{PluginConfig, ToolConfig};
pub use error::{PluginError, PluginResult};
pub use external::{ExternalTool, FileState, ToolRun};
pub use procedure::{apply_lab_curves, CurvesOutcome, SourceMode};
pub use registry::{
    lab_curves_descriptor, ParamDescriptor, ParamKind, ProcedureDescriptor, ProcedureRegistry,
    RadioOption,
};
