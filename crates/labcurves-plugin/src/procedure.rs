//! The Lab curves procedure.
//!
//! Steps, all against the host interface:
//! 1. open an undo group on the target image
//! 2. pick the source: the given layer, or a new layer composited from
//!    everything visible
//! 3. copy it through a named buffer into a carrier image
//! 4. export the carrier as a temporary TIFF and run the external tool on it
//! 5. reload the rewritten file, copy it through a second named buffer and
//!    anchor it onto a new result layer above the source
//! 6. delete the temporary file, carrier image and buffers, close the undo
//!    group, flush displays
//!
//! Cleanup and the undo group close run on every path, including failures.

use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::process::ExitStatus;

use labcurves_core::{DrawableId, ImageId};
use labcurves_host::{Host, LayerPosition};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::PluginConfig;
use crate::error::{PluginError, PluginResult};
use crate::external::{ExternalTool, FileState};

/// Which pixels are sent to the external tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceMode {
    /// Composite all visible layers into a new layer and process that.
    #[default]
    NewFromVisible,
    /// Process the given drawable.
    CurrentLayer,
}

impl SourceMode {
    /// Decode the radio parameter value.
    pub fn from_param(value: i32) -> PluginResult<Self> {
        match value {
            1 => Ok(Self::NewFromVisible),
            0 => Ok(Self::CurrentLayer),
            other => Err(PluginError::InvalidArgument(format!(
                "visible must be 0 or 1, got {other}"
            ))),
        }
    }

    /// Radio parameter value for this mode.
    pub fn as_param(self) -> i32 {
        match self {
            Self::NewFromVisible => 1,
            Self::CurrentLayer => 0,
        }
    }
}

/// What a successful run added to the target image.
#[derive(Debug, Clone, Copy)]
pub struct CurvesOutcome {
    /// Layer whose pixels were sent to the tool.
    pub source: DrawableId,
    /// Composited layer added in `NewFromVisible` mode.
    pub composited: Option<DrawableId>,
    /// Layer holding the processed pixels.
    pub result: DrawableId,
    pub tool_status: ExitStatus,
}

/// Temporary objects created during a run.
#[derive(Debug, Default)]
struct Scratch {
    carrier: Option<ImageId>,
    temp_file: Option<PathBuf>,
    buffers: Vec<String>,
    /// Layer created for the target image but not yet in its stack.
    pending_layer: Option<DrawableId>,
}

impl Scratch {
    fn copy<H: Host + ?Sized>(
        &mut self,
        host: &mut H,
        drawable: DrawableId,
        buffer: &str,
    ) -> PluginResult<()> {
        host.copy_named(drawable, buffer)?;
        self.buffers.push(buffer.to_string());
        Ok(())
    }

    fn delete_buffer<H: Host + ?Sized>(&mut self, host: &mut H, buffer: &str) -> PluginResult<()> {
        self.buffers.retain(|b| b != buffer);
        host.delete_buffer(buffer)?;
        Ok(())
    }

    /// Insert a freshly created layer, releasing it if the insert fails.
    fn add_layer<H: Host + ?Sized>(
        &mut self,
        host: &mut H,
        image: ImageId,
        layer: DrawableId,
        position: LayerPosition,
    ) -> PluginResult<()> {
        self.pending_layer = Some(layer);
        host.add_layer(image, layer, position)?;
        self.pending_layer = None;
        Ok(())
    }

    /// Remove everything still held. Failures are logged, not returned.
    fn release<H: Host + ?Sized>(&mut self, host: &mut H) {
        if let Some(layer) = self.pending_layer.take() {
            if let Err(e) = host.delete_layer(layer) {
                warn!(%layer, error = %e, "Failed to delete detached layer");
            }
        }
        for buffer in self.buffers.drain(..) {
            if let Err(e) = host.delete_buffer(&buffer) {
                warn!(buffer = %buffer, error = %e, "Failed to delete named buffer");
            }
        }
        if let Some(path) = self.temp_file.take() {
            match fs::remove_file(&path) {
                Ok(()) => debug!(path = %path.display(), "Temporary file removed"),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove temporary file"),
            }
        }
        if let Some(carrier) = self.carrier.take() {
            if let Err(e) = host.delete_image(carrier) {
                warn!(%carrier, error = %e, "Failed to delete carrier image");
            }
        }
    }
}

/// Run the external curves tool on `drawable` (or the visible composite)
/// and add the processed pixels to `image` as a new layer.
pub fn apply_lab_curves<H: Host + ?Sized>(
    host: &mut H,
    image: ImageId,
    drawable: DrawableId,
    mode: SourceMode,
    config: &PluginConfig,
) -> PluginResult<CurvesOutcome> {
    let tool = ExternalTool::from_config(&config.tool);
    info!(%image, %drawable, ?mode, tool = %tool.binary().display(), "Applying Lab curves");

    host.begin_undo_group(image)?;
    let mut scratch = Scratch::default();
    let result = run_steps(host, image, drawable, mode, config, &tool, &mut scratch);
    scratch.release(host);
    let closed = host.end_undo_group(image);

    match (result, closed) {
        (Ok(outcome), Ok(())) => {
            host.flush_displays();
            info!(result = %outcome.result, status = %outcome.tool_status, "Lab curves applied");
            Ok(outcome)
        }
        (Ok(_), Err(e)) => Err(e.into()),
        (Err(e), closed) => {
            if let Err(close_err) = closed {
                warn!(%image, error = %close_err, "Failed to close undo group");
            }
            warn!(%image, error = %e, "Lab curves failed");
            Err(e)
        }
    }
}

fn run_steps<H: Host + ?Sized>(
    host: &mut H,
    image: ImageId,
    drawable: DrawableId,
    mode: SourceMode,
    config: &PluginConfig,
    tool: &ExternalTool,
    scratch: &mut Scratch,
) -> PluginResult<CurvesOutcome> {
    let (source, composited) = match mode {
        SourceMode::CurrentLayer => (drawable, None),
        SourceMode::NewFromVisible => {
            let layer = host.layer_from_visible(image, &config.visible_layer_name)?;
            scratch.add_layer(host, image, layer, LayerPosition::Top)?;
            (layer, Some(layer))
        }
    };

    // Carrier image, undo off: it only exists to be written to disk.
    scratch.copy(host, source, &config.source_buffer)?;
    let carrier = host
        .paste_named_as_new(&config.source_buffer)
        .map_err(PluginError::CarrierCreation)?;
    scratch.carrier = Some(carrier);
    scratch.delete_buffer(host, &config.source_buffer)?;
    host.disable_undo(carrier)?;
    let carrier_layer = host.active_drawable(carrier)?;

    let temp = host.temp_name(&config.temp_extension)?;
    scratch.temp_file = Some(temp.clone());
    host.set_progress_text("Saving a copy");
    host.export_tiff(carrier, carrier_layer, &temp)?;
    debug!(path = %temp.display(), %carrier, "Carrier exported");

    host.set_progress_text("Running LabCurves...");
    host.progress_pulse();
    let run = tool.run(&temp)?;
    match run.file {
        FileState::Missing => return Err(PluginError::OutputMissing(temp)),
        FileState::Unchanged if config.tool.require_rewrite => {
            return Err(PluginError::ToolDidNotRewrite(temp))
        }
        FileState::Unchanged | FileState::Rewritten => {}
    }

    let processed = host
        .load_layer(carrier, &temp)
        .map_err(|source| PluginError::Reload {
            path: temp.clone(),
            source,
        })?;
    host.add_layer(carrier, processed, LayerPosition::Top)?;
    scratch.copy(host, processed, &config.result_buffer)?;

    let result = host.new_layer(image, &config.result_layer_name, source)?;
    scratch.add_layer(host, image, result, LayerPosition::Above(source))?;
    let floating = host.paste_named_into(result, &config.result_buffer)?;
    scratch.delete_buffer(host, &config.result_buffer)?;
    host.anchor_floating(floating)?;

    Ok(CurvesOutcome {
        source,
        composited,
        result,
        tool_status: run.status,
    })
}
