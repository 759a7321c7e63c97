//! The host interface.
//!
//! Each method is one typed call into the host application. Handles are
//! opaque; the host owns every image, layer and named buffer. Layers
//! returned by `layer_from_visible`, `new_layer` and `load_layer` are
//! detached until passed to `add_layer`.

use std::path::{Path, PathBuf};

use labcurves_core::{DrawableId, ImageId};

use crate::error::HostResult;

/// Where `add_layer` places a layer in the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerPosition {
    /// Top of the stack.
    Top,
    /// Directly above the given layer.
    Above(DrawableId),
}

/// Operations a plug-in may perform against its host.
pub trait Host {
    // ── Undo ────────────────────────────────────────────────────

    /// Open an undo group. Groups nest.
    fn begin_undo_group(&mut self, image: ImageId) -> HostResult<()>;

    /// Close the innermost open undo group.
    fn end_undo_group(&mut self, image: ImageId) -> HostResult<()>;

    /// Stop recording undo history for `image`.
    fn disable_undo(&mut self, image: ImageId) -> HostResult<()>;

    // ── Layers ──────────────────────────────────────────────────

    /// The drawable editing operations currently target.
    fn active_drawable(&self, image: ImageId) -> HostResult<DrawableId>;

    /// Composite all visible layers into a new detached layer.
    fn layer_from_visible(&mut self, image: ImageId, name: &str) -> HostResult<DrawableId>;

    /// New transparent detached layer with the size and offset of `like`.
    fn new_layer(&mut self, image: ImageId, name: &str, like: DrawableId)
        -> HostResult<DrawableId>;

    /// Insert a detached layer into its image's stack and make it active.
    fn add_layer(
        &mut self,
        image: ImageId,
        layer: DrawableId,
        position: LayerPosition,
    ) -> HostResult<()>;

    // ── Named buffers ───────────────────────────────────────────

    /// Copy a drawable's pixels into the named buffer, replacing it.
    fn copy_named(&mut self, drawable: DrawableId, buffer: &str) -> HostResult<()>;

    /// Create a new image holding the named buffer as its only layer.
    fn paste_named_as_new(&mut self, buffer: &str) -> HostResult<ImageId>;

    /// Paste the named buffer onto `drawable` as a floating selection.
    fn paste_named_into(&mut self, drawable: DrawableId, buffer: &str) -> HostResult<DrawableId>;

    /// Remove a named buffer.
    fn delete_buffer(&mut self, buffer: &str) -> HostResult<()>;

    /// Merge a floating selection into the drawable it was pasted on.
    fn anchor_floating(&mut self, floating: DrawableId) -> HostResult<()>;

    // ── Files ───────────────────────────────────────────────────

    /// A fresh path in the host's temporary directory. The file is not created.
    fn temp_name(&mut self, extension: &str) -> HostResult<PathBuf>;

    /// Write `drawable` as an uncompressed TIFF, keeping transparent pixels.
    fn export_tiff(&mut self, image: ImageId, drawable: DrawableId, path: &Path)
        -> HostResult<()>;

    /// Read an image file as a new detached layer of `image`.
    fn load_layer(&mut self, image: ImageId, path: &Path) -> HostResult<DrawableId>;

    /// Delete a layer that was never added to an image.
    fn delete_layer(&mut self, layer: DrawableId) -> HostResult<()>;

    /// Delete an image and everything it owns.
    fn delete_image(&mut self, image: ImageId) -> HostResult<()>;

    // ── Feedback ────────────────────────────────────────────────

    fn set_progress_text(&mut self, _text: &str) {}

    fn progress_pulse(&mut self) {}

    fn flush_displays(&mut self) {}
}
