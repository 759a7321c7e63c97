//! In-memory reference host.
//!
//! `MemoryHost` implements every `Host` operation against plain Rust data:
//! images with ordered layer stacks, a named-buffer registry, nested undo
//! groups and a temporary directory for file exchange. The CLI runs the
//! curves procedure against it, and tests inspect it through the
//! accessors below.

mod document;
mod undo;

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use labcurves_core::{DrawableId, ImageId, Offset, Raster};
use tracing::{debug, info};
use uuid::Uuid;

use crate::codec;
use crate::error::{HostError, HostResult};
use crate::host::{Host, LayerPosition};
use document::{Floating, HostImage, Layer};

/// Name given to the layer of an image created from a named buffer.
pub const PASTED_LAYER_NAME: &str = "Pasted Layer";

/// Counters observable after a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostStats {
    pub undo_groups_opened: u32,
    pub undo_groups_closed: u32,
    pub display_flushes: u32,
    pub progress_pulses: u32,
    pub progress_messages: Vec<String>,
}

/// A layer created for an image but not yet in its stack.
#[derive(Debug)]
struct Detached {
    image: ImageId,
    layer: Layer,
}

/// Host implementation backed by in-process data structures.
pub struct MemoryHost {
    images: BTreeMap<ImageId, HostImage>,
    detached: HashMap<DrawableId, Detached>,
    buffers: BTreeMap<String, Raster>,
    temp_dir: PathBuf,
    next_id: u32,
    stats: HostStats,
}

impl MemoryHost {
    /// Create a host whose temporary files go to `temp_dir`.
    pub fn new(temp_dir: impl Into<PathBuf>) -> Self {
        Self {
            images: BTreeMap::new(),
            detached: HashMap::new(),
            buffers: BTreeMap::new(),
            temp_dir: temp_dir.into(),
            next_id: 0,
            stats: HostStats::default(),
        }
    }

    fn next_id(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    fn image(&self, id: ImageId) -> HostResult<&HostImage> {
        self.images.get(&id).ok_or(HostError::ImageNotFound(id))
    }

    fn image_mut(&mut self, id: ImageId) -> HostResult<&mut HostImage> {
        self.images.get_mut(&id).ok_or(HostError::ImageNotFound(id))
    }

    /// Find a layer in any image stack or among detached layers.
    fn find_layer(&self, id: DrawableId) -> HostResult<(ImageId, &Layer)> {
        for (image_id, image) in &self.images {
            if let Some(layer) = image.layer(id) {
                return Ok((*image_id, layer));
            }
        }
        self.detached
            .get(&id)
            .map(|d| (d.image, &d.layer))
            .ok_or(HostError::DrawableNotFound(id))
    }

    /// Image whose stack contains `id`.
    fn owner_of(&self, id: DrawableId) -> HostResult<ImageId> {
        self.images
            .iter()
            .find(|(_, image)| image.layer(id).is_some())
            .map(|(image_id, _)| *image_id)
            .ok_or(HostError::DrawableNotFound(id))
    }

    fn detach(&mut self, image: ImageId, name: &str, raster: Raster, offset: Offset) -> DrawableId {
        let id = DrawableId(self.next_id());
        let mut layer = Layer::new(id, name, raster);
        layer.offset = offset;
        self.detached.insert(id, Detached { image, layer });
        id
    }

    // ── Scene setup ─────────────────────────────────────────────

    /// Create an empty image.
    pub fn create_image(&mut self, width: u32, height: u32) -> ImageId {
        let id = ImageId(self.next_id());
        self.images.insert(id, HostImage::new(width, height));
        id
    }

    /// Put a layer on top of `image` and make it active. Not recorded in undo history.
    pub fn insert_layer(
        &mut self,
        image: ImageId,
        name: &str,
        raster: Raster,
        offset: Offset,
    ) -> HostResult<DrawableId> {
        self.image(image)?;
        let id = DrawableId(self.next_id());
        let mut layer = Layer::new(id, name, raster);
        layer.offset = offset;
        let img = self.image_mut(image)?;
        img.layers.insert(0, layer);
        img.active = Some(id);
        Ok(id)
    }

    /// Open an image file as a new single-layer image.
    pub fn load_image(&mut self, path: &Path) -> HostResult<ImageId> {
        let raster = codec::read_raster(path)?;
        let (width, height) = raster.dimensions();
        let image = self.create_image(width, height);
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "Background".to_string());
        self.insert_layer(image, &name, raster, Offset::ZERO)?;
        info!(path = %path.display(), %image, width, height, "Loaded image");
        Ok(image)
    }

    /// Write the composite of all visible layers, format chosen by extension.
    pub fn export_flattened(&self, image: ImageId, path: &Path) -> HostResult<()> {
        let flat = self.flatten(image)?;
        codec::write_raster(&flat, path)?;
        info!(path = %path.display(), %image, "Exported flattened image");
        Ok(())
    }

    pub fn set_active(&mut self, image: ImageId, drawable: DrawableId) -> HostResult<()> {
        let img = self.image_mut(image)?;
        if img.layer(drawable).is_none() {
            return Err(HostError::ForeignDrawable { drawable, image });
        }
        img.active = Some(drawable);
        Ok(())
    }

    pub fn set_visible(&mut self, drawable: DrawableId, visible: bool) -> HostResult<()> {
        let image = self.owner_of(drawable)?;
        if let Some(layer) = self.image_mut(image)?.layer_mut(drawable) {
            layer.visible = visible;
        }
        Ok(())
    }

    pub fn set_opacity(&mut self, drawable: DrawableId, opacity: f32) -> HostResult<()> {
        let image = self.owner_of(drawable)?;
        if let Some(layer) = self.image_mut(image)?.layer_mut(drawable) {
            layer.opacity = opacity.clamp(0.0, 1.0);
        }
        Ok(())
    }

    // ── Inspection ──────────────────────────────────────────────

    /// Composite of all visible layers.
    pub fn flatten(&self, image: ImageId) -> HostResult<Raster> {
        Ok(self.image(image)?.flatten())
    }

    pub fn image_ids(&self) -> Vec<ImageId> {
        self.images.keys().copied().collect()
    }

    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    pub fn image_size(&self, image: ImageId) -> HostResult<(u32, u32)> {
        let img = self.image(image)?;
        Ok((img.width, img.height))
    }

    /// Layers of `image`, top first.
    pub fn layer_ids(&self, image: ImageId) -> HostResult<Vec<DrawableId>> {
        Ok(self.image(image)?.layers.iter().map(|l| l.id).collect())
    }

    pub fn layer_count(&self, image: ImageId) -> HostResult<usize> {
        Ok(self.image(image)?.layers.len())
    }

    pub fn layer_name(&self, drawable: DrawableId) -> HostResult<&str> {
        Ok(self.find_layer(drawable)?.1.name.as_str())
    }

    pub fn layer_pixels(&self, drawable: DrawableId) -> HostResult<&Raster> {
        Ok(&self.find_layer(drawable)?.1.raster)
    }

    pub fn layer_offset(&self, drawable: DrawableId) -> HostResult<Offset> {
        Ok(self.find_layer(drawable)?.1.offset)
    }

    pub fn is_dirty(&self, image: ImageId) -> HostResult<bool> {
        Ok(self.image(image)?.dirty)
    }

    pub fn has_floating(&self, image: ImageId) -> HostResult<bool> {
        Ok(self.image(image)?.floating.is_some())
    }

    pub fn undo_steps(&self, image: ImageId) -> HostResult<usize> {
        Ok(self.image(image)?.undo.len())
    }

    /// False once `disable_undo` was called on `image`.
    pub fn undo_enabled(&self, image: ImageId) -> HostResult<bool> {
        Ok(self.image(image)?.undo.is_enabled())
    }

    pub fn open_undo_groups(&self, image: ImageId) -> HostResult<u32> {
        Ok(self.image(image)?.undo.open_groups())
    }

    /// Names of all named buffers, sorted.
    pub fn buffer_names(&self) -> Vec<&str> {
        self.buffers.keys().map(String::as_str).collect()
    }

    /// Number of layers created but never added to an image.
    pub fn detached_count(&self) -> usize {
        self.detached.len()
    }

    pub fn stats(&self) -> &HostStats {
        &self.stats
    }

    pub fn temp_dir(&self) -> &Path {
        &self.temp_dir
    }

    /// Revert the most recent undo step. Returns false when there is none.
    pub fn undo(&mut self, image: ImageId) -> HostResult<bool> {
        let img = self.image_mut(image)?;
        if img.undo.open_groups() > 0 {
            return Err(HostError::InvalidState(format!(
                "cannot undo {image} while an undo group is open"
            )));
        }
        match img.undo.pop() {
            Some(snapshot) => {
                img.restore(snapshot);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

impl Default for MemoryHost {
    fn default() -> Self {
        Self::new(std::env::temp_dir())
    }
}

impl Host for MemoryHost {
    fn begin_undo_group(&mut self, image: ImageId) -> HostResult<()> {
        self.image_mut(image)?.begin_undo_group();
        self.stats.undo_groups_opened += 1;
        debug!(%image, "Undo group opened");
        Ok(())
    }

    fn end_undo_group(&mut self, image: ImageId) -> HostResult<()> {
        if !self.image_mut(image)?.undo.end_group() {
            return Err(HostError::InvalidState(format!(
                "no open undo group on {image}"
            )));
        }
        self.stats.undo_groups_closed += 1;
        debug!(%image, "Undo group closed");
        Ok(())
    }

    fn disable_undo(&mut self, image: ImageId) -> HostResult<()> {
        self.image_mut(image)?.undo.disable();
        Ok(())
    }

    fn active_drawable(&self, image: ImageId) -> HostResult<DrawableId> {
        self.image(image)?
            .active
            .ok_or_else(|| HostError::InvalidState(format!("{image} has no active drawable")))
    }

    fn layer_from_visible(&mut self, image: ImageId, name: &str) -> HostResult<DrawableId> {
        let raster = self.image(image)?.flatten();
        Ok(self.detach(image, name, raster, Offset::ZERO))
    }

    fn new_layer(
        &mut self,
        image: ImageId,
        name: &str,
        like: DrawableId,
    ) -> HostResult<DrawableId> {
        self.image(image)?;
        let (owner, template) = self.find_layer(like)?;
        if owner != image {
            return Err(HostError::ForeignDrawable {
                drawable: like,
                image,
            });
        }
        let (width, height) = template.raster.dimensions();
        let offset = template.offset;
        Ok(self.detach(image, name, Raster::new(width, height), offset))
    }

    fn add_layer(
        &mut self,
        image: ImageId,
        layer: DrawableId,
        position: LayerPosition,
    ) -> HostResult<()> {
        let owner = match self.detached.get(&layer) {
            Some(d) => d.image,
            None if self.owner_of(layer).is_ok() => {
                return Err(HostError::InvalidState(format!(
                    "{layer} is already part of an image"
                )))
            }
            None => return Err(HostError::DrawableNotFound(layer)),
        };
        if owner != image {
            return Err(HostError::ForeignDrawable {
                drawable: layer,
                image,
            });
        }

        let index = {
            let img = self.image(image)?;
            match position {
                LayerPosition::Top => 0,
                LayerPosition::Above(target) => img
                    .layer_index(target)
                    .ok_or(HostError::ForeignDrawable {
                        drawable: target,
                        image,
                    })?,
            }
        };

        let Some(Detached { layer: record, .. }) = self.detached.remove(&layer) else {
            return Err(HostError::DrawableNotFound(layer));
        };
        let img = self.image_mut(image)?;
        img.touch();
        img.layers.insert(index, record);
        img.active = Some(layer);
        debug!(%image, %layer, index, "Layer added");
        Ok(())
    }

    fn copy_named(&mut self, drawable: DrawableId, buffer: &str) -> HostResult<()> {
        let raster = self.find_layer(drawable)?.1.raster.clone();
        self.buffers.insert(buffer.to_string(), raster);
        debug!(%drawable, buffer, "Copied to named buffer");
        Ok(())
    }

    fn paste_named_as_new(&mut self, buffer: &str) -> HostResult<ImageId> {
        let raster = self
            .buffers
            .get(buffer)
            .cloned()
            .ok_or_else(|| HostError::BufferNotFound(buffer.to_string()))?;
        if raster.is_empty() {
            return Err(HostError::InvalidState(format!(
                "named buffer {buffer} is empty"
            )));
        }
        let (width, height) = raster.dimensions();
        let image = self.create_image(width, height);
        self.insert_layer(image, PASTED_LAYER_NAME, raster, Offset::ZERO)?;
        debug!(buffer, %image, "Pasted named buffer as new image");
        Ok(image)
    }

    fn paste_named_into(&mut self, drawable: DrawableId, buffer: &str) -> HostResult<DrawableId> {
        let raster = self
            .buffers
            .get(buffer)
            .cloned()
            .ok_or_else(|| HostError::BufferNotFound(buffer.to_string()))?;
        let image = self.owner_of(drawable)?;
        if self.image(image)?.floating.is_some() {
            return Err(HostError::InvalidState(format!(
                "{image} already has a floating selection"
            )));
        }
        let id = DrawableId(self.next_id());
        let img = self.image_mut(image)?;
        let offset = img.layer(drawable).map(|l| l.offset).unwrap_or_default();
        img.touch();
        img.floating = Some(Floating {
            id,
            target: drawable,
            offset,
            raster,
        });
        debug!(%drawable, buffer, floating = %id, "Pasted named buffer");
        Ok(id)
    }

    fn delete_buffer(&mut self, buffer: &str) -> HostResult<()> {
        self.buffers
            .remove(buffer)
            .map(|_| ())
            .ok_or_else(|| HostError::BufferNotFound(buffer.to_string()))
    }

    fn anchor_floating(&mut self, floating: DrawableId) -> HostResult<()> {
        let img = self
            .images
            .values_mut()
            .find(|img| img.floating.as_ref().is_some_and(|f| f.id == floating))
            .ok_or(HostError::DrawableNotFound(floating))?;
        img.touch();
        let Some(selection) = img.floating.take() else {
            return Err(HostError::DrawableNotFound(floating));
        };
        let target = img.layer_mut(selection.target).ok_or_else(|| {
            HostError::InvalidState(format!(
                "floating selection target {} no longer exists",
                selection.target
            ))
        })?;
        let at = selection.offset.relative_to(target.offset);
        target.raster.composite_over(&selection.raster, at, 1.0);
        debug!(%floating, target = %selection.target, "Floating selection anchored");
        Ok(())
    }

    fn temp_name(&mut self, extension: &str) -> HostResult<PathBuf> {
        let stem = format!("labcurves-{}", Uuid::new_v4().simple());
        let extension = extension.trim_start_matches('.');
        let file_name = if extension.is_empty() {
            stem
        } else {
            format!("{stem}.{extension}")
        };
        Ok(self.temp_dir.join(file_name))
    }

    fn export_tiff(&mut self, image: ImageId, drawable: DrawableId, path: &Path) -> HostResult<()> {
        let (owner, layer) = self.find_layer(drawable)?;
        if owner != image {
            return Err(HostError::ForeignDrawable { drawable, image });
        }
        codec::write_tiff(&layer.raster, path)
    }

    fn load_layer(&mut self, image: ImageId, path: &Path) -> HostResult<DrawableId> {
        self.image(image)?;
        let raster = codec::read_raster(path)?;
        let name = path
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(self.detach(image, &name, raster, Offset::ZERO))
    }

    fn delete_layer(&mut self, layer: DrawableId) -> HostResult<()> {
        if self.detached.remove(&layer).is_some() {
            debug!(%layer, "Detached layer deleted");
            return Ok(());
        }
        match self.owner_of(layer) {
            Ok(image) => Err(HostError::InvalidState(format!(
                "{layer} is part of {image} and cannot be deleted"
            ))),
            Err(e) => Err(e),
        }
    }

    fn delete_image(&mut self, image: ImageId) -> HostResult<()> {
        self.images
            .remove(&image)
            .ok_or(HostError::ImageNotFound(image))?;
        self.detached.retain(|_, d| d.image != image);
        debug!(%image, "Image deleted");
        Ok(())
    }

    fn set_progress_text(&mut self, text: &str) {
        info!(progress = text);
        self.stats.progress_messages.push(text.to_string());
    }

    fn progress_pulse(&mut self) {
        self.stats.progress_pulses += 1;
    }

    fn flush_displays(&mut self) {
        self.stats.display_flushes += 1;
    }
}
