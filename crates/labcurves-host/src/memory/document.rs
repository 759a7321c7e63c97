//! Image and layer records owned by `MemoryHost`.

use labcurves_core::{DrawableId, Offset, Raster};

use super::undo::{Snapshot, UndoHistory};

/// One layer of an image.
#[derive(Debug, Clone)]
pub(crate) struct Layer {
    pub id: DrawableId,
    pub name: String,
    pub offset: Offset,
    pub opacity: f32,
    pub visible: bool,
    pub raster: Raster,
}

impl Layer {
    pub fn new(id: DrawableId, name: &str, raster: Raster) -> Self {
        Self {
            id,
            name: name.to_string(),
            offset: Offset::ZERO,
            opacity: 1.0,
            visible: true,
            raster,
        }
    }
}

/// A pasted region waiting to be anchored onto `target`.
#[derive(Debug, Clone)]
pub(crate) struct Floating {
    pub id: DrawableId,
    pub target: DrawableId,
    pub offset: Offset,
    pub raster: Raster,
}

#[derive(Debug)]
pub(crate) struct HostImage {
    pub width: u32,
    pub height: u32,
    /// Index 0 is the top of the stack.
    pub layers: Vec<Layer>,
    pub active: Option<DrawableId>,
    pub floating: Option<Floating>,
    pub dirty: bool,
    pub undo: UndoHistory,
}

impl HostImage {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            layers: Vec::new(),
            active: None,
            floating: None,
            dirty: false,
            undo: UndoHistory::default(),
        }
    }

    /// Record an undo step if needed and mark the image modified.
    pub fn touch(&mut self) {
        let (layers, active) = (&self.layers, self.active);
        self.undo.record(|| Snapshot {
            layers: layers.clone(),
            active,
        });
        self.dirty = true;
    }

    pub fn begin_undo_group(&mut self) {
        let (layers, active) = (&self.layers, self.active);
        self.undo.begin_group(|| Snapshot {
            layers: layers.clone(),
            active,
        });
    }

    pub fn restore(&mut self, snapshot: Snapshot) {
        self.layers = snapshot.layers;
        self.active = snapshot.active;
        self.floating = None;
    }

    pub fn layer_index(&self, id: DrawableId) -> Option<usize> {
        self.layers.iter().position(|l| l.id == id)
    }

    pub fn layer(&self, id: DrawableId) -> Option<&Layer> {
        self.layers.iter().find(|l| l.id == id)
    }

    pub fn layer_mut(&mut self, id: DrawableId) -> Option<&mut Layer> {
        self.layers.iter_mut().find(|l| l.id == id)
    }

    /// Composite all visible layers, bottom to top, onto a transparent canvas.
    pub fn flatten(&self) -> Raster {
        let mut canvas = Raster::new(self.width, self.height);
        for layer in self.layers.iter().rev().filter(|l| l.visible) {
            canvas.composite_over(&layer.raster, layer.offset, layer.opacity);
        }
        canvas
    }
}
