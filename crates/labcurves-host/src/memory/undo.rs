//! Undo history for in-memory images.
//!
//! Every undoable step stores a snapshot of the layer stack taken before
//! the step ran. Nested groups collapse into the outermost one.

use labcurves_core::DrawableId;

use super::document::Layer;

/// Layer stack state restored by one undo step.
#[derive(Debug, Clone)]
pub(crate) struct Snapshot {
    pub layers: Vec<Layer>,
    pub active: Option<DrawableId>,
}

#[derive(Debug)]
pub(crate) struct UndoHistory {
    steps: Vec<Snapshot>,
    max_depth: usize,
    /// Open group nesting level.
    depth: u32,
    enabled: bool,
}

impl UndoHistory {
    pub fn new(max_depth: usize) -> Self {
        Self {
            steps: Vec::new(),
            max_depth,
            depth: 0,
            enabled: true,
        }
    }

    /// Open a group. Only the outermost group records a snapshot.
    pub fn begin_group(&mut self, snapshot: impl FnOnce() -> Snapshot) {
        if self.depth == 0 && self.enabled {
            self.push(snapshot());
        }
        self.depth += 1;
    }

    /// Close a group. Returns false when no group was open.
    pub fn end_group(&mut self) -> bool {
        if self.depth == 0 {
            return false;
        }
        self.depth -= 1;
        true
    }

    /// Record a standalone step unless a group is already covering it.
    pub fn record(&mut self, snapshot: impl FnOnce() -> Snapshot) {
        if self.depth == 0 && self.enabled {
            self.push(snapshot());
        }
    }

    fn push(&mut self, snapshot: Snapshot) {
        self.steps.push(snapshot);
        if self.steps.len() > self.max_depth {
            self.steps.remove(0);
        }
    }

    pub fn pop(&mut self) -> Option<Snapshot> {
        self.steps.pop()
    }

    /// Drop all history and stop recording.
    pub fn disable(&mut self) {
        self.enabled = false;
        self.steps.clear();
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn open_groups(&self) -> u32 {
        self.depth
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }
}

impl Default for UndoHistory {
    fn default() -> Self {
        Self::new(200)
    }
}
