//! Pixel-space positions.

use serde::{Deserialize, Serialize};

/// Integer pixel offset of a layer's top-left corner within its image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Offset {
    pub x: i32,
    pub y: i32,
}

impl Offset {
    pub const ZERO: Self = Self { x: 0, y: 0 };

    /// Create a new offset.
    #[inline]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Offset of `self` relative to `origin`.
    #[inline]
    pub fn relative_to(self, origin: Offset) -> Offset {
        Offset::new(self.x - origin.x, self.y - origin.y)
    }
}
