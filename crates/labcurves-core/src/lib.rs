//! Lab Curves Core - Foundation types for the curves bridge
//!
//! This crate provides the types shared by the host and the plug-in:
//! - Typed handles for images and drawables
//! - Pixel offsets
//! - 16-bit RGBA rasters with "over" compositing

pub mod error;
pub mod geometry;
pub mod ids;
pub mod raster;

pub use error::{CoreError, Result};
pub use geometry::Offset;
pub use ids::{DrawableId, ImageId};
pub use raster::{Pixel, Raster};
