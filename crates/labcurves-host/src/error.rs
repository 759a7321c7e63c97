//! Host errors.

use labcurves_core::{CoreError, DrawableId, ImageId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HostError {
    #[error("image not found: {0}")]
    ImageNotFound(ImageId),
    #[error("drawable not found: {0}")]
    DrawableNotFound(DrawableId),
    #[error("named buffer not found: {0}")]
    BufferNotFound(String),
    #[error("{drawable} does not belong to {image}")]
    ForeignDrawable { drawable: DrawableId, image: ImageId },
    #[error("invalid state: {0}")]
    InvalidState(String),
    #[error("image codec error: {0}")]
    Codec(#[from] image::ImageError),
    #[error(transparent)]
    Core(#[from] CoreError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for host operations.
pub type HostResult<T> = std::result::Result<T, HostError>;
