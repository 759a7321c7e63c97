//! Raster file I/O through the `image` crate.
//!
//! TIFF is the exchange format with the external curves tool: RGBA at 16
//! bits per channel, uncompressed. Reading sniffs the format from the
//! file contents, falling back to the extension, and widens to RGBA16.

use std::path::Path;

use image::{DynamicImage, ImageBuffer, ImageFormat, ImageReader, Rgba};
use labcurves_core::{CoreError, Raster};
use tracing::debug;

use crate::error::{HostError, HostResult};

type Rgba16Image = ImageBuffer<Rgba<u16>, Vec<u16>>;

/// Decode an image file into a raster.
pub fn read_raster(path: &Path) -> HostResult<Raster> {
    let reader = ImageReader::open(path)?.with_guessed_format()?;
    let format = reader.format();
    let decoded = reader.decode()?;
    debug!(
        path = %path.display(),
        ?format,
        color = ?decoded.color(),
        width = decoded.width(),
        height = decoded.height(),
        "Decoded raster"
    );
    let rgba = decoded.to_rgba16();
    let (width, height) = rgba.dimensions();
    Ok(Raster::from_raw(width, height, rgba.into_raw())?)
}

/// Write a raster as an uncompressed 16-bit RGBA TIFF.
pub fn write_tiff(raster: &Raster, path: &Path) -> HostResult<()> {
    write_with_format(raster, path, ImageFormat::Tiff)
}

/// Write a raster in the format implied by the path's extension.
pub fn write_raster(raster: &Raster, path: &Path) -> HostResult<()> {
    let format = ImageFormat::from_path(path)?;
    write_with_format(raster, path, format)
}

fn write_with_format(raster: &Raster, path: &Path, format: ImageFormat) -> HostResult<()> {
    let (width, height) = raster.dimensions();
    let buffer = Rgba16Image::from_raw(width, height, raster.as_raw().to_vec()).ok_or_else(|| {
        HostError::Core(CoreError::InvalidParameter(format!(
            "raster of {width}x{height} does not fit its sample buffer"
        )))
    })?;
    DynamicImage::ImageRgba16(buffer).save_with_format(path, format)?;
    debug!(path = %path.display(), ?format, width, height, "Wrote raster");
    Ok(())
}
