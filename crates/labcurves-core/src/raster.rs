//! 16-bit RGBA pixel storage.
//!
//! Samples are straight (non-premultiplied) alpha, row-major, four
//! channels per pixel. Sixteen bits per channel matches what the external
//! curves tool reads and writes.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::geometry::Offset;

/// One RGBA pixel.
pub type Pixel = [u16; 4];

const MAX: f64 = u16::MAX as f64;

/// A rectangular block of RGBA16 pixels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Raster {
    width: u32,
    height: u32,
    data: Vec<u16>,
}

impl Raster {
    /// Number of samples per pixel.
    pub const CHANNELS: usize = 4;

    /// Create a fully transparent raster.
    pub fn new(width: u32, height: u32) -> Self {
        Self::filled(width, height, [0; 4])
    }

    /// Create a raster where every pixel is `pixel`.
    pub fn filled(width: u32, height: u32, pixel: Pixel) -> Self {
        let count = width as usize * height as usize;
        let mut data = Vec::with_capacity(count * Self::CHANNELS);
        for _ in 0..count {
            data.extend_from_slice(&pixel);
        }
        Self {
            width,
            height,
            data,
        }
    }

    /// Wrap existing samples. `data.len()` must be `width * height * 4`.
    pub fn from_raw(width: u32, height: u32, data: Vec<u16>) -> Result<Self> {
        let expected = width as usize * height as usize * Self::CHANNELS;
        if data.len() != expected {
            return Err(CoreError::BufferSize {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// `(width, height)`.
    #[inline]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// True when the raster holds no pixels.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Raw sample slice.
    pub fn as_raw(&self) -> &[u16] {
        &self.data
    }

    /// Consume the raster and return its samples.
    pub fn into_raw(self) -> Vec<u16> {
        self.data
    }

    #[inline]
    fn index(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * Self::CHANNELS
    }

    /// Read one pixel. Returns `None` outside the raster.
    pub fn pixel(&self, x: u32, y: u32) -> Option<Pixel> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = self.index(x, y);
        Some([
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ])
    }

    /// Write one pixel. Writes outside the raster are ignored.
    pub fn put_pixel(&mut self, x: u32, y: u32, pixel: Pixel) {
        if x >= self.width || y >= self.height {
            return;
        }
        let i = self.index(x, y);
        self.data[i..i + Self::CHANNELS].copy_from_slice(&pixel);
    }

    /// Composite `src` over `self` with its top-left corner at `at`.
    ///
    /// Porter-Duff "over" on straight alpha, scaled by `opacity`
    /// (clamped to `0.0..=1.0`). Parts of `src` outside `self` are clipped.
    pub fn composite_over(&mut self, src: &Raster, at: Offset, opacity: f32) {
        let opacity = f64::from(opacity.clamp(0.0, 1.0));
        if opacity == 0.0 {
            return;
        }

        // Clip in i64 so offsets near the i32 limits cannot overflow.
        let (ax, ay) = (i64::from(at.x), i64::from(at.y));
        let x0 = ax.max(0);
        let y0 = ay.max(0);
        let x1 = (ax + i64::from(src.width)).min(i64::from(self.width));
        let y1 = (ay + i64::from(src.height)).min(i64::from(self.height));

        for y in y0..y1 {
            for x in x0..x1 {
                let sx = (x - ax) as u32;
                let sy = (y - ay) as u32;
                let i = src.index(sx, sy);
                let s = &src.data[i..i + Self::CHANNELS];
                let d = self.index(x as u32, y as u32);
                let blended = over(s, &self.data[d..d + Self::CHANNELS], opacity);
                if let Some(px) = blended {
                    self.data[d..d + Self::CHANNELS].copy_from_slice(&px);
                }
            }
        }
    }
}

/// Blend one straight-alpha pixel over another. `None` leaves `dst` as is.
fn over(src: &[u16], dst: &[u16], opacity: f64) -> Option<Pixel> {
    let sa = f64::from(src[3]) / MAX * opacity;
    if sa == 0.0 {
        return None;
    }
    let da = f64::from(dst[3]) / MAX;
    let oa = sa + da * (1.0 - sa);

    let mut out = [0u16; 4];
    for c in 0..3 {
        let sc = f64::from(src[c]);
        let dc = f64::from(dst[c]);
        let v = (sc * sa + dc * da * (1.0 - sa)) / oa;
        out[c] = v.round().clamp(0.0, MAX) as u16;
    }
    out[3] = (oa * MAX).round().clamp(0.0, MAX) as u16;
    Some(out)
}
