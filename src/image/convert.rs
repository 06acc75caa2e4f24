//! Raw capture buffers and grayscale conversion.

use crate::image::OwnedImage;
use crate::util::{ClickMatchError, ClickMatchResult};

/// Byte layout of a captured pixel buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelFormat {
    /// One luma byte per pixel.
    Gray8,
    /// Red, green, blue, alpha.
    Rgba8,
    /// Blue, green, red, alpha (typical for Windows/macOS grabbers).
    Bgra8,
}

impl PixelFormat {
    /// Bytes per pixel.
    pub fn channels(self) -> usize {
        match self {
            PixelFormat::Gray8 => 1,
            PixelFormat::Rgba8 | PixelFormat::Bgra8 => 4,
        }
    }
}

/// Pixels returned by a capture backend, before preprocessing.
#[derive(Clone, Debug)]
pub struct RawFrame {
    pub data: Vec<u8>,
    pub width: usize,
    pub height: usize,
    /// Bytes between row starts.
    pub stride: usize,
    pub format: PixelFormat,
}

impl RawFrame {
    /// Creates a tightly packed raw frame.
    pub fn packed(data: Vec<u8>, width: usize, height: usize, format: PixelFormat) -> Self {
        Self {
            data,
            width,
            height,
            stride: width * format.channels(),
            format,
        }
    }

    /// Converts to an owned grayscale image using BT.601 luma weights.
    pub fn to_gray(&self) -> ClickMatchResult<OwnedImage> {
        let (width, height) = (self.width, self.height);
        if width == 0 || height == 0 {
            return Err(ClickMatchError::InvalidDimensions { width, height });
        }
        let channels = self.format.channels();
        let row_bytes = width * channels;
        if self.stride < row_bytes {
            return Err(ClickMatchError::InvalidStride {
                width: row_bytes,
                stride: self.stride,
            });
        }
        let needed = (height - 1) * self.stride + row_bytes;
        if self.data.len() < needed {
            return Err(ClickMatchError::BufferTooSmall {
                needed,
                got: self.data.len(),
            });
        }

        let mut gray = Vec::with_capacity(width * height);
        for y in 0..height {
            let row = &self.data[y * self.stride..y * self.stride + row_bytes];
            match self.format {
                PixelFormat::Gray8 => gray.extend_from_slice(row),
                PixelFormat::Rgba8 => {
                    gray.extend(row.chunks_exact(4).map(|px| luma(px[0], px[1], px[2])))
                }
                PixelFormat::Bgra8 => {
                    gray.extend(row.chunks_exact(4).map(|px| luma(px[2], px[1], px[0])))
                }
            }
        }
        OwnedImage::new(gray, width, height)
    }
}

fn luma(r: u8, g: u8, b: u8) -> u8 {
    let sum = 299 * u32::from(r) + 587 * u32::from(g) + 114 * u32::from(b);
    ((sum + 500) / 1000) as u8
}
