//! Area-average resampling for grayscale `u8` images.
//!
//! Each destination pixel is the mean of the source area it covers, with
//! partially covered source pixels weighted by their overlap. Shrinking by an
//! integer factor reduces to a box filter; enlarging degenerates to nearest
//! neighbour. Resampling is separable: rows first, then columns.

use crate::image::{ImageView, OwnedImage};
use crate::util::math::scaled_len;
use crate::util::{ClickMatchError, ClickMatchResult};

/// Source taps for one destination sample: `(first index, weights)`.
struct Taps {
    start: usize,
    weights: Vec<f32>,
}

fn axis_taps(src_len: usize, dst_len: usize) -> Vec<Taps> {
    let ratio = src_len as f64 / dst_len as f64;
    (0..dst_len)
        .map(|d| {
            let lo = d as f64 * ratio;
            let hi = ((d + 1) as f64 * ratio).min(src_len as f64);
            let start = lo.floor() as usize;
            let end = (hi.ceil() as usize).clamp(start + 1, src_len);
            let span = hi - lo;
            let weights = (start..end)
                .map(|s| {
                    let overlap = (hi.min((s + 1) as f64) - lo.max(s as f64)).max(0.0);
                    (overlap / span) as f32
                })
                .collect();
            Taps { start, weights }
        })
        .collect()
}

/// Resamples `src` to exactly `dst_width` x `dst_height`.
pub fn resize_area(
    src: ImageView<'_, u8>,
    dst_width: usize,
    dst_height: usize,
) -> ClickMatchResult<OwnedImage> {
    if dst_width == 0 || dst_height == 0 {
        return Err(ClickMatchError::InvalidDimensions {
            width: dst_width,
            height: dst_height,
        });
    }
    if dst_width == src.width() && dst_height == src.height() {
        return OwnedImage::from_view(src);
    }

    let x_taps = axis_taps(src.width(), dst_width);
    let y_taps = axis_taps(src.height(), dst_height);

    // Horizontal pass into an f32 buffer of src.height() x dst_width.
    let mut horiz = vec![0.0f32; src.height() * dst_width];
    for y in 0..src.height() {
        let row = src.row_or_err(y)?;
        let out = &mut horiz[y * dst_width..(y + 1) * dst_width];
        for (dst, taps) in out.iter_mut().zip(&x_taps) {
            *dst = taps
                .weights
                .iter()
                .enumerate()
                .map(|(i, w)| w * f32::from(row[taps.start + i]))
                .sum();
        }
    }

    let mut data = vec![0u8; dst_width * dst_height];
    for (dy, taps) in y_taps.iter().enumerate() {
        let out = &mut data[dy * dst_width..(dy + 1) * dst_width];
        for (dx, dst) in out.iter_mut().enumerate() {
            let value: f32 = taps
                .weights
                .iter()
                .enumerate()
                .map(|(i, w)| w * horiz[(taps.start + i) * dst_width + dx])
                .sum();
            *dst = value.round().clamp(0.0, 255.0) as u8;
        }
    }

    OwnedImage::new(data, dst_width, dst_height)
}

/// Resamples `src` uniformly by `scale`, rounding each axis.
pub fn resize_by(src: ImageView<'_, u8>, scale: f32) -> ClickMatchResult<OwnedImage> {
    if !(scale > 0.0 && scale.is_finite()) {
        return Err(ClickMatchError::InvalidInput("scale must be positive"));
    }
    resize_area(
        src,
        scaled_len(src.width(), scale),
        scaled_len(src.height(), scale),
    )
}
