//! Scale helpers shared by templates, frames, and coordinate mapping.

/// Smallest edge a downscaled template may have.
pub(crate) const MIN_TEMPLATE_EDGE: usize = 5;

/// Length of an axis after applying `scale`, rounded and at least one pixel.
pub(crate) fn scaled_len(len: usize, scale: f32) -> usize {
    if scale == 1.0 {
        return len;
    }
    ((len as f64 * scale as f64).round() as usize).max(1)
}

/// Like [`scaled_len`] but clamped to the minimum template edge.
pub(crate) fn scaled_template_len(len: usize, scale: f32) -> usize {
    if scale == 1.0 {
        return len;
    }
    scaled_len(len, scale).max(MIN_TEMPLATE_EDGE)
}

/// Maps a coordinate from scaled space back to full resolution.
///
/// Truncates toward zero, so the result may be up to `1 / scale` pixels short
/// of the exact preimage.
pub(crate) fn unscale(coord: usize, scale: f32) -> i32 {
    if scale == 1.0 {
        return coord as i32;
    }
    (coord as f64 / scale as f64) as i32
}
