//! Correlation kernels.

pub(crate) mod scalar;

/// Best placement of one template inside one frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Peak {
    /// X coordinate (column) of the template's top-left corner.
    pub x: usize,
    /// Y coordinate (row) of the template's top-left corner.
    pub y: usize,
    /// ZNCC score at the placement, in `[-1, 1]`.
    pub score: f32,
}
