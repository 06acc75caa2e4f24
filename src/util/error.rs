//! Error types for clickmatch.

use std::path::PathBuf;
use thiserror::Error;

/// Result alias for clickmatch operations.
pub type ClickMatchResult<T> = std::result::Result<T, ClickMatchError>;

/// Errors that can occur while loading templates, matching, or acting.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ClickMatchError {
    /// The input data or parameters are invalid.
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),
    /// Image dimensions are zero or overflow.
    #[error("invalid dimensions {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },
    /// Row stride is shorter than the row width.
    #[error("invalid stride {stride} for width {width}")]
    InvalidStride { width: usize, stride: usize },
    /// Backing buffer holds fewer elements than the geometry requires.
    #[error("buffer too small: needed {needed}, got {got}")]
    BufferTooSmall { needed: usize, got: usize },
    /// The template cannot be correlated (for example it is a flat image).
    #[error("degenerate template: {reason}")]
    DegenerateTemplate { reason: &'static str },
    /// Decoding an image file failed.
    #[error("image io: {reason}")]
    ImageIo { reason: String },
    /// The template directory cannot be created or listed.
    #[error("template directory {}: {reason}", path.display())]
    TemplateDir { path: PathBuf, reason: String },
    /// A single frame grab failed.
    #[error("capture failed: {reason}")]
    Capture { reason: String },
    /// Frames could not be acquired for many iterations in a row.
    #[error("capture unavailable after {attempts} consecutive failures")]
    CaptureUnavailable { attempts: u32 },
    /// Pointer click injection failed.
    #[error("click failed: {reason}")]
    Click { reason: String },
    /// Region-of-interest discovery failed.
    #[error("region discovery failed: {reason}")]
    Region { reason: String },
    /// The matching worker pool could not be built.
    #[error("worker pool: {reason}")]
    WorkerPool { reason: String },
    /// A configuration value is out of range.
    #[error("invalid config `{field}`: {reason}")]
    InvalidConfig {
        field: &'static str,
        reason: &'static str,
    },
}
