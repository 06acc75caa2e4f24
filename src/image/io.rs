//! Decoding template files via the `image` crate.

use crate::image::OwnedImage;
use crate::util::{ClickMatchError, ClickMatchResult};
use std::path::Path;

/// File extensions accepted as templates (compared case-insensitively).
pub const SUPPORTED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp"];

/// Returns true if `path` has one of the [`SUPPORTED_EXTENSIONS`].
pub fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            SUPPORTED_EXTENSIONS
                .iter()
                .any(|supported| ext.eq_ignore_ascii_case(supported))
        })
        .unwrap_or(false)
}

/// Creates an owned image from a grayscale image buffer.
pub fn owned_from_gray_image(img: &image::GrayImage) -> ClickMatchResult<OwnedImage> {
    OwnedImage::new(
        img.as_raw().clone(),
        img.width() as usize,
        img.height() as usize,
    )
}

/// Loads an image from disk and converts it to grayscale.
pub fn load_gray_image<P: AsRef<Path>>(path: P) -> ClickMatchResult<OwnedImage> {
    let img = image::open(path).map_err(|err| ClickMatchError::ImageIo {
        reason: err.to_string(),
    })?;
    owned_from_gray_image(&img.to_luma8())
}

#[cfg(test)]
mod tests {
    use super::is_supported;
    use std::path::Path;

    #[test]
    fn extension_allow_list_is_case_insensitive() {
        assert!(is_supported(Path::new("ok.png")));
        assert!(is_supported(Path::new("OK.JPEG")));
        assert!(is_supported(Path::new("dir/a.Bmp")));
        assert!(!is_supported(Path::new("notes.txt")));
        assert!(!is_supported(Path::new("png")));
    }
}
