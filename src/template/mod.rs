//! Button templates and their matching plans.
//!
//! A `Template` keeps the decoded full-resolution image for display and a
//! derived `match_image` resampled by the global downscale factor. The match
//! image must be produced with the same factor as the frames it is compared
//! against so spatial units agree.

use crate::image::resize::resize_area;
use crate::image::{ImageView, OwnedImage};
use crate::util::math::scaled_template_len;
use crate::util::{ClickMatchError, ClickMatchResult};

mod plan;

pub use plan::TemplatePlan;

/// Immutable template loaded from one image file.
#[derive(Debug)]
pub struct Template {
    name: String,
    full: OwnedImage,
    matched: OwnedImage,
    plan: TemplatePlan,
}

impl Template {
    /// Builds a template from a decoded grayscale image.
    ///
    /// Fails with `DegenerateTemplate` when the match image has no contrast.
    pub fn from_gray(
        name: impl Into<String>,
        full: OwnedImage,
        scale: f32,
    ) -> ClickMatchResult<Self> {
        if !(scale > 0.0 && scale <= 1.0) {
            return Err(ClickMatchError::InvalidInput("scale must be in (0, 1]"));
        }
        let matched = resize_area(
            full.view(),
            scaled_template_len(full.width(), scale),
            scaled_template_len(full.height(), scale),
        )?;
        let plan = TemplatePlan::from_view(matched.view())?;
        Ok(Self {
            name: name.into(),
            full,
            matched,
            plan,
        })
    }

    /// Creates a template from a contiguous grayscale buffer.
    pub fn new(
        name: impl Into<String>,
        data: Vec<u8>,
        width: usize,
        height: usize,
        scale: f32,
    ) -> ClickMatchResult<Self> {
        Self::from_gray(name, OwnedImage::new(data, width, height)?, scale)
    }

    /// Identifier, unique within one loaded set (the file name).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Full-resolution grayscale image.
    pub fn full_image(&self) -> ImageView<'_, u8> {
        self.full.view()
    }

    /// Downscaled image used for correlation.
    pub fn match_image(&self) -> ImageView<'_, u8> {
        self.matched.view()
    }

    /// Precomputed ZNCC statistics of the match image.
    pub fn plan(&self) -> &TemplatePlan {
        &self.plan
    }
}

#[cfg(test)]
mod tests {
    use super::Template;
    use crate::util::ClickMatchError;

    fn gradient(width: usize, height: usize) -> Vec<u8> {
        (0..width * height)
            .map(|i| ((i % width) * 7 + (i / width) * 3) as u8)
            .collect()
    }

    #[test]
    fn match_image_is_scaled_and_clamped() {
        let tpl = Template::new("ok.png", gradient(40, 8), 40, 8, 0.5).unwrap();
        assert_eq!(tpl.full_image().width(), 40);
        assert_eq!(tpl.match_image().width(), 20);
        assert_eq!(tpl.match_image().height(), 5);
        assert_eq!(tpl.plan().width(), 20);
    }

    #[test]
    fn unit_scale_keeps_dimensions() {
        let tpl = Template::new("a", gradient(9, 4), 9, 4, 1.0).unwrap();
        assert_eq!(tpl.match_image().width(), 9);
        assert_eq!(tpl.match_image().height(), 4);
        assert_eq!(tpl.name(), "a");
    }

    #[test]
    fn flat_templates_are_degenerate() {
        let err = Template::new("flat", vec![5u8; 36], 6, 6, 1.0).unwrap_err();
        assert_eq!(
            err,
            ClickMatchError::DegenerateTemplate {
                reason: "zero variance",
            }
        );
    }

    #[test]
    fn scale_out_of_range_is_rejected() {
        assert!(Template::new("a", gradient(9, 4), 9, 4, 1.5).is_err());
        assert!(Template::new("a", gradient(9, 4), 9, 4, 0.0).is_err());
    }
}
