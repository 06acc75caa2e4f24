//! Frame acquisition and preprocessing.

use crate::backend::{Rect, ScreenCapture};
use crate::image::integral::IntegralImage;
use crate::image::resize::resize_by;
use crate::image::{ImageView, OwnedImage};
use crate::util::{ClickMatchError, ClickMatchResult};

/// One preprocessed snapshot of the region of interest.
///
/// The image is grayscale and already resampled by `scale`; `origin` is the
/// absolute screen position of the captured rectangle's top-left corner.
pub struct Frame {
    image: OwnedImage,
    origin: (i32, i32),
    scale: f32,
    integral: IntegralImage,
}

impl Frame {
    /// Resamples a full-resolution grayscale capture by `scale` and prepares
    /// window statistics for matching.
    pub fn from_gray(gray: OwnedImage, origin: (i32, i32), scale: f32) -> ClickMatchResult<Self> {
        if !(scale > 0.0 && scale <= 1.0) {
            return Err(ClickMatchError::InvalidInput("scale must be in (0, 1]"));
        }
        let image = if scale == 1.0 {
            gray
        } else {
            resize_by(gray.view(), scale)?
        };
        let integral = IntegralImage::build(image.view())?;
        Ok(Self {
            image,
            origin,
            scale,
            integral,
        })
    }

    /// Preprocessed grayscale pixels.
    pub fn image(&self) -> ImageView<'_, u8> {
        self.image.view()
    }

    pub fn width(&self) -> usize {
        self.image.width()
    }

    pub fn height(&self) -> usize {
        self.image.height()
    }

    /// Absolute screen position of the captured rectangle.
    pub fn origin(&self) -> (i32, i32) {
        self.origin
    }

    /// Downscale factor applied at capture time.
    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub(crate) fn integral(&self) -> &IntegralImage {
        &self.integral
    }
}

/// Wraps a capture backend and applies grayscale conversion and downscaling.
///
/// The rectangle is passed on every call and never cached, so a window that
/// moves or resizes between iterations is followed as soon as the caller
/// updates its rectangle.
pub struct FrameSource<C> {
    capture: C,
    scale: f32,
}

impl<C: ScreenCapture> FrameSource<C> {
    pub fn new(capture: C, scale: f32) -> Self {
        Self { capture, scale }
    }

    /// Grabs `rect` and returns the preprocessed frame.
    pub fn capture(&mut self, rect: Rect) -> ClickMatchResult<Frame> {
        if rect.width == 0 || rect.height == 0 {
            return Err(ClickMatchError::InvalidDimensions {
                width: rect.width as usize,
                height: rect.height as usize,
            });
        }
        let raw = self.capture.grab(rect)?;
        Frame::from_gray(raw.to_gray()?, (rect.left, rect.top), self.scale)
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// Returns the wrapped backend.
    pub fn backend(&self) -> &C {
        &self.capture
    }
}

#[cfg(test)]
mod tests {
    use super::FrameSource;
    use crate::backend::{Rect, ScreenCapture};
    use crate::image::convert::{PixelFormat, RawFrame};
    use crate::util::ClickMatchResult;

    struct Checker {
        grabs: Vec<Rect>,
    }

    impl ScreenCapture for Checker {
        fn grab(&mut self, rect: Rect) -> ClickMatchResult<RawFrame> {
            self.grabs.push(rect);
            let (w, h) = (rect.width as usize, rect.height as usize);
            let mut data = Vec::with_capacity(w * h * 4);
            for y in 0..h {
                for x in 0..w {
                    let v = if (x / 2 + y / 2) % 2 == 0 { 255 } else { 0 };
                    data.extend_from_slice(&[v, v, v, 255]);
                }
            }
            Ok(RawFrame::packed(data, w, h, PixelFormat::Bgra8))
        }
    }

    #[test]
    fn capture_converts_and_downscales() {
        let mut source = FrameSource::new(Checker { grabs: Vec::new() }, 0.5);
        let frame = source.capture(Rect::new(10, 20, 8, 6)).unwrap();
        assert_eq!((frame.width(), frame.height()), (4, 3));
        assert_eq!(frame.origin(), (10, 20));
        // 2x2 checker cells collapse to single pixels.
        assert_eq!(frame.image().row(0).unwrap(), &[255u8, 0, 255, 0]);
    }

    #[test]
    fn geometry_is_reread_every_call() {
        let mut source = FrameSource::new(Checker { grabs: Vec::new() }, 1.0);
        source.capture(Rect::new(0, 0, 4, 4)).unwrap();
        let moved = source.capture(Rect::new(30, 40, 6, 2)).unwrap();
        assert_eq!((moved.width(), moved.height()), (6, 2));
        assert_eq!(moved.origin(), (30, 40));
        assert_eq!(source.backend().grabs.len(), 2);
    }

    #[test]
    fn empty_rect_is_rejected() {
        let mut source = FrameSource::new(Checker { grabs: Vec::new() }, 1.0);
        assert!(source.capture(Rect::new(0, 0, 0, 4)).is_err());
        assert!(source.backend().grabs.is_empty());
    }
}
