//! Seams to the desktop: region discovery, frame grabbing, click injection.
//!
//! The core never talks to the OS directly; the binary wires concrete
//! implementations of these traits, tests wire synthetic ones.

use crate::image::convert::RawFrame;
use crate::trace::trace_warn;
use crate::util::ClickMatchResult;

/// Screen rectangle in absolute screen pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(left: i32, top: i32, width: u32, height: u32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// Translates a rectangle-relative point to absolute screen coordinates.
    pub fn to_absolute(&self, relative: (i32, i32)) -> (i32, i32) {
        (self.left + relative.0, self.top + relative.1)
    }

    /// Exclusive right edge.
    pub fn right(&self) -> i64 {
        i64::from(self.left) + i64::from(self.width)
    }

    /// Exclusive bottom edge.
    pub fn bottom(&self) -> i64 {
        i64::from(self.top) + i64::from(self.height)
    }

    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    /// Overlap of two rectangles, `None` when they do not share a pixel.
    pub fn intersect(&self, other: &Rect) -> Option<Rect> {
        let left = self.left.max(other.left);
        let top = self.top.max(other.top);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        if right <= i64::from(left) || bottom <= i64::from(top) {
            return None;
        }
        Some(Rect::new(
            left,
            top,
            (right - i64::from(left)) as u32,
            (bottom - i64::from(top)) as u32,
        ))
    }

    /// True if every pixel of `inner` lies inside `self`.
    pub fn contains_rect(&self, inner: &Rect) -> bool {
        inner.left >= self.left
            && inner.top >= self.top
            && inner.right() <= self.right()
            && inner.bottom() <= self.bottom()
    }
}

/// Grabs the pixels inside a rectangle.
pub trait ScreenCapture {
    fn grab(&mut self, rect: Rect) -> ClickMatchResult<RawFrame>;
}

/// Injects a pointer click at an absolute screen coordinate.
pub trait Clicker {
    fn click(&mut self, x: i32, y: i32) -> ClickMatchResult<()>;
}

impl<T: ScreenCapture + ?Sized> ScreenCapture for &mut T {
    fn grab(&mut self, rect: Rect) -> ClickMatchResult<RawFrame> {
        (**self).grab(rect)
    }
}

impl<T: Clicker + ?Sized> Clicker for &mut T {
    fn click(&mut self, x: i32, y: i32) -> ClickMatchResult<()> {
        (**self).click(x, y)
    }
}

/// Locates the monitored region on screen.
pub trait RegionProvider {
    /// Finds the first window whose title contains `title_hint`.
    fn find_window(&self, title_hint: &str) -> ClickMatchResult<Option<Rect>>;

    /// Bounds of the primary display.
    fn primary_display(&self) -> ClickMatchResult<Rect>;
}

/// Resolves the region of interest, falling back to the primary display when
/// the window lookup fails or finds nothing.
pub fn discover_region<P: RegionProvider + ?Sized>(
    provider: &P,
    title_hint: &str,
) -> ClickMatchResult<Rect> {
    match provider.find_window(title_hint) {
        Ok(Some(rect)) if rect.width > 0 && rect.height > 0 => return Ok(rect),
        Ok(_) => {}
        Err(err) => {
            trace_warn!("window_lookup_failed", hint = title_hint, error = err);
        }
    }
    provider.primary_display()
}

/// Case-insensitive substring match used for window titles.
pub fn title_matches(title: &str, hint: &str) -> bool {
    title.to_lowercase().contains(&hint.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::{discover_region, title_matches, Rect, RegionProvider};
    use crate::util::{ClickMatchError, ClickMatchResult};

    struct Fixed(ClickMatchResult<Option<Rect>>);

    impl RegionProvider for Fixed {
        fn find_window(&self, _title_hint: &str) -> ClickMatchResult<Option<Rect>> {
            self.0.clone()
        }

        fn primary_display(&self) -> ClickMatchResult<Rect> {
            Ok(Rect::new(0, 0, 1920, 1080))
        }
    }

    #[test]
    fn window_rect_is_preferred() {
        let rect = Rect::new(100, 50, 800, 600);
        assert_eq!(discover_region(&Fixed(Ok(Some(rect))), "emu").unwrap(), rect);
    }

    #[test]
    fn lookup_failure_falls_back_to_primary_display() {
        let failing = Fixed(Err(ClickMatchError::Region {
            reason: "no window server".into(),
        }));
        assert_eq!(
            discover_region(&failing, "emu").unwrap(),
            Rect::new(0, 0, 1920, 1080)
        );
        assert_eq!(
            discover_region(&Fixed(Ok(None)), "emu").unwrap(),
            Rect::new(0, 0, 1920, 1080)
        );
    }

    #[test]
    fn empty_window_falls_back() {
        let empty = Fixed(Ok(Some(Rect::new(5, 5, 0, 0))));
        assert_eq!(discover_region(&empty, "emu").unwrap().width, 1920);
    }

    #[test]
    fn titles_match_case_insensitively() {
        assert!(title_matches("BlueStacks App Player 1", "bluestacks"));
        assert!(!title_matches("Terminal", "bluestacks"));
    }

    #[test]
    fn intersection_clips_to_the_shared_area() {
        let display = Rect::new(0, 0, 1920, 1080);
        let maximized = Rect::new(-8, -8, 1936, 1096);
        assert_eq!(maximized.intersect(&display), Some(display));
        assert_eq!(
            Rect::new(-8, -8, 800, 600).intersect(&display),
            Some(Rect::new(0, 0, 792, 592))
        );
        assert_eq!(Rect::new(1920, 0, 10, 10).intersect(&display), None);
        assert!(display.contains_rect(&Rect::new(0, 0, 792, 592)));
        assert!(!display.contains_rect(&Rect::new(-8, -8, 800, 600)));
    }

    #[test]
    fn relative_points_translate_by_origin() {
        let rect = Rect::new(-1920, 40, 100, 100);
        assert_eq!(rect.to_absolute((10, 5)), (-1910, 45));
    }
}
