//! Desktop backends: xcap for pixels and window geometry, enigo for clicks.

use clickmatch::backend::title_matches;
use clickmatch::{
    ClickMatchError, ClickMatchResult, Clicker, PixelFormat, RawFrame, Rect, RegionProvider,
    ScreenCapture,
};
use enigo::{Button, Coordinate, Direction, Enigo, Mouse, Settings};
use std::fmt::Display;
use xcap::image::imageops;
use xcap::{Monitor, Window};

fn capture_error(err: impl Display) -> ClickMatchError {
    ClickMatchError::Capture {
        reason: err.to_string(),
    }
}

fn region_error(err: impl Display) -> ClickMatchError {
    ClickMatchError::Region {
        reason: err.to_string(),
    }
}

fn monitor_rect(monitor: &Monitor) -> xcap::XCapResult<Rect> {
    Ok(Rect::new(
        monitor.x()?,
        monitor.y()?,
        monitor.width()?,
        monitor.height()?,
    ))
}

fn monitors() -> xcap::XCapResult<Vec<(Monitor, Rect)>> {
    Monitor::all()?
        .into_iter()
        .map(|monitor| {
            let bounds = monitor_rect(&monitor)?;
            Ok((monitor, bounds))
        })
        .collect()
}

/// Clips `rect` to the monitor it overlaps most.
///
/// Window frames routinely extend past the screen (maximized windows report
/// a negative origin), so the visible part is what gets captured and what
/// click coordinates are relative to.
fn fit_to_monitors(rect: Rect, bounds: &[Rect]) -> Option<Rect> {
    bounds
        .iter()
        .filter_map(|b| rect.intersect(b))
        .max_by_key(Rect::area)
}

/// Offset of `rect` inside a monitor image, only if it lies entirely on it.
fn crop_offset(rect: Rect, bounds: Rect) -> Option<(u32, u32)> {
    if !bounds.contains_rect(&rect) {
        return None;
    }
    Some(((rect.left - bounds.left) as u32, (rect.top - bounds.top) as u32))
}

/// Grabs the monitor holding the region and crops it to exactly that region.
///
/// The monitor is looked up once and reused until the region moves off it or
/// a grab fails.
#[derive(Default)]
pub struct XcapCapture {
    monitor: Option<(Monitor, Rect)>,
}

impl XcapCapture {
    fn monitor_for(&mut self, rect: Rect) -> ClickMatchResult<&(Monitor, Rect)> {
        let cached = matches!(&self.monitor, Some((_, bounds)) if bounds.contains_rect(&rect));
        if !cached {
            let found = monitors()
                .map_err(capture_error)?
                .into_iter()
                .find(|(_, bounds)| bounds.contains_rect(&rect));
            self.monitor = found;
        }
        self.monitor
            .as_ref()
            .ok_or_else(|| capture_error("region does not lie on a single monitor"))
    }
}

impl ScreenCapture for XcapCapture {
    fn grab(&mut self, rect: Rect) -> ClickMatchResult<RawFrame> {
        let (monitor, bounds) = self.monitor_for(rect)?;
        let (x, y) = crop_offset(rect, *bounds)
            .ok_or_else(|| capture_error("region does not lie on a single monitor"))?;
        let screen = match monitor.capture_image() {
            Ok(screen) => screen,
            Err(err) => {
                self.monitor = None;
                return Err(capture_error(err));
            }
        };
        if x + rect.width > screen.width() || y + rect.height > screen.height() {
            self.monitor = None;
            return Err(capture_error("monitor image smaller than its reported bounds"));
        }

        let cropped = imageops::crop_imm(&screen, x, y, rect.width, rect.height).to_image();
        Ok(RawFrame::packed(
            cropped.into_raw(),
            rect.width as usize,
            rect.height as usize,
            PixelFormat::Rgba8,
        ))
    }
}

/// Window lookup by title, with the primary monitor as fallback.
pub struct XcapRegions;

impl RegionProvider for XcapRegions {
    fn find_window(&self, title_hint: &str) -> ClickMatchResult<Option<Rect>> {
        for window in Window::all().map_err(region_error)? {
            let Ok(title) = window.title() else {
                continue;
            };
            if !title_matches(&title, title_hint) || window.is_minimized().unwrap_or(false) {
                continue;
            }
            let frame = Rect::new(
                window.x().map_err(region_error)?,
                window.y().map_err(region_error)?,
                window.width().map_err(region_error)?,
                window.height().map_err(region_error)?,
            );
            let bounds: Vec<Rect> = monitors()
                .map_err(region_error)?
                .into_iter()
                .map(|(_, bounds)| bounds)
                .collect();
            let Some(visible) = fit_to_monitors(frame, &bounds) else {
                tracing::warn!(title = %title, ?frame, "window is off screen");
                continue;
            };
            tracing::info!(title = %title, ?frame, ?visible, "window found");
            return Ok(Some(visible));
        }
        Ok(None)
    }

    fn primary_display(&self) -> ClickMatchResult<Rect> {
        let monitors = Monitor::all().map_err(region_error)?;
        let primary = monitors
            .iter()
            .find(|m| m.is_primary().unwrap_or(false))
            .or_else(|| monitors.first())
            .ok_or_else(|| region_error("no monitors found"))?;
        monitor_rect(primary).map_err(region_error)
    }
}

/// Moves the pointer to an absolute position and left-clicks.
pub struct EnigoClicker {
    enigo: Enigo,
}

impl EnigoClicker {
    pub fn new() -> ClickMatchResult<Self> {
        let enigo = Enigo::new(&Settings::default()).map_err(|err| ClickMatchError::Click {
            reason: err.to_string(),
        })?;
        Ok(Self { enigo })
    }
}

impl Clicker for EnigoClicker {
    fn click(&mut self, x: i32, y: i32) -> ClickMatchResult<()> {
        let click_error = |err: enigo::InputError| ClickMatchError::Click {
            reason: err.to_string(),
        };
        self.enigo
            .move_mouse(x, y, Coordinate::Abs)
            .map_err(click_error)?;
        self.enigo
            .button(Button::Left, Direction::Click)
            .map_err(click_error)
    }
}
