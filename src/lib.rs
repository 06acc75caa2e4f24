//! ClickMatch watches a screen region for known button images and clicks the
//! best match, at a bounded rate.
//!
//! The crate is the capture, match, act core: template loading with atomic
//! hot-reload, grayscale frame preprocessing, concurrent ZNCC matching of all
//! templates with a deterministic winner, cooldown-limited click dispatch and
//! the control loop tying them together. Screen capture, click injection and
//! window discovery are reached through the traits in [`backend`].

pub mod action;
pub mod backend;
mod candidate;
pub mod config;
pub mod control;
pub mod frame;
pub mod image;
mod kernel;
pub mod search;
pub mod store;
pub mod template;
mod trace;
pub mod util;

pub use action::{ActionDispatcher, Outcome};
pub use backend::{discover_region, Clicker, Rect, RegionProvider, ScreenCapture};
pub use candidate::{qualifies, select_best, MatchCandidate};
pub use config::Config;
pub use control::{ControlLoop, ControlState, LoopState, Severity, StatusSnapshot, Step};
pub use frame::{Frame, FrameSource};
pub use image::convert::{PixelFormat, RawFrame};
pub use image::{ImageView, OwnedImage};
pub use kernel::Peak;
pub use search::{default_worker_count, match_template, MatchEngine, MatchReport};
pub use store::{load_template_set, TemplateSet, TemplateStore};
pub use template::{Template, TemplatePlan};
pub use util::{ClickMatchError, ClickMatchResult};
