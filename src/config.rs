//! Runtime configuration for the control loop.

use crate::search::default_worker_count;
use crate::util::{ClickMatchError, ClickMatchResult};
use std::path::PathBuf;
use std::time::Duration;

/// Options for template loading, matching, and click pacing.
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    /// Directory scanned for template images; created when missing.
    pub templates_dir: PathBuf,
    /// Minimum ZNCC score for a match (inclusive), in `[0, 1]`.
    pub match_threshold: f32,
    /// Uniform shrink applied to frames and templates, in `(0, 1]`.
    pub downscale: f32,
    /// How often the template directory is rescanned.
    pub reload_interval: Duration,
    /// Pause at the end of every loop iteration.
    pub scan_interval: Duration,
    /// Minimum time between two clicks.
    pub click_cooldown: Duration,
    /// Matching worker threads.
    pub worker_count: usize,
    /// Case-insensitive substring of the target window title.
    pub region_title_hint: String,
    /// Status lines retained for display.
    pub max_log_lines: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            templates_dir: PathBuf::from("buttons"),
            match_threshold: 0.86,
            downscale: 0.90,
            reload_interval: Duration::from_secs(10),
            scan_interval: Duration::from_millis(20),
            click_cooldown: Duration::from_millis(200),
            worker_count: default_worker_count(),
            region_title_hint: "BlueStacks".to_owned(),
            max_log_lines: 12,
        }
    }
}

impl Config {
    /// Checks value ranges.
    pub fn validate(&self) -> ClickMatchResult<()> {
        if !(0.0..=1.0).contains(&self.match_threshold) {
            return Err(ClickMatchError::InvalidConfig {
                field: "match_threshold",
                reason: "must be within [0, 1]",
            });
        }
        if !(self.downscale > 0.0 && self.downscale <= 1.0) {
            return Err(ClickMatchError::InvalidConfig {
                field: "downscale",
                reason: "must be within (0, 1]",
            });
        }
        if self.worker_count == 0 {
            return Err(ClickMatchError::InvalidConfig {
                field: "worker_count",
                reason: "must be at least 1",
            });
        }
        if self.max_log_lines == 0 {
            return Err(ClickMatchError::InvalidConfig {
                field: "max_log_lines",
                reason: "must be at least 1",
            });
        }
        Ok(())
    }
}
