//! Click dispatch with a global cooldown.

use crate::backend::{Clicker, Rect};
use crate::trace::{trace_event, trace_warn};
use std::time::{Duration, Instant};

/// Result of one dispatch attempt.
#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
    /// The click was issued at the given absolute screen coordinate.
    Clicked { x: i32, y: i32 },
    /// Suppressed because the previous click is too recent.
    SkippedCooldown,
    /// Click injection failed; the loop carries on.
    Failed(String),
}

/// Converts region-relative points to screen points and clicks them.
///
/// The cooldown is one timestamp shared by all templates, advanced only by
/// successful clicks.
pub struct ActionDispatcher<K> {
    clicker: K,
    cooldown: Duration,
    last_click_at: Option<Instant>,
}

impl<K: Clicker> ActionDispatcher<K> {
    pub fn new(clicker: K, cooldown: Duration) -> Self {
        Self {
            clicker,
            cooldown,
            last_click_at: None,
        }
    }

    /// Clicks `relative` inside `rect` unless the cooldown is still running.
    pub fn act(&mut self, rect: Rect, relative: (i32, i32), now: Instant) -> Outcome {
        if let Some(last) = self.last_click_at {
            if now.saturating_duration_since(last) < self.cooldown {
                return Outcome::SkippedCooldown;
            }
        }
        let (x, y) = rect.to_absolute(relative);
        match self.clicker.click(x, y) {
            Ok(()) => {
                self.last_click_at = Some(now);
                trace_event!("clicked", x = x, y = y);
                Outcome::Clicked { x, y }
            }
            Err(err) => {
                trace_warn!("click_failed", x = x, y = y, error = err);
                Outcome::Failed(err.to_string())
            }
        }
    }

    /// Time of the most recent successful click.
    pub fn last_click_at(&self) -> Option<Instant> {
        self.last_click_at
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// Returns the wrapped click backend.
    pub fn clicker(&self) -> &K {
        &self.clicker
    }
}
