//! Process-wide control flags and observable status.
//!
//! Writers are split by field: external signal sources (hotkeys, the CLI
//! command thread) only flip `paused` and `running`; the control loop owns
//! every status field. Flags are plain atomics, so the loop may see a toggle
//! one iteration late.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, SystemTime};

/// Severity of a status line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Warn,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            Severity::Info => "info",
            Severity::Warn => "warn",
            Severity::Error => "error",
        })
    }
}

/// One line of the status log.
#[derive(Clone, Debug, PartialEq)]
pub struct StatusEntry {
    pub at: SystemTime,
    pub severity: Severity,
    pub message: String,
}

/// Loop lifecycle as seen from outside.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopState {
    Running,
    Paused,
    Stopped,
}

/// Timing of the most recent iteration plus counters.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LoopMetrics {
    pub loop_time: Duration,
    /// Iterations per second implied by `loop_time`.
    pub rate_hz: f64,
    pub iterations: u64,
    pub clicks: u64,
}

/// Consistent copy of the status for display.
#[derive(Clone, Debug)]
pub struct StatusSnapshot {
    pub state: LoopState,
    pub last_action: Option<String>,
    pub last_error: Option<String>,
    pub last_click_at: Option<SystemTime>,
    pub templates: Vec<String>,
    pub metrics: LoopMetrics,
    pub log: Vec<StatusEntry>,
}

#[derive(Default)]
struct Status {
    last_action: Option<String>,
    last_error: Option<String>,
    last_click_at: Option<SystemTime>,
    templates: Vec<String>,
    metrics: LoopMetrics,
    log: VecDeque<StatusEntry>,
}

/// Shared between the control loop and external observers.
pub struct ControlState {
    running: AtomicBool,
    paused: AtomicBool,
    max_log_lines: usize,
    status: Mutex<Status>,
}

impl ControlState {
    pub fn new(max_log_lines: usize) -> Self {
        Self {
            running: AtomicBool::new(true),
            paused: AtomicBool::new(false),
            max_log_lines: max_log_lines.max(1),
            status: Mutex::new(Status::default()),
        }
    }

    /// Flips pause and returns the new value.
    ///
    /// Only the flag is written; the loop logs the transition when it sees it.
    pub fn request_pause_toggle(&self) -> bool {
        !self.paused.fetch_xor(true, Ordering::AcqRel)
    }

    /// Asks the loop to finish its current iteration and exit.
    pub fn request_stop(&self) {
        self.running.store(false, Ordering::Release);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    pub fn state(&self) -> LoopState {
        if !self.is_running() {
            LoopState::Stopped
        } else if self.is_paused() {
            LoopState::Paused
        } else {
            LoopState::Running
        }
    }

    /// Appends a status line, dropping the oldest beyond the retention limit.
    pub fn log(&self, severity: Severity, message: impl Into<String>) {
        let mut status = self.status.lock();
        status.log.push_back(StatusEntry {
            at: SystemTime::now(),
            severity,
            message: message.into(),
        });
        while status.log.len() > self.max_log_lines {
            status.log.pop_front();
        }
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        let status = self.status.lock();
        StatusSnapshot {
            state: self.state(),
            last_action: status.last_action.clone(),
            last_error: status.last_error.clone(),
            last_click_at: status.last_click_at,
            templates: status.templates.clone(),
            metrics: status.metrics.clone(),
            log: status.log.iter().cloned().collect(),
        }
    }

    pub(crate) fn record_click(&self, action: String) {
        {
            let mut status = self.status.lock();
            status.last_action = Some(action.clone());
            status.last_error = None;
            status.last_click_at = Some(SystemTime::now());
            status.metrics.clicks += 1;
        }
        self.log(Severity::Info, action);
    }

    pub(crate) fn record_error(&self, error: String) {
        self.status.lock().last_error = Some(error.clone());
        self.log(Severity::Error, error);
    }

    pub(crate) fn record_templates(&self, names: Vec<String>) {
        self.status.lock().templates = names;
    }

    pub(crate) fn record_iteration(&self, loop_time: Duration) {
        let mut status = self.status.lock();
        let secs = loop_time.as_secs_f64();
        status.metrics.loop_time = loop_time;
        status.metrics.rate_hz = if secs > 0.0 { 1.0 / secs } else { 0.0 };
        status.metrics.iterations += 1;
    }
}

impl Default for ControlState {
    fn default() -> Self {
        Self::new(12)
    }
}

#[cfg(test)]
mod tests {
    use super::{ControlState, LoopState, Severity};
    use std::time::Duration;

    #[test]
    fn pause_toggles_and_stop_is_terminal() {
        let state = ControlState::default();
        assert_eq!(state.state(), LoopState::Running);
        assert!(state.request_pause_toggle());
        assert_eq!(state.state(), LoopState::Paused);
        assert!(!state.request_pause_toggle());
        assert_eq!(state.state(), LoopState::Running);

        state.request_stop();
        state.request_pause_toggle();
        assert_eq!(state.state(), LoopState::Stopped);
    }

    #[test]
    fn signals_only_touch_flags() {
        let state = ControlState::default();
        state.request_pause_toggle();
        state.request_stop();
        let snapshot = state.snapshot();
        assert!(snapshot.log.is_empty());
        assert_eq!(snapshot.state, LoopState::Stopped);
    }

    #[test]
    fn log_is_bounded() {
        let state = ControlState::new(3);
        for idx in 0..5 {
            state.log(Severity::Info, format!("line {idx}"));
        }
        let log = state.snapshot().log;
        assert_eq!(log.len(), 3);
        assert_eq!(log[0].message, "line 2");
        assert_eq!(log[2].message, "line 4");
    }

    #[test]
    fn click_clears_previous_error() {
        let state = ControlState::default();
        state.record_error("click failed: blocked".into());
        assert!(state.snapshot().last_error.is_some());
        state.record_click("ok.png clicked".into());
        let snapshot = state.snapshot();
        assert_eq!(snapshot.last_action.as_deref(), Some("ok.png clicked"));
        assert!(snapshot.last_error.is_none());
        assert_eq!(snapshot.metrics.clicks, 1);
        assert!(snapshot.last_click_at.is_some());
    }

    #[test]
    fn metrics_derive_rate() {
        let state = ControlState::default();
        state.record_iteration(Duration::from_millis(20));
        let metrics = state.snapshot().metrics;
        assert!((metrics.rate_hz - 50.0).abs() < 1e-9);
        assert_eq!(metrics.iterations, 1);
    }
}
