//! The capture, match, act loop.
//!
//! One thread drives iterations. Each iteration checks the stop flag, reloads
//! templates when the reload interval has elapsed, and, unless paused or
//! without templates, captures a frame, matches it and dispatches a click.
//! Signals are only observed at iteration boundaries, so a stop request lets
//! the in-flight iteration finish.

pub mod state;

pub use state::{ControlState, LoopMetrics, LoopState, Severity, StatusEntry, StatusSnapshot};

use crate::action::{ActionDispatcher, Outcome};
use crate::backend::{Clicker, Rect, ScreenCapture};
use crate::config::Config;
use crate::frame::FrameSource;
use crate::search::MatchEngine;
use crate::store::{TemplateSet, TemplateStore};
use crate::trace::{trace_event, trace_span};
use crate::util::{ClickMatchError, ClickMatchResult};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

/// Consecutive capture failures after which frames count as unavailable.
pub const MAX_CONSECUTIVE_CAPTURE_FAILURES: u32 = 25;

/// What one iteration did.
#[derive(Clone, Debug, PartialEq)]
pub enum Step {
    /// Stop was requested; nothing was done.
    Stopped,
    /// Paused; only reload bookkeeping ran.
    Paused,
    /// No templates are loaded.
    Idle,
    /// A frame was matched but no template reached the threshold.
    NoMatch,
    /// The frame grab failed; recorded as the last error.
    CaptureFailed,
    /// A template matched and the dispatcher was invoked.
    Acted { template: String, outcome: Outcome },
}

pub struct ControlLoop<C, K> {
    cfg: Config,
    region: Rect,
    store: Arc<TemplateStore>,
    frames: FrameSource<C>,
    engine: MatchEngine,
    dispatcher: ActionDispatcher<K>,
    state: Arc<ControlState>,
    last_reload: Instant,
    /// Lifecycle state as of the previous iteration.
    observed: LoopState,
    /// Names of the last published set and of its skipped files.
    known_templates: Option<(Vec<String>, Vec<String>)>,
    capture_failures: u32,
}

impl<C: ScreenCapture, K: Clicker> ControlLoop<C, K> {
    /// Validates `cfg`, performs the initial template load and builds the
    /// worker pool.
    ///
    /// Fails if the template directory is unusable or the pool cannot start.
    pub fn new(
        cfg: Config,
        region: Rect,
        capture: C,
        clicker: K,
        state: Arc<ControlState>,
    ) -> ClickMatchResult<Self> {
        cfg.validate()?;
        let store = Arc::new(TemplateStore::new(&cfg.templates_dir, cfg.downscale));
        let set = store.reload()?;
        let engine = MatchEngine::new(cfg.worker_count)?;
        let mut control = Self {
            frames: FrameSource::new(capture, cfg.downscale),
            dispatcher: ActionDispatcher::new(clicker, cfg.click_cooldown),
            cfg,
            region,
            store,
            engine,
            state,
            last_reload: Instant::now(),
            observed: LoopState::Running,
            known_templates: None,
            capture_failures: 0,
        };
        control.publish_templates(&set);
        Ok(control)
    }

    /// Runs iterations until stop is requested.
    ///
    /// Returns an error only when frames cannot be captured at all.
    pub fn run(&mut self) -> ClickMatchResult<()> {
        let r = self.region;
        self.state.log(
            Severity::Info,
            format!(
                "watching region left={} top={} w={} h={}",
                r.left, r.top, r.width, r.height
            ),
        );
        trace_event!(
            "loop_started",
            left = r.left,
            top = r.top,
            width = r.width,
            height = r.height
        );

        loop {
            if self.step(Instant::now())? == Step::Stopped {
                break;
            }
            thread::sleep(self.cfg.scan_interval);
        }

        self.state.log(Severity::Info, "stopped");
        trace_event!("loop_stopped");
        Ok(())
    }

    /// Runs exactly one iteration as of `now`.
    pub fn step(&mut self, now: Instant) -> ClickMatchResult<Step> {
        let observed = self.observe_signals();
        if observed == LoopState::Stopped {
            return Ok(Step::Stopped);
        }
        let started = Instant::now();

        if now.saturating_duration_since(self.last_reload) >= self.cfg.reload_interval {
            self.reload_templates();
            self.last_reload = now;
        }

        let step = if observed == LoopState::Paused {
            Ok(Step::Paused)
        } else {
            self.scan(now)
        };
        self.state.record_iteration(started.elapsed());
        step
    }

    /// Reads the external flags and logs any transition since the last
    /// iteration.
    fn observe_signals(&mut self) -> LoopState {
        let current = self.state.state();
        if current != self.observed {
            let message = match current {
                LoopState::Running => "resumed",
                LoopState::Paused => "paused",
                LoopState::Stopped => "stop requested",
            };
            self.state.log(Severity::Info, message);
            trace_event!("signal_observed", state = message);
            self.observed = current;
        }
        current
    }

    fn scan(&mut self, now: Instant) -> ClickMatchResult<Step> {
        let set = self.store.current();
        if set.is_empty() {
            return Ok(Step::Idle);
        }

        let _span = trace_span!("iteration", templates = set.len()).entered();
        let frame = match self.frames.capture(self.region) {
            Ok(frame) => {
                self.capture_failures = 0;
                frame
            }
            Err(err) => {
                self.capture_failures += 1;
                self.state.record_error(err.to_string());
                if self.capture_failures >= MAX_CONSECUTIVE_CAPTURE_FAILURES {
                    return Err(ClickMatchError::CaptureUnavailable {
                        attempts: self.capture_failures,
                    });
                }
                return Ok(Step::CaptureFailed);
            }
        };

        let report = self.engine.evaluate(&frame, &set, self.cfg.match_threshold);
        for failure in &report.failures {
            self.state.log(
                Severity::Warn,
                format!("matching failed for {}: {}", failure.name, failure.error),
            );
        }
        let Some(best) = report.best else {
            return Ok(Step::NoMatch);
        };

        let relative = best.relative_to_region(frame.scale());
        let outcome = self.dispatcher.act(self.region, relative, now);
        match &outcome {
            Outcome::Clicked { x, y } => self.state.record_click(format!(
                "{} detected & clicked at ({x}, {y}), score {:.3}",
                best.name(),
                best.score
            )),
            Outcome::SkippedCooldown => {}
            Outcome::Failed(reason) => self.state.record_error(reason.clone()),
        }
        Ok(Step::Acted {
            template: best.name().to_owned(),
            outcome,
        })
    }

    fn reload_templates(&mut self) {
        match self.store.reload() {
            Ok(set) => self.publish_templates(&set),
            Err(err) => self
                .state
                .record_error(format!("template reload failed: {err}")),
        }
    }

    fn publish_templates(&mut self, set: &TemplateSet) {
        let names: Vec<String> = set.names().into_iter().map(str::to_owned).collect();
        let skipped: Vec<String> = set.skipped().iter().map(|s| s.name.clone()).collect();
        if let Some((known, known_skipped)) = &self.known_templates {
            if *known == names && *known_skipped == skipped {
                return;
            }
        }

        self.state.log(
            Severity::Info,
            format!("templates loaded: {} ({} skipped)", names.len(), skipped.len()),
        );
        for file in set.skipped() {
            self.state
                .log(Severity::Warn, format!("skipped {}: {}", file.name, file.error));
        }
        self.state.record_templates(names.clone());
        self.known_templates = Some((names, skipped));
    }

    /// Shared control flags and status.
    pub fn state(&self) -> &Arc<ControlState> {
        &self.state
    }

    /// Template store; reloading it from another thread is safe.
    pub fn store(&self) -> &Arc<TemplateStore> {
        &self.store
    }

    pub fn region(&self) -> Rect {
        self.region
    }

    /// Replaces the monitored rectangle, e.g. after the window moved.
    pub fn set_region(&mut self, region: Rect) {
        self.region = region;
    }

    pub fn frame_source(&self) -> &FrameSource<C> {
        &self.frames
    }

    pub fn dispatcher(&self) -> &ActionDispatcher<K> {
        &self.dispatcher
    }

    pub fn config(&self) -> &Config {
        &self.cfg
    }
}
