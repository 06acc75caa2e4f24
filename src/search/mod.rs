//! Multi-template matching against one frame.
//!
//! Every template is correlated against the same frame on a bounded rayon
//! pool. The engine always waits for all templates before choosing: worker
//! completion order carries no meaning, so the winner is picked by score and
//! then by template name, which makes the result reproducible for a given
//! frame and template set.

use crate::candidate::{qualifies, select_best, MatchCandidate};
use crate::frame::Frame;
use crate::kernel::scalar::best_peak;
use crate::kernel::Peak;
use crate::store::TemplateSet;
use crate::template::Template;
use crate::trace::{trace_debug, trace_span, trace_warn};
use crate::util::{ClickMatchError, ClickMatchResult};
use rayon::prelude::*;
use std::sync::Arc;

/// Pool size used when none is configured: at least four, more on larger
/// machines.
pub fn default_worker_count() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
        .max(4)
}

/// A template whose evaluation failed for this frame.
#[derive(Clone, Debug, PartialEq)]
pub struct TemplateFailure {
    pub name: String,
    pub error: ClickMatchError,
}

/// Result of evaluating a whole template set against one frame.
#[derive(Clone, Debug, Default)]
pub struct MatchReport {
    /// Winning candidate, if any template reached the threshold.
    pub best: Option<MatchCandidate>,
    /// Number of templates that reached the threshold.
    pub candidates: usize,
    /// Templates larger than the frame, skipped for this frame.
    pub oversized: usize,
    /// Templates whose evaluation failed; they contribute no candidate.
    pub failures: Vec<TemplateFailure>,
}

enum Evaluation {
    Candidate(MatchCandidate),
    Rejected,
    Oversized,
    Failed(TemplateFailure),
}

/// Correlates one template against a frame.
///
/// Returns `Ok(None)` when the template does not fit inside the frame or no
/// window has a defined score.
pub fn match_template(frame: &Frame, template: &Template) -> ClickMatchResult<Option<Peak>> {
    let tpl = template.match_image();
    if tpl.width() > frame.width() || tpl.height() > frame.height() {
        return Ok(None);
    }
    best_peak(frame.image(), frame.integral(), template.plan())
}

/// Concurrent matcher owning a bounded worker pool reused across frames.
pub struct MatchEngine {
    pool: rayon::ThreadPool,
}

impl MatchEngine {
    /// Builds an engine with `workers` threads.
    pub fn new(workers: usize) -> ClickMatchResult<Self> {
        if workers == 0 {
            return Err(ClickMatchError::InvalidInput("worker count must be positive"));
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|idx| format!("clickmatch-worker-{idx}"))
            .build()
            .map_err(|err| ClickMatchError::WorkerPool {
                reason: err.to_string(),
            })?;
        Ok(Self { pool })
    }

    /// Number of worker threads.
    pub fn workers(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Returns the single best candidate at or above `threshold`.
    pub fn find_best_match(
        &self,
        frame: &Frame,
        set: &TemplateSet,
        threshold: f32,
    ) -> Option<MatchCandidate> {
        self.evaluate(frame, set, threshold).best
    }

    /// Evaluates every template and reports the winner and any failures.
    pub fn evaluate(&self, frame: &Frame, set: &TemplateSet, threshold: f32) -> MatchReport {
        self.evaluate_with(frame, set.templates(), threshold, match_template)
    }

    pub(crate) fn evaluate_with<F>(
        &self,
        frame: &Frame,
        templates: &[Arc<Template>],
        threshold: f32,
        eval: F,
    ) -> MatchReport
    where
        F: Fn(&Frame, &Template) -> ClickMatchResult<Option<Peak>> + Sync,
    {
        let _span = trace_span!("match_frame", templates = templates.len()).entered();

        let evaluations: Vec<Evaluation> = self.pool.install(|| {
            templates
                .par_iter()
                .map(|template| {
                    let tpl = template.match_image();
                    if tpl.width() > frame.width() || tpl.height() > frame.height() {
                        return Evaluation::Oversized;
                    }
                    match eval(frame, template) {
                        Ok(Some(peak)) if qualifies(peak.score, threshold) => {
                            Evaluation::Candidate(MatchCandidate::from_peak(
                                Arc::clone(template),
                                peak,
                            ))
                        }
                        Ok(_) => Evaluation::Rejected,
                        Err(error) => Evaluation::Failed(TemplateFailure {
                            name: template.name().to_owned(),
                            error,
                        }),
                    }
                })
                .collect()
        });

        let mut report = MatchReport::default();
        let mut candidates = Vec::new();
        for evaluation in evaluations {
            match evaluation {
                Evaluation::Candidate(candidate) => candidates.push(candidate),
                Evaluation::Rejected => {}
                Evaluation::Oversized => report.oversized += 1,
                Evaluation::Failed(failure) => {
                    trace_warn!(
                        "template_match_failed",
                        template = failure.name,
                        error = failure.error
                    );
                    report.failures.push(failure);
                }
            }
        }
        report.candidates = candidates.len();
        report.best = select_best(candidates);
        if let Some(best) = &report.best {
            trace_debug!("match_selected", template = best.name(), score = best.score);
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::{match_template, MatchEngine};
    use crate::frame::Frame;
    use crate::image::OwnedImage;
    use crate::store::{TemplateSet, TemplateStore};
    use crate::template::Template;
    use crate::util::ClickMatchError;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::thread::sleep;
    use std::time::Duration;

    fn noise(width: usize, height: usize, seed: u64) -> Vec<u8> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..width * height).map(|_| rng.random()).collect()
    }

    fn crop(data: &[u8], stride: usize, x: usize, y: usize, w: usize, h: usize) -> Vec<u8> {
        (y..y + h)
            .flat_map(|row| data[row * stride + x..row * stride + x + w].iter().copied())
            .collect()
    }

    fn scene() -> (Frame, Vec<Template>) {
        let (w, h) = (96, 64);
        let pixels = noise(w, h, 11);
        let templates = vec![
            Template::new("c.png", crop(&pixels, w, 60, 30, 12, 10), 12, 10, 1.0).unwrap(),
            Template::new("a.png", crop(&pixels, w, 5, 7, 9, 9), 9, 9, 1.0).unwrap(),
            Template::new("b.png", noise(10, 10, 99), 10, 10, 1.0).unwrap(),
            Template::new("d.png", crop(&pixels, w, 40, 2, 14, 8), 14, 8, 1.0).unwrap(),
        ];
        let frame = Frame::from_gray(OwnedImage::new(pixels, w, h).unwrap(), (0, 0), 1.0).unwrap();
        (frame, templates)
    }

    #[test]
    fn winner_is_independent_of_worker_timing() {
        let (frame, templates) = scene();
        let templates: Vec<_> = templates.into_iter().map(Arc::new).collect();
        let engine = MatchEngine::new(4).unwrap();

        let baseline = engine
            .evaluate_with(&frame, &templates, 0.8, match_template)
            .best
            .unwrap();
        for _ in 0..12 {
            let report = engine.evaluate_with(&frame, &templates, 0.8, |frame, template| {
                let delay = rand::rng().random_range(0..4);
                sleep(Duration::from_millis(delay));
                match_template(frame, template)
            });
            let best = report.best.unwrap();
            assert_eq!(best.name(), baseline.name());
            assert_eq!(best.score, baseline.score);
            assert_eq!(best.center_in_frame, baseline.center_in_frame);
            assert_eq!(report.candidates, 3);
        }
    }

    #[test]
    fn identical_scores_resolve_by_name() {
        let (frame, templates) = scene();
        let templates: Vec<_> = templates.into_iter().map(Arc::new).collect();
        let engine = MatchEngine::new(4).unwrap();
        // All three exact crops score ~1.0; pin them to the same value.
        let report = engine.evaluate_with(&frame, &templates, 0.8, |frame, template| {
            Ok(match_template(frame, template)?.map(|mut peak| {
                if peak.score > 0.99 {
                    peak.score = 1.0;
                }
                peak
            }))
        });
        assert_eq!(report.best.unwrap().name(), "a.png");
    }

    #[test]
    fn failing_template_does_not_abort_others() {
        let (frame, templates) = scene();
        let templates: Vec<_> = templates.into_iter().map(Arc::new).collect();
        let engine = MatchEngine::new(4).unwrap();
        let report = engine.evaluate_with(&frame, &templates, 0.8, |frame, template| {
            if template.name() == "a.png" {
                return Err(ClickMatchError::BufferTooSmall { needed: 10, got: 0 });
            }
            match_template(frame, template)
        });
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].name, "a.png");
        assert_eq!(report.candidates, 2);
        assert!(report.best.is_some());
    }

    #[test]
    fn reload_during_match_keeps_the_started_snapshot() {
        let (w, h) = (64, 48);
        let pixels = noise(w, h, 21);
        let patch = crop(&pixels, w, 20, 12, 16, 12);
        let frame = Frame::from_gray(OwnedImage::new(pixels, w, h).unwrap(), (0, 0), 1.0).unwrap();

        let store = TemplateStore::new("unused", 1.0);
        store.install(TemplateSet::new(vec![
            Template::new("old.png", patch.clone(), 16, 12, 1.0).unwrap(),
        ]));
        let snapshot = store.current();
        let engine = MatchEngine::new(4).unwrap();

        // The replacement would win on name if the match saw it.
        let swapped = AtomicBool::new(false);
        let report = engine.evaluate_with(&frame, snapshot.templates(), 0.86, |frame, template| {
            if !swapped.swap(true, Ordering::SeqCst) {
                store.install(TemplateSet::new(vec![
                    Template::new("a_new.png", patch.clone(), 16, 12, 1.0).unwrap(),
                ]));
            }
            match_template(frame, template)
        });

        assert!(swapped.load(Ordering::SeqCst));
        assert!(report.failures.is_empty());
        assert_eq!(report.best.unwrap().name(), "old.png");
        assert_eq!(snapshot.names(), vec!["old.png"]);
        assert_eq!(store.current().names(), vec!["a_new.png"]);
    }

    #[test]
    fn oversized_templates_are_skipped() {
        let pixels = noise(8, 8, 3);
        let frame = Frame::from_gray(OwnedImage::new(pixels, 8, 8).unwrap(), (0, 0), 1.0).unwrap();
        let big = Template::new("big.png", noise(9, 4, 4), 9, 4, 1.0).unwrap();
        let set = TemplateSet::new(vec![big]);
        let engine = MatchEngine::new(4).unwrap();
        let report = engine.evaluate(&frame, &set, 0.0);
        assert!(report.best.is_none());
        assert_eq!(report.oversized, 1);
        assert!(report.failures.is_empty());
    }

    #[test]
    fn zero_workers_is_rejected() {
        assert!(MatchEngine::new(0).is_err());
    }
}
