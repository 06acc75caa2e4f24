//! Match candidates and the deterministic winner selection.

use crate::kernel::Peak;
use crate::template::Template;
use crate::util::math::unscale;
use std::cmp::Ordering;
use std::sync::Arc;

/// One template's best placement in a frame, above threshold.
#[derive(Clone, Debug)]
pub struct MatchCandidate {
    /// Template that produced the candidate.
    pub template: Arc<Template>,
    /// ZNCC score of the placement.
    pub score: f32,
    /// Center of the placement in (scaled) frame coordinates.
    pub center_in_frame: (usize, usize),
}

impl MatchCandidate {
    /// Builds a candidate from a peak, centering it on the template.
    pub fn from_peak(template: Arc<Template>, peak: Peak) -> Self {
        let (w, h) = (template.match_image().width(), template.match_image().height());
        Self {
            template,
            score: peak.score,
            center_in_frame: (peak.x + w / 2, peak.y + h / 2),
        }
    }

    /// Template name.
    pub fn name(&self) -> &str {
        self.template.name()
    }

    /// Maps the frame-space center back to rectangle-relative pixels.
    pub fn relative_to_region(&self, scale: f32) -> (i32, i32) {
        (
            unscale(self.center_in_frame.0, scale),
            unscale(self.center_in_frame.1, scale),
        )
    }
}

/// Threshold test; a score equal to the threshold is accepted.
pub fn qualifies(score: f32, threshold: f32) -> bool {
    score >= threshold
}

/// Orders candidates best first: higher score, then ascending name.
fn candidate_cmp(a: &MatchCandidate, b: &MatchCandidate) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| a.name().cmp(b.name()))
        .then_with(|| a.center_in_frame.1.cmp(&b.center_in_frame.1))
        .then_with(|| a.center_in_frame.0.cmp(&b.center_in_frame.0))
}

/// Picks the single winner, independent of input order.
pub fn select_best<I>(candidates: I) -> Option<MatchCandidate>
where
    I: IntoIterator<Item = MatchCandidate>,
{
    candidates.into_iter().min_by(candidate_cmp)
}
