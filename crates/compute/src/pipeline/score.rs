use std::cmp::Ordering;

use super::features::{FeatureVector, ScoringWeights};

/// Run-wide confidence multiplier: `min(1, total_events / baseline)`.
///
/// A baseline of zero disables dampening.
pub fn activity_factor(total_events: usize, baseline: u32) -> f64 {
    if baseline == 0 {
        return 1.0;
    }
    (total_events as f64 / baseline as f64).min(1.0)
}

/// Weighted sum of the normalized features, scaled by the activity factor.
pub fn closeness_score(weights: &ScoringWeights, normalized: &FeatureVector, activity: f64) -> f64 {
    weights.weighted_sum(normalized) * activity
}

/// Sort descending by score. The sort is stable, so equal scores keep their
/// enumeration order.
pub fn rank_by<T>(items: &mut [T], score: impl Fn(&T) -> f64) {
    items.sort_by(|x, y| descending(score(x), score(y)));
}

fn descending(x: f64, y: f64) -> Ordering {
    y.total_cmp(&x)
}
