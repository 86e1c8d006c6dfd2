use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ComputeError;

/// Response time assumed when a pair never alternates, in seconds.
///
/// Silence is a weak signal, not a zero one. This value also feeds the
/// normalization bounds, so it must stay fixed.
pub const DEFAULT_RESPONSE_SECS: f64 = 300.0;

/// Maximum gap between two messages for them to count as one exchange.
pub const CONTINUITY_GAP_SECS: f64 = 60.0;

/// The seven behavioral features scored for every pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Feature {
    ResponseTime,
    ChatFrequency,
    InteractionContinuity,
    Reciprocity,
    MessageLength,
    ReplyCount,
    DialogueContinuity,
}

impl Feature {
    pub const ALL: [Feature; 7] = [
        Feature::ResponseTime,
        Feature::ChatFrequency,
        Feature::InteractionContinuity,
        Feature::Reciprocity,
        Feature::MessageLength,
        Feature::ReplyCount,
        Feature::DialogueContinuity,
    ];

    /// Column name used in result tables.
    pub fn name(self) -> &'static str {
        match self {
            Feature::ResponseTime => "avg_response_time",
            Feature::ChatFrequency => "chat_frequency",
            Feature::InteractionContinuity => "interaction_continuity",
            Feature::Reciprocity => "reciprocity",
            Feature::MessageLength => "message_length",
            Feature::ReplyCount => "reply_count",
            Feature::DialogueContinuity => "dialogue_continuity",
        }
    }

    /// Smaller raw value means closer (only response time).
    pub fn inverted(self) -> bool {
        matches!(self, Feature::ResponseTime)
    }

    pub fn default_weight(self) -> f64 {
        match self {
            Feature::ResponseTime => 0.20,
            Feature::ChatFrequency => 0.20,
            Feature::InteractionContinuity => 0.15,
            Feature::Reciprocity => 0.10,
            Feature::MessageLength => 0.10,
            Feature::ReplyCount => 0.20,
            Feature::DialogueContinuity => 0.05,
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One value per [`Feature`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub avg_response_time: f64,
    pub chat_frequency: f64,
    pub interaction_continuity: f64,
    pub reciprocity: f64,
    pub message_length: f64,
    pub reply_count: f64,
    pub dialogue_continuity: f64,
}

impl FeatureVector {
    /// Vector with every feature set to `value`.
    pub fn splat(value: f64) -> Self {
        Self::from_fn(|_| value)
    }

    pub fn from_fn(mut f: impl FnMut(Feature) -> f64) -> Self {
        let mut v = Self::default();
        for feature in Feature::ALL {
            v.set(feature, f(feature));
        }
        v
    }

    pub fn get(&self, feature: Feature) -> f64 {
        match feature {
            Feature::ResponseTime => self.avg_response_time,
            Feature::ChatFrequency => self.chat_frequency,
            Feature::InteractionContinuity => self.interaction_continuity,
            Feature::Reciprocity => self.reciprocity,
            Feature::MessageLength => self.message_length,
            Feature::ReplyCount => self.reply_count,
            Feature::DialogueContinuity => self.dialogue_continuity,
        }
    }

    pub fn set(&mut self, feature: Feature, value: f64) {
        let slot = match feature {
            Feature::ResponseTime => &mut self.avg_response_time,
            Feature::ChatFrequency => &mut self.chat_frequency,
            Feature::InteractionContinuity => &mut self.interaction_continuity,
            Feature::Reciprocity => &mut self.reciprocity,
            Feature::MessageLength => &mut self.message_length,
            Feature::ReplyCount => &mut self.reply_count,
            Feature::DialogueContinuity => &mut self.dialogue_continuity,
        };
        *slot = value;
    }

    /// First feature whose value is NaN or infinite.
    pub fn first_non_finite(&self) -> Option<(Feature, f64)> {
        Feature::ALL
            .into_iter()
            .map(|f| (f, self.get(f)))
            .find(|(_, v)| !v.is_finite())
    }
}

/// Per-feature weights of the composite score. Always sums to 1.0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    weights: FeatureVector,
}

impl ScoringWeights {
    pub fn new(weights: FeatureVector) -> Result<Self, ComputeError> {
        if let Some((feature, value)) = Feature::ALL
            .into_iter()
            .map(|f| (f, weights.get(f)))
            .find(|(_, v)| !v.is_finite() || *v < 0.0)
        {
            return Err(ComputeError::InvalidWeights(format!(
                "{} has weight {}",
                feature, value
            )));
        }

        let total: f64 = Feature::ALL.iter().map(|f| weights.get(*f)).sum();
        if (total - 1.0).abs() > 1e-9 {
            return Err(ComputeError::InvalidWeights(format!(
                "weights sum to {:.6}, expected 1.0",
                total
            )));
        }

        Ok(Self { weights })
    }

    /// One weight per feature, in [`Feature::ALL`] order.
    pub fn from_values(values: &[f64]) -> Result<Self, ComputeError> {
        if values.len() != Feature::ALL.len() {
            return Err(ComputeError::InvalidWeights(format!(
                "expected {} weights, got {}",
                Feature::ALL.len(),
                values.len()
            )));
        }
        let mut weights = FeatureVector::splat(0.0);
        for (feature, value) in Feature::ALL.into_iter().zip(values) {
            weights.set(feature, *value);
        }
        Self::new(weights)
    }

    pub fn weight(&self, feature: Feature) -> f64 {
        self.weights.get(feature)
    }

    /// Σ weight_i × normalized_i.
    pub fn weighted_sum(&self, normalized: &FeatureVector) -> f64 {
        Feature::ALL
            .iter()
            .map(|f| self.weights.get(*f) * normalized.get(*f))
            .sum()
    }
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            weights: FeatureVector::from_fn(Feature::default_weight),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_weights_sum_to_one() {
        let total: f64 = Feature::ALL.iter().map(|f| f.default_weight()).sum();
        assert!((total - 1.0).abs() < 1e-12);
        assert!(ScoringWeights::new(FeatureVector::from_fn(Feature::default_weight)).is_ok());
    }

    #[test]
    fn only_response_time_is_inverted() {
        let inverted: Vec<Feature> = Feature::ALL.into_iter().filter(|f| f.inverted()).collect();
        assert_eq!(inverted, vec![Feature::ResponseTime]);
    }

    #[test]
    fn get_and_set_cover_every_feature() {
        let v = FeatureVector::from_fn(|f| Feature::ALL.iter().position(|x| *x == f).unwrap() as f64);
        assert_eq!(v.avg_response_time, 0.0);
        assert_eq!(v.dialogue_continuity, 6.0);
        assert_eq!(v.get(Feature::ReplyCount), 5.0);
    }

    #[test]
    fn weighted_sum_of_all_ones_is_one() {
        let w = ScoringWeights::default();
        assert!((w.weighted_sum(&FeatureVector::splat(1.0)) - 1.0).abs() < 1e-12);
        assert_eq!(w.weighted_sum(&FeatureVector::splat(0.0)), 0.0);
    }

    #[test]
    fn rejects_weights_not_summing_to_one() {
        let err = ScoringWeights::new(FeatureVector::splat(0.5)).unwrap_err();
        assert!(matches!(err, ComputeError::InvalidWeights(_)));
    }

    #[test]
    fn weights_from_ordered_values() {
        let w = ScoringWeights::from_values(&[0.4, 0.0, 0.0, 0.0, 0.0, 0.6, 0.0]).unwrap();
        assert_eq!(w.weight(Feature::ResponseTime), 0.4);
        assert_eq!(w.weight(Feature::ReplyCount), 0.6);

        assert!(matches!(
            ScoringWeights::from_values(&[1.0]),
            Err(ComputeError::InvalidWeights(_))
        ));
    }

    #[test]
    fn rejects_negative_weight() {
        let mut v = FeatureVector::from_fn(Feature::default_weight);
        v.reciprocity = -0.1;
        v.message_length = 0.3;
        assert!(ScoringWeights::new(v).is_err());
    }

    #[test]
    fn non_finite_detection() {
        let mut v = FeatureVector::splat(1.0);
        assert!(v.first_non_finite().is_none());
        v.chat_frequency = f64::NAN;
        assert_eq!(v.first_non_finite().map(|(f, _)| f), Some(Feature::ChatFrequency));
    }
}
