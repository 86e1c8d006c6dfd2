//! Cross-pair feature normalization.
//!
//! Run-relative scaling needs every pair's raw features before any value can
//! be rescaled, so this stage only starts once the fan-out has finished.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ComputeError;

use super::features::{Feature, FeatureVector, DEFAULT_RESPONSE_SECS};

/// How raw features are mapped onto `[0, 1]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NormalizationMode {
    /// Min-max scaling across the pairs of this run. Only comparable within
    /// one run.
    #[default]
    #[serde(rename = "relative")]
    RunRelative,
    /// Fixed reference scales, comparable across runs and participant subsets.
    Absolute,
}

impl FromStr for NormalizationMode {
    type Err = ComputeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "relative" | "run-relative" | "run_relative" => Ok(Self::RunRelative),
            "absolute" => Ok(Self::Absolute),
            other => Err(ComputeError::UnknownNormalization(other.to_string())),
        }
    }
}

impl fmt::Display for NormalizationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RunRelative => f.write_str("relative"),
            Self::Absolute => f.write_str("absolute"),
        }
    }
}

/// Per-feature min and max observed across a run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureBounds {
    pub min: FeatureVector,
    pub max: FeatureVector,
}

impl FeatureBounds {
    /// Returns `None` for an empty input.
    pub fn observe<'a>(raw: impl IntoIterator<Item = &'a FeatureVector>) -> Option<Self> {
        let mut iter = raw.into_iter();
        let first = *iter.next()?;
        let mut bounds = Self { min: first, max: first };
        for v in iter {
            for f in Feature::ALL {
                let value = v.get(f);
                if value < bounds.min.get(f) {
                    bounds.min.set(f, value);
                }
                if value > bounds.max.get(f) {
                    bounds.max.set(f, value);
                }
            }
        }
        Some(bounds)
    }

    /// Scale one raw value of `feature` into `[0, 1]`.
    ///
    /// Zero variance maps every pair to 1.0 when the shared value is non-zero
    /// and to 0.0 otherwise.
    pub fn scale(&self, feature: Feature, value: f64) -> f64 {
        let (min, max) = (self.min.get(feature), self.max.get(feature));
        if max == min {
            return if min != 0.0 { 1.0 } else { 0.0 };
        }
        let scaled = ((value - min) / (max - min)).clamp(0.0, 1.0);
        if feature.inverted() {
            1.0 - scaled
        } else {
            scaled
        }
    }

    pub fn apply(&self, raw: &FeatureVector) -> FeatureVector {
        FeatureVector::from_fn(|f| self.scale(f, raw.get(f)))
    }
}

/// Map one raw feature onto its fixed reference scale.
pub fn absolute_scale(feature: Feature, value: f64) -> f64 {
    let scaled = match feature {
        Feature::ResponseTime => (1.0 - value / DEFAULT_RESPONSE_SECS).max(0.0),
        Feature::ChatFrequency => value / 0.5,
        Feature::InteractionContinuity => value / 1.0,
        Feature::Reciprocity => value,
        Feature::MessageLength => {
            // Gaussian preference around 50 characters.
            let z = (value - 50.0) / 30.0;
            (-z * z).exp()
        }
        Feature::ReplyCount => value / 5.0,
        Feature::DialogueContinuity => value / 0.5,
    };
    scaled.clamp(0.0, 1.0)
}

/// Normalize the raw features of every pair of a run, preserving input order.
pub fn normalize_all(mode: NormalizationMode, raw: &[FeatureVector]) -> Vec<FeatureVector> {
    match mode {
        NormalizationMode::RunRelative => match FeatureBounds::observe(raw) {
            Some(bounds) => raw.iter().map(|v| bounds.apply(v)).collect(),
            None => Vec::new(),
        },
        NormalizationMode::Absolute => raw
            .iter()
            .map(|v| FeatureVector::from_fn(|f| absolute_scale(f, v.get(f))))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vector(response: f64, length: f64) -> FeatureVector {
        FeatureVector {
            avg_response_time: response,
            chat_frequency: response / 10.0,
            interaction_continuity: 1.0,
            reciprocity: 0.0,
            message_length: length,
            reply_count: response,
            dialogue_continuity: 0.5,
        }
    }

    #[test]
    fn response_time_is_inverted() {
        let raw = vec![vector(10.0, 5.0), vector(110.0, 5.0), vector(60.0, 5.0)];
        let norm = normalize_all(NormalizationMode::RunRelative, &raw);

        assert_eq!(norm[0].avg_response_time, 1.0);
        assert_eq!(norm[1].avg_response_time, 0.0);
        assert!((norm[2].avg_response_time - 0.5).abs() < 1e-12);

        assert_eq!(norm[0].reply_count, 0.0);
        assert_eq!(norm[1].reply_count, 1.0);
    }

    #[test]
    fn zero_variance_uses_fixed_fallback() {
        let raw = vec![vector(10.0, 42.0), vector(20.0, 42.0)];
        let norm = normalize_all(NormalizationMode::RunRelative, &raw);

        // non-zero shared value
        assert!(norm.iter().all(|v| v.message_length == 1.0));
        assert!(norm.iter().all(|v| v.interaction_continuity == 1.0));
        // zero shared value
        assert!(norm.iter().all(|v| v.reciprocity == 0.0));
    }

    #[test]
    fn single_pair_is_all_fallback() {
        let norm = normalize_all(NormalizationMode::RunRelative, &[vector(300.0, 3.0)]);
        assert_eq!(norm[0].avg_response_time, 1.0);
        assert_eq!(norm[0].reciprocity, 0.0);
    }

    #[test]
    fn normalized_values_stay_in_unit_interval() {
        let raw: Vec<FeatureVector> = (0..20)
            .map(|i| vector(i as f64 * 13.7, (i % 7) as f64 * 3.1))
            .collect();
        for v in normalize_all(NormalizationMode::RunRelative, &raw) {
            for f in Feature::ALL {
                let value = v.get(f);
                assert!((0.0..=1.0).contains(&value), "{} = {}", f, value);
            }
        }
    }

    #[test]
    fn rerunning_on_same_raw_values_is_stable() {
        let raw = vec![vector(10.0, 5.0), vector(110.0, 9.0), vector(60.0, 1.0)];
        let first = normalize_all(NormalizationMode::RunRelative, &raw);
        let second = normalize_all(NormalizationMode::RunRelative, &raw);
        assert_eq!(first, second);
    }

    #[test]
    fn empty_input_normalizes_to_nothing() {
        assert!(normalize_all(NormalizationMode::RunRelative, &[]).is_empty());
        assert!(FeatureBounds::observe(&[]).is_none());
    }

    #[test]
    fn absolute_scales() {
        assert_eq!(absolute_scale(Feature::ResponseTime, 600.0), 0.0);
        assert!((absolute_scale(Feature::ResponseTime, 150.0) - 0.5).abs() < 1e-12);
        assert_eq!(absolute_scale(Feature::ChatFrequency, 3.0), 1.0);
        assert_eq!(absolute_scale(Feature::MessageLength, 50.0), 1.0);
        assert!(absolute_scale(Feature::MessageLength, 200.0) < 0.01);
        assert!((absolute_scale(Feature::ReplyCount, 2.0) - 0.4).abs() < 1e-12);
    }

    #[test]
    fn absolute_mode_ignores_other_pairs() {
        let alone = normalize_all(NormalizationMode::Absolute, &[vector(30.0, 40.0)]);
        let crowd = normalize_all(
            NormalizationMode::Absolute,
            &[vector(30.0, 40.0), vector(1.0, 400.0)],
        );
        assert_eq!(alone[0], crowd[0]);
    }

    #[test]
    fn parses_mode_names() {
        assert_eq!("relative".parse::<NormalizationMode>().unwrap(), NormalizationMode::RunRelative);
        assert_eq!(" Absolute ".parse::<NormalizationMode>().unwrap(), NormalizationMode::Absolute);
        assert!("zscore".parse::<NormalizationMode>().is_err());
        assert_eq!(NormalizationMode::default().to_string(), "relative");
    }
}
