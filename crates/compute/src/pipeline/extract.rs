//! Per-pair feature extraction.
//!
//! Pure function of a [`PairKey`] and the shared [`EventStore`]: no side
//! effects, safe to call concurrently for different pairs.

use chrono::{DateTime, Utc};
use rapport_core::{ChatEvent, EventStore};
use serde::{Deserialize, Serialize};

use crate::error::PairError;
use crate::pairs::PairKey;

use super::features::{FeatureVector, CONTINUITY_GAP_SECS, DEFAULT_RESPONSE_SECS};

/// Raw features of one pair plus the aggregates reporting needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairRawMetrics {
    /// Every alternation delta in seconds, in stream order.
    pub response_times: Vec<f64>,
    pub avg_response_time: f64,
    pub reply_count: usize,
    pub chat_frequency: f64,
    pub interaction_continuity: f64,
    pub reciprocity: f64,
    pub message_length: f64,
    pub dialogue_continuity: f64,
    pub count_a: usize,
    pub count_b: usize,
    /// Mean delay of `b` answering `a`.
    pub resp_time_a_to_b: f64,
    /// Mean delay of `a` answering `b`.
    pub resp_time_b_to_a: f64,
    pub avg_len_a: f64,
    pub avg_len_b: f64,
}

impl PairRawMetrics {
    pub fn features(&self) -> FeatureVector {
        FeatureVector {
            avg_response_time: self.avg_response_time,
            chat_frequency: self.chat_frequency,
            interaction_continuity: self.interaction_continuity,
            reciprocity: self.reciprocity,
            message_length: self.message_length,
            reply_count: self.reply_count as f64,
            dialogue_continuity: self.dialogue_continuity,
        }
    }

    pub fn total_messages(&self) -> usize {
        self.count_a + self.count_b
    }
}

/// Running state of the single pass over a pair's merged stream.
#[derive(Default)]
struct TurnScan {
    response_times: Vec<f64>,
    a_to_b: Vec<f64>,
    b_to_a: Vec<f64>,
    /// Quick replies by `b` to `a`.
    quick_a_to_b: usize,
    /// Quick replies by `a` to `b`.
    quick_b_to_a: usize,
    chains: Vec<usize>,
}

/// Compute the raw features of one pair.
///
/// Returns `Ok(None)` when either participant has no messages; such a pair is
/// excluded from the result table.
pub fn extract_pair(store: &EventStore, pair: &PairKey) -> Result<Option<PairRawMetrics>, PairError> {
    let (a, b) = (pair.a(), pair.b());
    let count_a = store.count_of(a);
    let count_b = store.count_of(b);
    if count_a == 0 || count_b == 0 {
        return Ok(None);
    }

    let merged = store.merged(a, b);
    let scan = scan_turns(&merged, a, b)?;

    let avg_response_time = mean_or(&scan.response_times, DEFAULT_RESPONSE_SECS);
    let resp_time_a_to_b = mean_or(&scan.a_to_b, DEFAULT_RESPONSE_SECS);
    let resp_time_b_to_a = mean_or(&scan.b_to_a, DEFAULT_RESPONSE_SECS);

    let chat_frequency = chat_frequency(&merged);

    let interaction_continuity = if scan.chains.is_empty() {
        0.0
    } else {
        scan.chains.iter().sum::<usize>() as f64 / scan.chains.len() as f64
    };

    let reciprocity = if count_a > 0 && count_b > 0 {
        count_a.min(count_b) as f64 / count_a.max(count_b) as f64
    } else {
        0.0
    };

    let avg_len_a = average_length(store.events_of(a), count_a);
    let avg_len_b = average_length(store.events_of(b), count_b);
    let message_length = (avg_len_a + avg_len_b) / 2.0;

    let ratio_a = ratio(scan.quick_a_to_b, count_a);
    let ratio_b = ratio(scan.quick_b_to_a, count_b);
    let dialogue_continuity = (ratio_a + ratio_b) / 2.0;

    let metrics = PairRawMetrics {
        reply_count: scan.response_times.len(),
        response_times: scan.response_times,
        avg_response_time,
        chat_frequency,
        interaction_continuity,
        reciprocity,
        message_length,
        dialogue_continuity,
        count_a,
        count_b,
        resp_time_a_to_b,
        resp_time_b_to_a,
        avg_len_a,
        avg_len_b,
    };

    if let Some((feature, value)) = metrics.features().first_non_finite() {
        return Err(PairError::NonFinite {
            feature: feature.name(),
            value,
        });
    }

    Ok(Some(metrics))
}

/// Single pass collecting alternations, directional deltas, quick replies
/// and continuity chains.
fn scan_turns(merged: &[&ChatEvent], a: &str, b: &str) -> Result<TurnScan, PairError> {
    let mut scan = TurnScan::default();
    let mut chain = 1usize;

    for window in merged.windows(2) {
        let (prev, next) = (window[0], window[1]);
        let dt = seconds_between(prev.timestamp, next.timestamp)?;
        let alternated = prev.sender_id != next.sender_id;

        if alternated {
            scan.response_times.push(dt);
            let quick = dt <= CONTINUITY_GAP_SECS;
            if prev.sender_id == a && next.sender_id == b {
                scan.a_to_b.push(dt);
                if quick {
                    scan.quick_a_to_b += 1;
                }
            } else if prev.sender_id == b && next.sender_id == a {
                scan.b_to_a.push(dt);
                if quick {
                    scan.quick_b_to_a += 1;
                }
            }
        }

        if alternated && dt <= CONTINUITY_GAP_SECS {
            chain += 1;
        } else {
            scan.chains.push(chain);
            chain = 1;
        }
    }
    if !merged.is_empty() {
        scan.chains.push(chain);
    }

    Ok(scan)
}

/// Messages per day over the pair's active span (whole days, minimum one).
fn chat_frequency(merged: &[&ChatEvent]) -> f64 {
    let (Some(first), Some(last)) = (merged.first(), merged.last()) else {
        return 0.0;
    };
    let total = merged.len() as f64;
    let duration_days = (last.timestamp - first.timestamp).num_days() + 1;
    if duration_days > 0 {
        total / duration_days as f64
    } else {
        total
    }
}

fn seconds_between(from: DateTime<Utc>, to: DateTime<Utc>) -> Result<f64, PairError> {
    (to - from)
        .num_microseconds()
        .map(|us| us as f64 / 1_000_000.0)
        .ok_or_else(|| PairError::TimestampOverflow {
            from: from.to_string(),
            to: to.to_string(),
        })
}

fn mean_or(samples: &[f64], default: f64) -> f64 {
    if samples.is_empty() {
        default
    } else {
        samples.iter().sum::<f64>() / samples.len() as f64
    }
}

fn average_length<'a>(events: impl Iterator<Item = &'a ChatEvent>, count: usize) -> f64 {
    if count == 0 {
        return 0.0;
    }
    events.map(|e| e.content_len()).sum::<usize>() as f64 / count as f64
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}
