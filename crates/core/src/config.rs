use std::env;

use serde::{Deserialize, Serialize};

use crate::error::{RapportError, RapportResult};

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_or(profile: &str, key: &str, default: &str) -> String {
    profiled_env_opt(profile, key).unwrap_or_else(|| default.to_string())
}

fn profiled_env_parse<T: std::str::FromStr>(profile: &str, key: &str, default: T) -> T
where
    T::Err: std::fmt::Display,
{
    match profiled_env_opt(profile, key) {
        Some(raw) => match raw.parse() {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!("Invalid value '{}' for {}: {}. Using default.", raw, key, e);
                default
            }
        },
        None => default,
    }
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub analysis: AnalysisConfig,
    pub ingest: IngestConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `RAPPORT_PROFILE`. When set (e.g. `WORK`), every
    /// key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = env_or("RAPPORT_PROFILE", "").to_uppercase();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        Self {
            profile: p.to_string(),
            analysis: AnalysisConfig::from_env_profiled(p),
            ingest: IngestConfig::from_env_profiled(p),
        }
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Print a summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!(
            "  analysis:  worker_threads={}, activity_baseline={}, normalization={}, weights={}",
            self.analysis.resolved_worker_threads(),
            self.analysis.activity_baseline,
            self.analysis.normalization,
            self.analysis.weights.as_deref().unwrap_or("default")
        );
        tracing::info!(
            "  ingest:    excluded_senders=[{}]",
            self.ingest.excluded_senders.join(", ")
        );
    }
}

// ── Analysis ──────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Number of worker threads. 0 = available parallelism.
    pub worker_threads: usize,
    /// Event count at which the activity factor reaches 1.0.
    pub activity_baseline: u32,
    /// "relative" or "absolute".
    pub normalization: String,
    /// Comma list of the seven feature weights, in column order. None = defaults.
    pub weights: Option<String>,
}

impl AnalysisConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            worker_threads: profiled_env_parse(p, "RAPPORT_WORKER_THREADS", 0),
            activity_baseline: profiled_env_parse(p, "RAPPORT_ACTIVITY_BASELINE", 1000),
            normalization: profiled_env_or(p, "RAPPORT_NORMALIZATION", "relative").to_lowercase(),
            weights: profiled_env_opt(p, "RAPPORT_WEIGHTS"),
        }
    }

    /// Parse `weights` into numbers. Errors on a non-numeric entry; the count
    /// and sum are checked by the scorer.
    pub fn weight_values(&self) -> RapportResult<Option<Vec<f64>>> {
        let Some(raw) = self.weights.as_deref() else {
            return Ok(None);
        };
        raw.split(',')
            .map(|part| {
                part.trim().parse::<f64>().map_err(|_| RapportError::InvalidConfig {
                    key: "RAPPORT_WEIGHTS".to_string(),
                    value: raw.to_string(),
                })
            })
            .collect::<RapportResult<Vec<f64>>>()
            .map(Some)
    }

    /// Resolve worker thread count (0 means use available parallelism).
    pub fn resolved_worker_threads(&self) -> usize {
        resolve_worker_threads(self.worker_threads)
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            worker_threads: 0,
            activity_baseline: 1000,
            normalization: "relative".to_string(),
            weights: None,
        }
    }
}

/// Map a requested thread count to a concrete one; 0 means available parallelism.
pub fn resolve_worker_threads(requested: usize) -> usize {
    if requested == 0 {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4)
    } else {
        requested
    }
}

// ── Ingest ────────────────────────────────────────────────────

/// System accounts whose messages never describe a human relationship.
pub const DEFAULT_EXCLUDED_SENDERS: &[&str] = &["2854196310", "10000"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    pub excluded_senders: Vec<String>,
}

impl IngestConfig {
    fn from_env_profiled(p: &str) -> Self {
        let excluded_senders = match profiled_env_opt(p, "RAPPORT_EXCLUDED_SENDERS") {
            Some(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            None => default_excluded_senders(),
        };
        Self { excluded_senders }
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            excluded_senders: default_excluded_senders(),
        }
    }
}

fn default_excluded_senders() -> Vec<String> {
    DEFAULT_EXCLUDED_SENDERS.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    // Each test uses its own profile prefix so parallel tests never share keys.

    #[test]
    fn defaults_without_env() {
        let config = Config::for_profile("RAPPORT_TEST_EMPTY_PROFILE");
        assert_eq!(config.analysis.activity_baseline, 1000);
        assert_eq!(config.analysis.normalization, "relative");
        assert_eq!(config.ingest.excluded_senders, vec!["2854196310", "10000"]);
    }

    #[test]
    fn profiled_keys_take_precedence() {
        env::set_var("RAPTESTA_RAPPORT_ACTIVITY_BASELINE", "250");
        env::set_var("RAPTESTA_RAPPORT_NORMALIZATION", "Absolute");
        env::set_var("RAPTESTA_RAPPORT_EXCLUDED_SENDERS", " 1, ,2 ");

        let config = Config::for_profile("raptesta");
        assert_eq!(config.profile_label(), "RAPTESTA");
        assert_eq!(config.analysis.activity_baseline, 250);
        assert_eq!(config.analysis.normalization, "absolute");
        assert_eq!(config.ingest.excluded_senders, vec!["1", "2"]);
    }

    #[test]
    fn invalid_number_falls_back_to_default() {
        env::set_var("RAPTESTB_RAPPORT_WORKER_THREADS", "many");
        let config = Config::for_profile("RAPTESTB");
        assert_eq!(config.analysis.worker_threads, 0);
        assert!(config.analysis.resolved_worker_threads() >= 1);
    }

    #[test]
    fn weights_parse_strictly() {
        let config = AnalysisConfig {
            weights: Some("0.5, 0.5".to_string()),
            ..AnalysisConfig::default()
        };
        assert_eq!(config.weight_values().unwrap(), Some(vec![0.5, 0.5]));
        assert_eq!(AnalysisConfig::default().weight_values().unwrap(), None);

        let bad = AnalysisConfig {
            weights: Some("0.5,heavy".to_string()),
            ..AnalysisConfig::default()
        };
        assert!(matches!(
            bad.weight_values(),
            Err(RapportError::InvalidConfig { key, .. }) if key == "RAPPORT_WEIGHTS"
        ));
    }

    #[test]
    fn explicit_thread_count_is_kept() {
        assert_eq!(resolve_worker_threads(3), 3);
    }
}
