//! Scoring pipeline stages.
//!
//! - **Map** ([`extract`]): raw features per pair, run concurrently.
//! - **Barrier**: every pair result is collected before the next stage.
//! - **Reduce** ([`normalize`], [`score`]): rescale each feature across the
//!   full result set, weight, dampen and rank.

pub mod extract;
pub mod features;
pub mod metrics;
pub mod normalize;
pub mod score;
