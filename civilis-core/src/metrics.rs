//! Population-level belief metrics.
//!
//! A sample pools every insight held by every agent into one multiset of
//! contents and reduces it to three numbers:
//!
//! ```text
//! total_insights = |multiset|
//! diversity      = distinct contents / max(total, 1)
//! consensus      = (sum of the 5 largest content frequencies) / max(total, 1)
//! ```
//!
//! Both ratios are in \[0, 1\].  There is no ordering between them.

use std::cmp::Reverse;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// How many of the most frequent contents count toward consensus.
pub const CONSENSUS_TOP_N: usize = 5;

/// Scale for rounding snapshot ratios to 4 decimals.
const SNAPSHOT_PRECISION: f64 = 10_000.0;

/// Immutable record of the population at one sampled round.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoundSnapshot {
    /// 1-based round number.
    pub round: usize,
    /// Insights held across all agents.
    pub total_insights: usize,
    /// Distinct-content fraction, rounded to 4 decimals.
    pub diversity: f64,
    /// Top-5 frequency share, rounded to 4 decimals.
    pub consensus: f64,
}

/// Unrounded metrics over one pooled multiset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PopulationMetrics {
    /// Size of the multiset.
    pub total_insights: usize,
    /// Number of distinct contents.
    pub distinct_insights: usize,
    /// `distinct / max(total, 1)`.
    pub diversity: f64,
    /// `top-5 frequency sum / max(total, 1)`.
    pub consensus: f64,
}

impl PopulationMetrics {
    /// Compute metrics over a multiset of insight contents.
    #[must_use]
    pub fn from_contents<'a, I>(contents: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut frequencies: HashMap<&str, usize> = HashMap::new();
        let mut total = 0_usize;
        for content in contents {
            *frequencies.entry(content).or_default() += 1;
            total += 1;
        }

        let mut counts: Vec<usize> = frequencies.values().copied().collect();
        counts.sort_unstable_by_key(|&c| Reverse(c));
        let top: usize = counts.iter().take(CONSENSUS_TOP_N).sum();

        #[allow(clippy::cast_precision_loss)]
        let denom = total.max(1) as f64;
        #[allow(clippy::cast_precision_loss)]
        let (diversity, consensus) = (frequencies.len() as f64 / denom, top as f64 / denom);

        Self {
            total_insights: total,
            distinct_insights: frequencies.len(),
            diversity,
            consensus,
        }
    }

    /// Freeze into a snapshot for `round`, rounding the ratios.
    #[must_use]
    pub fn snapshot(&self, round: usize) -> RoundSnapshot {
        RoundSnapshot {
            round,
            total_insights: self.total_insights,
            diversity: round4(self.diversity),
            consensus: round4(self.consensus),
        }
    }
}

/// Round to 4 decimal places.
#[must_use]
pub fn round4(value: f64) -> f64 {
    (value * SNAPSHOT_PRECISION).round() / SNAPSHOT_PRECISION
}

/// Sampling interval for a run of `rounds` rounds: `max(1, rounds / 10)`.
#[must_use]
pub fn log_interval(rounds: usize) -> usize {
    (rounds / 10).max(1)
}

/// Whether `round` (1-based) is sampled: the first round and every
/// multiple of [`log_interval`].
#[must_use]
pub fn is_sampled_round(round: usize, rounds: usize) -> bool {
    round == 1 || round % log_interval(rounds) == 0
}
