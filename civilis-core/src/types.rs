//! Core type definitions shared across the diffusion engine.

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Identity Types
// ---------------------------------------------------------------------------

/// Minimum number of digits in an agent identifier (`A000`).
const AGENT_ID_MIN_DIGITS: usize = 3;

/// Identifier of one agent in the population, e.g. `A007`.
///
/// Identifiers are zero-padded to a common width so that their lexical
/// order matches their numeric order for any population size.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AgentId(pub String);

impl AgentId {
    /// Identifier for the `index`-th agent of a population of `population` agents.
    #[must_use]
    pub fn from_index(index: usize, population: usize) -> Self {
        let largest = population.saturating_sub(1).max(index);
        let width = largest.to_string().len().max(AGENT_ID_MIN_DIGITS);
        Self(format!("A{index:0width$}"))
    }

    /// The identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AgentId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

// ---------------------------------------------------------------------------
// Embedding Vector
// ---------------------------------------------------------------------------

/// A dense vector embedding of an insight's text.
/// Typically 384 dimensions (all-MiniLM-L6-v2).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Embedding(pub Vec<f32>);

impl Embedding {
    /// Number of components.
    #[must_use]
    pub fn dimensions(&self) -> usize {
        self.0.len()
    }

    /// Euclidean (L2) norm.
    #[must_use]
    pub fn norm(&self) -> f32 {
        self.0.iter().map(|x| x * x).sum::<f32>().sqrt()
    }
}

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

/// Logical timestamp inside one memory. Strictly increases on every
/// insertion or reinforcement, so no two insights ever share one.
pub type Tick = u64;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn agent_ids_are_padded_to_three_digits() {
        assert_eq!(AgentId::from_index(0, 20).as_str(), "A000");
        assert_eq!(AgentId::from_index(7, 20).as_str(), "A007");
        assert_eq!(AgentId::from_index(999, 1000).as_str(), "A999");
    }

    #[test]
    fn agent_ids_widen_for_large_populations() {
        assert_eq!(AgentId::from_index(0, 1001).as_str(), "A0000");
        assert_eq!(AgentId::from_index(1000, 1001).as_str(), "A1000");
    }

    #[test]
    fn agent_id_order_matches_index_order() {
        let ids: Vec<_> = (0..1500).map(|i| AgentId::from_index(i, 1500)).collect();
        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(ids, sorted);
    }

    #[test]
    fn embedding_norm() {
        let e = Embedding(vec![3.0, 4.0]);
        assert!((e.norm() - 5.0).abs() < 1e-6);
        assert_eq!(e.dimensions(), 2);
    }
}
