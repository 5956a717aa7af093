//! Bounded, similarity-indexed memory owned by a single agent.
//!
//! [`VectorMemory`] holds at most `max_insights` [`Insight`]s keyed by
//! their exact text.  Re-learning a statement reinforces it instead of
//! storing it twice; overflowing the capacity evicts the weakest,
//! least-recently-used insight.  Retrieval ranks by cosine similarity
//! against an embedded query and never mutates anything.

pub mod insight;

pub use insight::Insight;

use std::cmp::Reverse;
use std::fmt;
use std::sync::Arc;

use ordered_float::OrderedFloat;
use tracing::{debug, warn};

use crate::embedding::{EmbeddingProvider, checked_similarity};
use crate::error::Result;
use crate::types::Tick;

/// Default per-agent capacity.
pub const DEFAULT_MAX_INSIGHTS: usize = 200;

/// What a call to [`VectorMemory::add_insight`] did.
#[derive(Debug, Clone)]
pub enum AddOutcome {
    /// A new insight was stored.
    Inserted,
    /// The statement was already known; its strength went up.
    Reinforced {
        /// Strength after reinforcement.
        strength: u32,
    },
    /// A new insight was stored and capacity was exceeded, so one entry
    /// was removed.  The removed entry can be the one just inserted.
    Evicted {
        /// The insight that was dropped, as it was at eviction time.
        evicted: Insight,
    },
}

/// One query hit.
#[derive(Debug, Clone, Copy)]
pub struct QueryMatch<'a> {
    /// The matching insight.
    pub insight: &'a Insight,
    /// Cosine similarity between the query and the insight.
    pub similarity: f32,
}

/// Bounded insight store for one agent.
pub struct VectorMemory {
    insights: Vec<Insight>,
    max_insights: usize,
    clock: Tick,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl fmt::Debug for VectorMemory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VectorMemory")
            .field("len", &self.insights.len())
            .field("max_insights", &self.max_insights)
            .field("clock", &self.clock)
            .field("embedder", &self.embedder.model_name())
            .finish()
    }
}

impl VectorMemory {
    /// Create an empty memory holding at most `max_insights` entries.
    ///
    /// A capacity of zero is raised to one.
    #[must_use]
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, max_insights: usize) -> Self {
        Self {
            insights: Vec::new(),
            max_insights: max_insights.max(1),
            clock: 0,
            embedder,
        }
    }

    /// Create an empty memory with [`DEFAULT_MAX_INSIGHTS`].
    #[must_use]
    pub fn with_default_capacity(embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self::new(embedder, DEFAULT_MAX_INSIGHTS)
    }

    fn tick(&mut self) -> Tick {
        self.clock += 1;
        self.clock
    }

    /// Learn `content`, taught by `source`.
    ///
    /// Known content is reinforced without re-embedding.  New content is
    /// embedded and appended; if that pushes the memory over capacity,
    /// exactly one entry with the smallest `(strength, last_used)` is
    /// evicted, earliest-inserted first among equals.
    ///
    /// # Errors
    ///
    /// Returns [`CivilisError::EmbeddingUnavailable`](crate::CivilisError::EmbeddingUnavailable)
    /// if the provider fails; the memory is left unchanged.
    pub fn add_insight(&mut self, content: &str, source: &str) -> Result<AddOutcome> {
        if let Some(idx) = self.insights.iter().position(|i| i.content() == content) {
            let tick = self.tick();
            let insight = &mut self.insights[idx];
            insight.reinforce(tick);
            debug!(content, strength = insight.strength(), "Reinforced insight");
            return Ok(AddOutcome::Reinforced {
                strength: insight.strength(),
            });
        }

        let vector = self.embedder.embed(content)?;
        if vector.dimensions() != self.embedder.dimensions() {
            warn!(
                model = self.embedder.model_name(),
                expected = self.embedder.dimensions(),
                actual = vector.dimensions(),
                "Embedding dimension mismatch"
            );
        }

        let tick = self.tick();
        self.insights.push(Insight::new(content, vector, source, tick));
        debug!(content, source, len = self.insights.len(), "Stored insight");

        if self.insights.len() <= self.max_insights {
            return Ok(AddOutcome::Inserted);
        }

        let weakest = self
            .insights
            .iter()
            .enumerate()
            .min_by_key(|(_, i)| i.eviction_key())
            .map_or(0, |(idx, _)| idx);
        let evicted = self.insights.remove(weakest);
        debug!(
            content = evicted.content(),
            strength = evicted.strength(),
            last_used = evicted.last_used(),
            "Evicted insight"
        );
        Ok(AddOutcome::Evicted { evicted })
    }

    /// Find up to `top_k` insights whose similarity to `text` is at least
    /// `threshold`, most similar first.
    ///
    /// Insights whose similarity is undefined (a zero vector on either
    /// side, or mismatched dimensions) never match, whatever the
    /// threshold.  Ties keep collection order.  An empty result is not an
    /// error.
    ///
    /// # Errors
    ///
    /// Returns [`CivilisError::EmbeddingUnavailable`](crate::CivilisError::EmbeddingUnavailable)
    /// if the query cannot be embedded.
    pub fn query(&self, text: &str, top_k: usize, threshold: f32) -> Result<Vec<QueryMatch<'_>>> {
        let query = self.embedder.embed(text)?;

        let mut scored: Vec<QueryMatch<'_>> = self
            .insights
            .iter()
            .filter_map(|insight| {
                checked_similarity(&query, insight.vector())
                    .map(|similarity| QueryMatch { insight, similarity })
            })
            .filter(|m| m.similarity >= threshold)
            .collect();

        // Stable sort: equal similarities keep insertion order.
        scored.sort_by_key(|m| Reverse(OrderedFloat(m.similarity)));
        scored.truncate(top_k);
        Ok(scored)
    }

    /// Look up an insight by its exact content.
    #[must_use]
    pub fn get(&self, content: &str) -> Option<&Insight> {
        self.insights.iter().find(|i| i.content() == content)
    }

    /// Iterate insights in collection order.
    pub fn iter(&self) -> impl Iterator<Item = &Insight> {
        self.insights.iter()
    }

    /// Number of stored insights.
    #[must_use]
    pub fn len(&self) -> usize {
        self.insights.len()
    }

    /// Whether nothing has been learned (or everything was evicted).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.insights.is_empty()
    }

    /// Maximum number of insights kept.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.max_insights
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
