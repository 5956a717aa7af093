//! Insight: one piece of knowledge held by one agent.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{Embedding, Tick};

/// A unique statement in an agent's memory, with its reinforcement history.
///
/// The vector is computed once at creation and never changes; `strength`
/// only ever grows.  Mutation goes through [`VectorMemory`](super::VectorMemory).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Insight {
    content: String,
    vector: Embedding,
    strength: u32,
    last_used: Tick,
    source: String,
    created_at: DateTime<Utc>,
}

impl Insight {
    pub(crate) fn new(
        content: impl Into<String>,
        vector: Embedding,
        source: impl Into<String>,
        tick: Tick,
    ) -> Self {
        Self {
            content: content.into(),
            vector,
            strength: 1,
            last_used: tick,
            source: source.into(),
            created_at: Utc::now(),
        }
    }

    /// Count one more exposure to the same statement.
    pub(crate) fn reinforce(&mut self, tick: Tick) {
        self.strength = self.strength.saturating_add(1);
        self.last_used = tick;
    }

    /// The statement itself; unique within one memory.
    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Embedding of [`content`](Self::content).
    #[must_use]
    pub fn vector(&self) -> &Embedding {
        &self.vector
    }

    /// Times this statement has been learned (≥ 1).
    #[must_use]
    pub fn strength(&self) -> u32 {
        self.strength
    }

    /// Logical time of the latest insertion or reinforcement.
    #[must_use]
    pub fn last_used(&self) -> Tick {
        self.last_used
    }

    /// Who first taught this insight.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Wall-clock creation time.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Eviction priority. **Lower** keys are evicted first.
    #[must_use]
    pub fn eviction_key(&self) -> (u32, Tick) {
        (self.strength, self.last_used)
    }
}
