//! Agents: a memory plus a mastery counter.
//!
//! An agent learns every statement it hears.  When a statement it has
//! just learned closely matches an insight reinforced at least
//! `insight_threshold` times, the agent counts a mastery event.  The check
//! runs on every learn, so repeated exposure to a mastered statement keeps
//! firing events.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::MemoryConfig;
use crate::embedding::EmbeddingProvider;
use crate::error::Result;
use crate::memory::{AddOutcome, VectorMemory};
use crate::types::AgentId;

/// Result of [`Agent::learn`].
#[derive(Debug, Clone)]
pub struct LearnOutcome {
    /// What the memory did with the statement.
    pub added: AddOutcome,
    /// Whether this learn fired a mastery event.
    pub mastered: bool,
}

/// Reply to a delivered message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Acknowledgement {
    /// The agent that received the message.
    pub agent: AgentId,
}

impl fmt::Display for Acknowledgement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] Acknowledged.", self.agent)
    }
}

/// One member of the population.
#[derive(Debug)]
pub struct Agent {
    id: AgentId,
    memory: VectorMemory,
    insights: u32,
    insight_threshold: u32,
    mastery_threshold: f32,
}

impl Agent {
    /// Create an agent with an empty memory sized by `config`.
    #[must_use]
    pub fn new(id: AgentId, embedder: Arc<dyn EmbeddingProvider>, config: &MemoryConfig) -> Self {
        Self {
            id,
            memory: VectorMemory::new(embedder, config.max_insights),
            insights: 0,
            insight_threshold: config.insight_threshold,
            mastery_threshold: config.mastery_threshold,
        }
    }

    /// Store `statement` and check whether it is now mastered.
    ///
    /// # Errors
    ///
    /// Propagates embedding failures from the memory.
    pub fn learn(&mut self, statement: &str, source: &str) -> Result<LearnOutcome> {
        let added = self.memory.add_insight(statement, source)?;

        let strength = self
            .memory
            .query(statement, 1, self.mastery_threshold)?
            .first()
            .map(|m| m.insight.strength())
            .filter(|&s| s >= self.insight_threshold);

        let mastered = strength.is_some();
        if let Some(strength) = strength {
            self.insights += 1;
            info!(agent = %self.id, content = statement, strength, "Insight mastered");
        }

        Ok(LearnOutcome { added, mastered })
    }

    /// Receive `message` from a neighbour and learn it.
    ///
    /// # Errors
    ///
    /// Propagates embedding failures from the memory.
    pub fn interact(&mut self, message: &str) -> Result<Acknowledgement> {
        let source = self.id.to_string();
        self.learn(message, &source)?;
        Ok(Acknowledgement {
            agent: self.id.clone(),
        })
    }

    /// This agent's identifier.
    #[must_use]
    pub fn id(&self) -> &AgentId {
        &self.id
    }

    /// Read access to the agent's memory.
    #[must_use]
    pub fn memory(&self) -> &VectorMemory {
        &self.memory
    }

    /// Number of mastery events fired so far.
    #[must_use]
    pub fn insights(&self) -> u32 {
        self.insights
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::{HashEmbeddingProvider, StubEmbeddingProvider};

    fn agent(id: &str) -> Agent {
        Agent::new(
            AgentId::from(id),
            Arc::new(HashEmbeddingProvider::new(64)),
            &MemoryConfig::default(),
        )
    }

    #[test]
    fn new_agent_has_empty_memory() {
        let agent = agent("A001");
        assert_eq!(agent.id().as_str(), "A001");
        assert!(agent.memory().is_empty());
        assert_eq!(agent.insights(), 0);
    }

    #[test]
    fn learning_stores_statement() {
        let mut agent = agent("A002");
        agent.learn("Fire is dangerous.", "Xun").expect("learn");
        assert_eq!(agent.memory().len(), 1);
        let stored = agent.memory().iter().next().expect("one insight");
        assert_eq!(stored.content(), "Fire is dangerous.");
        assert_eq!(stored.source(), "Xun");
    }

    #[test]
    fn mastery_fires_at_threshold_and_keeps_firing() {
        let mut agent = agent("A003");
        for _ in 0..3 {
            let outcome = agent.learn("Fire is dangerous.", "Xun").expect("learn");
            assert!(!outcome.mastered);
        }
        assert_eq!(agent.insights(), 0);

        let outcome = agent.learn("Fire is dangerous.", "Xun").expect("learn");
        assert!(outcome.mastered);
        assert_eq!(agent.insights(), 1);

        agent.learn("Fire is dangerous.", "Xun").expect("learn");
        agent.learn("Fire is dangerous.", "Xun").expect("learn");
        assert_eq!(agent.insights(), 3);
    }

    #[test]
    fn custom_threshold_respected() {
        let config = MemoryConfig {
            insight_threshold: 2,
            ..MemoryConfig::default()
        };
        let mut agent = Agent::new(
            AgentId::from("A004"),
            Arc::new(HashEmbeddingProvider::new(64)),
            &config,
        );
        agent.learn("Water is essential for life.", "s").expect("learn");
        assert_eq!(agent.insights(), 0);
        agent.learn("Water is essential for life.", "s").expect("learn");
        assert_eq!(agent.insights(), 1);
    }

    #[test]
    fn zero_vectors_never_master() {
        let mut agent = Agent::new(
            AgentId::from("A005"),
            Arc::new(StubEmbeddingProvider::new(8)),
            &MemoryConfig::default(),
        );
        for _ in 0..10 {
            agent.learn("Fire is dangerous.", "s").expect("learn");
        }
        assert_eq!(agent.insights(), 0);
        assert_eq!(agent.memory().get("Fire is dangerous.").map(|i| i.strength()), Some(10));
    }

    #[test]
    fn zero_vectors_never_master_at_negative_threshold() {
        let config = MemoryConfig {
            mastery_threshold: -1.0,
            ..MemoryConfig::default()
        };
        let mut agent = Agent::new(
            AgentId::from("A007"),
            Arc::new(StubEmbeddingProvider::new(8)),
            &config,
        );
        for _ in 0..6 {
            let outcome = agent.learn("Fire is dangerous.", "s").expect("learn");
            assert!(!outcome.mastered);
        }
        assert_eq!(agent.insights(), 0);
    }

    #[test]
    fn interact_learns_with_own_id_as_source() {
        let mut agent = agent("A006");
        let ack = agent.interact("Sharing food builds trust.").expect("interact");
        assert_eq!(ack.agent.as_str(), "A006");
        assert_eq!(ack.to_string(), "[A006] Acknowledged.");
        let stored = agent.memory().get("Sharing food builds trust.").expect("stored");
        assert_eq!(stored.source(), "A006");
    }
}
