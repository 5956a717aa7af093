//! Round-based knowledge diffusion over a social network.
//!
//! ```text
//! Unstarted ──run()──▶ Running ──last round──▶ Completed
//!                         │
//!                         └──error──▶ Failed
//! ```
//!
//! Construction validates the configuration, builds the network, creates
//! one agent per node and seeds every agent with the common knowledge.
//! Each round then:
//!
//! 1. samples `max(1, round_half_even(fraction × N))` distinct speakers;
//! 2. for each speaker in sample order, picks a random neighbour as
//!    listener and a random statement from common knowledge plus the
//!    exploratory statement, and delivers it;
//! 3. on round 1 and every multiple of `max(1, rounds / 10)`, appends a
//!    [`RoundSnapshot`] of the population metrics.
//!
//! Every random draw comes from one seeded stream owned by the
//! simulation, so a seed fixes the whole history.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace};

use crate::agent::Agent;
use crate::config::{CivilisConfig, SimulationConfig};
use crate::embedding::EmbeddingProvider;
use crate::error::{CivilisError, Result};
use crate::memory::Insight;
use crate::metrics::{PopulationMetrics, RoundSnapshot, is_sampled_round};
use crate::network::SocialNetwork;
use crate::types::AgentId;

/// Source recorded on the common knowledge every agent starts with.
pub const SEED_SOURCE: &str = "seed-source";

/// Lifecycle of one simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SimulationState {
    /// Built and seeded, no round run yet.
    Unstarted,
    /// Inside [`DiffusionSimulation::run`].
    Running,
    /// Every round finished.
    Completed,
    /// A round failed; the run cannot be resumed.
    Failed,
}

impl SimulationState {
    /// Lower-case name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unstarted => "unstarted",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for SimulationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Totals for a finished (or partially run) simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Population size.
    pub agents_count: usize,
    /// Rounds that ran to completion.
    pub rounds_completed: usize,
    /// Mastery events across all agents.
    pub total_mastery_events: u64,
    /// Number of snapshots recorded.
    pub history_length: usize,
}

/// Number of speakers per round: `max(1, round_half_even(fraction × N))`,
/// capped at `N`.
#[must_use]
pub fn speaker_count(num_agents: usize, fraction: f64) -> usize {
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    let raw = (fraction * num_agents as f64).round_ties_even().max(0.0) as usize;
    raw.max(1).min(num_agents)
}

/// The diffusion engine.
#[derive(Debug)]
pub struct DiffusionSimulation {
    config: SimulationConfig,
    seed: u64,
    network: SocialNetwork,
    agents: Vec<Agent>,
    index: HashMap<AgentId, usize>,
    messages: Vec<String>,
    rng: ChaCha8Rng,
    history: Vec<RoundSnapshot>,
    state: SimulationState,
    rounds_completed: usize,
}

impl DiffusionSimulation {
    /// Validate `config`, build the network and population, and seed
    /// every agent with the common knowledge.
    ///
    /// When `config.simulation.seed` is `None` a seed is drawn from the
    /// thread RNG and logged; read it back with [`seed`](Self::seed).
    ///
    /// # Errors
    ///
    /// Returns [`CivilisError::InvalidConfiguration`] before touching the
    /// embedder or building anything, or propagates embedding failures
    /// raised while seeding.
    pub fn new(config: &CivilisConfig, embedder: Arc<dyn EmbeddingProvider>) -> Result<Self> {
        config.validate()?;

        let sim = &config.simulation;
        let seed = sim.seed.unwrap_or_else(|| rand::thread_rng().r#gen());
        let network = SocialNetwork::build(sim.num_agents, sim.network_type, seed)?;

        let mut agents: Vec<Agent> = network
            .agent_ids()
            .into_iter()
            .map(|id| Agent::new(id, Arc::clone(&embedder), &config.memory))
            .collect();
        for agent in &mut agents {
            for statement in &config.knowledge.common {
                agent.learn(statement, SEED_SOURCE)?;
            }
        }

        let index = agents
            .iter()
            .enumerate()
            .map(|(i, a)| (a.id().clone(), i))
            .collect();

        info!(
            agents = agents.len(),
            rounds = sim.rounds,
            topology = %sim.network_type,
            edges = network.edge_count(),
            seed,
            embedder = embedder.model_name(),
            "Diffusion simulation initialized"
        );

        Ok(Self {
            config: sim.clone(),
            seed,
            network,
            agents,
            index,
            messages: config.knowledge.message_pool(),
            rng: ChaCha8Rng::seed_from_u64(seed),
            history: Vec::new(),
            state: SimulationState::Unstarted,
            rounds_completed: 0,
        })
    }

    /// Run every round and return the recorded history.
    ///
    /// # Errors
    ///
    /// Returns [`CivilisError::InvalidState`] unless the simulation is
    /// [`Unstarted`](SimulationState::Unstarted).  Any error inside a round
    /// moves the simulation to [`Failed`](SimulationState::Failed) and is
    /// returned as is.
    pub fn run(&mut self) -> Result<Vec<RoundSnapshot>> {
        if self.state != SimulationState::Unstarted {
            return Err(CivilisError::InvalidState {
                expected: SimulationState::Unstarted.as_str(),
                actual: self.state.as_str(),
            });
        }
        self.state = SimulationState::Running;

        let rounds = self.config.rounds;
        for round in 1..=rounds {
            if let Err(e) = self.run_round(round) {
                self.state = SimulationState::Failed;
                return Err(e);
            }
            self.rounds_completed = round;

            if is_sampled_round(round, rounds) {
                let snapshot = self.population_metrics().snapshot(round);
                debug!(
                    round,
                    total_insights = snapshot.total_insights,
                    diversity = snapshot.diversity,
                    consensus = snapshot.consensus,
                    "Sampled population"
                );
                self.history.push(snapshot);
            }
        }

        self.state = SimulationState::Completed;
        let summary = self.summary();
        info!(
            rounds = summary.rounds_completed,
            snapshots = summary.history_length,
            mastery_events = summary.total_mastery_events,
            "Diffusion simulation completed"
        );
        Ok(self.history.clone())
    }

    fn run_round(&mut self, round: usize) -> Result<()> {
        let n = self.agents.len();
        let speakers = rand::seq::index::sample(
            &mut self.rng,
            n,
            speaker_count(n, self.config.speaker_fraction),
        );

        for speaker in speakers.iter() {
            let speaker_id = self.agents[speaker].id().clone();
            let neighbors = self.network.neighbors(&speaker_id)?;
            if neighbors.is_empty() {
                trace!(round, speaker = %speaker_id, "Speaker has no neighbors");
                continue;
            }

            let listener_id = neighbors
                .choose(&mut self.rng)
                .ok_or_else(|| CivilisError::AgentNotFound(speaker_id.clone()))?;
            let message = self.messages.choose(&mut self.rng).ok_or_else(|| {
                CivilisError::InvalidConfiguration("no messages to exchange".to_string())
            })?;
            let listener = *self
                .index
                .get(listener_id)
                .ok_or_else(|| CivilisError::AgentNotFound(listener_id.clone()))?;

            let ack = self.agents[listener].interact(message)?;
            trace!(
                round,
                speaker = %speaker_id,
                listener = %ack.agent,
                message = message.as_str(),
                "Delivered message"
            );
        }
        Ok(())
    }

    /// Metrics over every insight currently held by every agent.
    #[must_use]
    pub fn population_metrics(&self) -> PopulationMetrics {
        PopulationMetrics::from_contents(
            self.agents
                .iter()
                .flat_map(|a| a.memory().iter().map(Insight::content)),
        )
    }

    /// Mastery counter of the `index`-th agent, or 0 if out of range.
    #[must_use]
    pub fn agent_insights(&self, index: usize) -> u32 {
        self.agents.get(index).map_or(0, Agent::insights)
    }

    /// Look up an agent by identifier.
    #[must_use]
    pub fn agent(&self, id: &AgentId) -> Option<&Agent> {
        self.index.get(id).map(|&i| &self.agents[i])
    }

    /// All agents in identifier order.
    #[must_use]
    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    /// The network messages travel along.
    #[must_use]
    pub fn network(&self) -> &SocialNetwork {
        &self.network
    }

    /// Snapshots recorded so far.
    #[must_use]
    pub fn history(&self) -> &[RoundSnapshot] {
        &self.history
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> SimulationState {
        self.state
    }

    /// The seed driving the network and every random draw.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Totals so far.
    #[must_use]
    pub fn summary(&self) -> RunSummary {
        RunSummary {
            agents_count: self.agents.len(),
            rounds_completed: self.rounds_completed,
            total_mastery_events: self.agents.iter().map(|a| u64::from(a.insights())).sum(),
            history_length: self.history.len(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::HashEmbeddingProvider;
    use crate::network::NetworkType;

    fn config(num_agents: usize, rounds: usize, seed: u64) -> CivilisConfig {
        CivilisConfig {
            simulation: SimulationConfig::new(num_agents, rounds, seed),
            ..CivilisConfig::default()
        }
    }

    fn embedder() -> Arc<dyn EmbeddingProvider> {
        Arc::new(HashEmbeddingProvider::new(64))
    }

    #[test]
    fn speaker_count_rounds_half_to_even() {
        assert_eq!(speaker_count(1, 0.3), 1);
        assert_eq!(speaker_count(3, 0.3), 1);
        assert_eq!(speaker_count(5, 0.3), 2);
        assert_eq!(speaker_count(10, 0.3), 3);
        assert_eq!(speaker_count(100, 0.3), 30);
        assert_eq!(speaker_count(4, 1.0), 4);
    }

    #[test]
    fn construction_seeds_common_knowledge() {
        let sim = DiffusionSimulation::new(&config(5, 3, 42), embedder()).expect("new");
        assert_eq!(sim.state(), SimulationState::Unstarted);
        assert_eq!(sim.agents().len(), 5);
        for agent in sim.agents() {
            assert_eq!(agent.memory().len(), 3);
            assert!(agent.memory().iter().all(|i| i.source() == SEED_SOURCE));
        }
        assert_eq!(sim.population_metrics().total_insights, 15);
    }

    #[test]
    fn run_samples_every_round_for_short_runs() {
        let mut sim = DiffusionSimulation::new(&config(10, 10, 123), embedder()).expect("new");
        let history = sim.run().expect("run");
        assert_eq!(history.len(), 10);
        assert_eq!(history[0].round, 1);
        assert_eq!(history.last().map(|s| s.round), Some(10));
        assert_eq!(sim.state(), SimulationState::Completed);
    }

    #[test]
    fn run_samples_at_interval() {
        let mut sim = DiffusionSimulation::new(&config(8, 25, 1), embedder()).expect("new");
        let rounds: Vec<usize> = sim.run().expect("run").iter().map(|s| s.round).collect();
        assert_eq!(rounds, vec![1, 2, 4, 6, 8, 10, 12, 14, 16, 18, 20, 22, 24]);
    }

    #[test]
    fn run_twice_is_rejected() {
        let mut sim = DiffusionSimulation::new(&config(5, 2, 7), embedder()).expect("new");
        sim.run().expect("first run");
        assert!(matches!(
            sim.run(),
            Err(CivilisError::InvalidState { actual: "completed", .. })
        ));
    }

    #[test]
    fn single_agent_runs_without_interactions() {
        let mut sim = DiffusionSimulation::new(&config(1, 5, 3), embedder()).expect("new");
        let history = sim.run().expect("run");
        assert!(history.iter().all(|s| s.total_insights == 3));
    }

    #[test]
    fn random_topology_runs() {
        let mut cfg = config(12, 6, 5);
        cfg.simulation.network_type = NetworkType::Random;
        let mut sim = DiffusionSimulation::new(&cfg, embedder()).expect("new");
        assert_eq!(sim.network().edge_count(), 24);
        sim.run().expect("run");
    }

    #[test]
    fn unseeded_simulation_reports_its_seed() {
        let mut cfg = config(4, 2, 0);
        cfg.simulation.seed = None;
        let sim = DiffusionSimulation::new(&cfg, embedder()).expect("new");
        let replay_cfg = config(4, 2, sim.seed());
        let replay = DiffusionSimulation::new(&replay_cfg, embedder()).expect("new");
        assert_eq!(sim.network().edges(), replay.network().edges());
    }

    #[test]
    fn agent_insights_out_of_range_is_zero() {
        let sim = DiffusionSimulation::new(&config(3, 1, 0), embedder()).expect("new");
        assert_eq!(sim.agent_insights(0), 0);
        assert_eq!(sim.agent_insights(99), 0);
    }

    #[test]
    fn summary_tracks_progress() {
        let mut sim = DiffusionSimulation::new(&config(6, 4, 9), embedder()).expect("new");
        assert_eq!(sim.summary().rounds_completed, 0);
        sim.run().expect("run");
        let summary = sim.summary();
        assert_eq!(summary.agents_count, 6);
        assert_eq!(summary.rounds_completed, 4);
        assert_eq!(summary.history_length, sim.history().len());
        let per_agent: u64 = (0..6).map(|i| u64::from(sim.agent_insights(i))).sum();
        assert_eq!(summary.total_mastery_events, per_agent);
    }
}
