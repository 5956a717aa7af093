//! Social network generation.
//!
//! Builds the undirected graph that messages travel along.  Two
//! topologies are supported, both driven entirely by a `u64` seed:
//!
//! - **Small world**: Watts–Strogatz: a ring lattice where every node
//!   links to its 2 nearest neighbours on each side (degree 4), then each
//!   lattice edge is rewired to a uniformly chosen node with probability
//!   0.2.
//! - **Random**: Erdős–Rényi G(n, m) with `m = 2n` edges, drawn by
//!   rejection sampling of node pairs.
//!
//! Both generators follow the `networkx` algorithms, but draw from a
//! `ChaCha8` stream rather than a Mersenne Twister, so edge sets are
//! reproducible per seed within this crate, not across the two.  Nodes are
//! labelled `A000, A001, …` and every lookup goes through the label.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use petgraph::graph::{NodeIndex, UnGraph};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CivilisError, Result};
use crate::types::AgentId;

/// Ring-lattice degree of the small-world topology.
pub const SMALL_WORLD_DEGREE: usize = 4;
/// Per-edge rewiring probability of the small-world topology.
pub const REWIRE_PROBABILITY: f64 = 0.2;
/// Edges per node in the random topology.
pub const RANDOM_EDGES_PER_NODE: usize = 2;

// ---------------------------------------------------------------------------
// Topology
// ---------------------------------------------------------------------------

/// Which generator builds the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NetworkType {
    /// Watts–Strogatz small-world graph.
    #[default]
    SmallWorld,
    /// Erdős–Rényi G(n, m) graph.
    Random,
}

impl NetworkType {
    /// Canonical configuration name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SmallWorld => "small_world",
            Self::Random => "random",
        }
    }
}

impl From<&str> for NetworkType {
    /// `"small_world"` selects the small-world generator; anything else is random.
    fn from(value: &str) -> Self {
        if value == "small_world" {
            Self::SmallWorld
        } else {
            Self::Random
        }
    }
}

impl From<String> for NetworkType {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

impl From<NetworkType> for String {
    fn from(value: NetworkType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for NetworkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Network
// ---------------------------------------------------------------------------

/// Fixed undirected graph over agent identifiers.
#[derive(Debug, Clone)]
pub struct SocialNetwork {
    graph: UnGraph<AgentId, ()>,
    index: BTreeMap<AgentId, NodeIndex>,
    topology: NetworkType,
}

impl SocialNetwork {
    /// Generate a network of `num_agents` nodes.
    ///
    /// A single agent gets an isolated node.  Populations too small for a
    /// degree-4 lattice (2–4 agents) get the complete graph, as does the
    /// random topology when `2n` edges would not fit.
    ///
    /// # Errors
    ///
    /// Returns [`CivilisError::InvalidConfiguration`] if `num_agents` is 0.
    pub fn build(num_agents: usize, topology: NetworkType, seed: u64) -> Result<Self> {
        if num_agents < 1 {
            return Err(CivilisError::InvalidConfiguration(format!(
                "a social network needs at least 1 agent (got {num_agents})"
            )));
        }

        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut graph = UnGraph::with_capacity(num_agents, num_agents * 2);
        let nodes: Vec<NodeIndex> = (0..num_agents)
            .map(|i| graph.add_node(AgentId::from_index(i, num_agents)))
            .collect();

        match topology {
            NetworkType::SmallWorld => watts_strogatz(
                &mut graph,
                &nodes,
                SMALL_WORLD_DEGREE,
                REWIRE_PROBABILITY,
                &mut rng,
            ),
            NetworkType::Random => {
                gnm_random(&mut graph, &nodes, RANDOM_EDGES_PER_NODE * num_agents, &mut rng);
            }
        }

        let index = nodes.iter().map(|&n| (graph[n].clone(), n)).collect();
        debug!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            topology = %topology,
            seed,
            "Social network built"
        );

        Ok(Self {
            graph,
            index,
            topology,
        })
    }

    /// Neighbours of `agent`, sorted by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`CivilisError::AgentNotFound`] for an unknown identifier.
    pub fn neighbors(&self, agent: &AgentId) -> Result<Vec<AgentId>> {
        let node = self
            .index
            .get(agent)
            .ok_or_else(|| CivilisError::AgentNotFound(agent.clone()))?;
        let mut out: Vec<AgentId> = self
            .graph
            .neighbors(*node)
            .map(|n| self.graph[n].clone())
            .collect();
        out.sort();
        Ok(out)
    }

    /// Every edge as an ordered `(smaller, larger)` identifier pair.
    #[must_use]
    pub fn edges(&self) -> BTreeSet<(AgentId, AgentId)> {
        self.graph
            .edge_indices()
            .filter_map(|e| self.graph.edge_endpoints(e))
            .map(|(a, b)| {
                let (a, b) = (self.graph[a].clone(), self.graph[b].clone());
                if a <= b { (a, b) } else { (b, a) }
            })
            .collect()
    }

    /// Agent identifiers in creation order.
    #[must_use]
    pub fn agent_ids(&self) -> Vec<AgentId> {
        self.graph.node_indices().map(|n| self.graph[n].clone()).collect()
    }

    /// Whether `agent` is a node of this network.
    #[must_use]
    pub fn contains(&self, agent: &AgentId) -> bool {
        self.index.contains_key(agent)
    }

    /// Number of nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Number of edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// The generator that built this network.
    #[must_use]
    pub fn topology(&self) -> NetworkType {
        self.topology
    }
}

// ---------------------------------------------------------------------------
// Generators
// ---------------------------------------------------------------------------

fn complete_graph(graph: &mut UnGraph<AgentId, ()>, nodes: &[NodeIndex]) {
    for (i, &u) in nodes.iter().enumerate() {
        for &v in &nodes[i + 1..] {
            graph.add_edge(u, v, ());
        }
    }
}

fn watts_strogatz(
    graph: &mut UnGraph<AgentId, ()>,
    nodes: &[NodeIndex],
    k: usize,
    p: f64,
    rng: &mut impl Rng,
) {
    let n = nodes.len();
    if n == 1 {
        return;
    }
    if k >= n {
        complete_graph(graph, nodes);
        return;
    }

    let half_k = k / 2;
    for j in 1..=half_k {
        for i in 0..n {
            graph.add_edge(nodes[i], nodes[(i + j) % n], ());
        }
    }

    for j in 1..=half_k {
        for i in 0..n {
            if rng.r#gen::<f64>() >= p {
                continue;
            }
            let u = nodes[i];
            let v = nodes[(i + j) % n];

            let mut w = nodes[rng.gen_range(0..n)];
            let mut saturated = false;
            while w == u || graph.contains_edge(u, w) {
                w = nodes[rng.gen_range(0..n)];
                if graph.neighbors(u).count() >= n - 1 {
                    saturated = true;
                    break;
                }
            }
            if saturated {
                continue;
            }

            if let Some(edge) = graph.find_edge(u, v) {
                graph.remove_edge(edge);
            }
            graph.add_edge(u, w, ());
        }
    }
}

fn gnm_random(
    graph: &mut UnGraph<AgentId, ()>,
    nodes: &[NodeIndex],
    m: usize,
    rng: &mut impl Rng,
) {
    let n = nodes.len();
    if n == 1 {
        return;
    }
    let max_edges = n * (n - 1) / 2;
    if m >= max_edges {
        complete_graph(graph, nodes);
        return;
    }

    let mut added = 0;
    while added < m {
        let u = nodes[rng.gen_range(0..n)];
        let v = nodes[rng.gen_range(0..n)];
        if u == v || graph.contains_edge(u, v) {
            continue;
        }
        graph.add_edge(u, v, ());
        added += 1;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
