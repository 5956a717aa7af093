//! # Civilis Core Library
//!
//! Agent-based simulation of knowledge diffusion.  A population of agents
//! sits on a fixed social network; each round a fraction of them speak to
//! one random neighbour, and listeners store what they hear in a bounded
//! semantic memory:
//!
//! - **Memory**: exact-content dedup, reinforcement counts, eviction of
//!   the weakest and least recently used insight at capacity, and cosine
//!   similarity retrieval over embedding vectors.
//! - **Agents**: a memory plus a mastery counter that fires when a freshly
//!   learned statement matches a well-reinforced insight.
//! - **Network**: Watts–Strogatz small world or Erdős–Rényi G(n, m),
//!   generated once from a seed.
//! - **Metrics**: total insights, diversity and top-5 consensus, sampled
//!   at round 1 and every tenth of the run.
//!
//! Embeddings come from a pluggable [`EmbeddingProvider`]; the default
//! feature-hashing provider needs no model files, and the `onnx` feature
//! adds a sentence-transformer backend.
//!
//! A seed fixes the network and every random draw, so two runs with the
//! same seed and a deterministic provider record identical histories.

#![deny(clippy::unwrap_used)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod agent;
pub mod config;
pub mod embedding;
pub mod error;
pub mod memory;
pub mod metrics;
pub mod network;
pub mod simulation;
pub mod types;

pub use agent::{Acknowledgement, Agent, LearnOutcome};
pub use config::CivilisConfig;
pub use embedding::{EmbeddingProvider, embedding_backend};
pub use error::{CivilisError, Result};
pub use memory::{AddOutcome, Insight, QueryMatch, VectorMemory};
pub use metrics::{PopulationMetrics, RoundSnapshot};
pub use network::{NetworkType, SocialNetwork};
pub use simulation::{DiffusionSimulation, RunSummary, SimulationState};
pub use types::*;
