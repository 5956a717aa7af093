//! Configuration for the Civilis diffusion engine.
//!
//! Maps directly to `civilis.toml`. Every field has a default, so an
//! empty document is a valid configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CivilisError, Result};
use crate::network::NetworkType;

/// Environment variable that overrides `embedding.model`.
pub const ENV_EMBEDDING_MODEL: &str = "CIVILIS_EMBEDDING_MODEL";
/// Environment variable that overrides `embedding.cache_dir`.
pub const ENV_MODEL_CACHE: &str = "CIVILIS_MODEL_CACHE";

/// Top-level Civilis configuration, loadable from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CivilisConfig {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,
    /// Population, rounds, topology and seed.
    #[serde(default)]
    pub simulation: SimulationConfig,
    /// Per-agent memory limits and mastery thresholds.
    #[serde(default)]
    pub memory: MemoryConfig,
    /// Embedding backend selection.
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    /// Statements exchanged between agents.
    #[serde(default)]
    pub knowledge: KnowledgeConfig,
}

impl CivilisConfig {
    /// Load configuration from a TOML string.
    ///
    /// # Errors
    /// Returns `CivilisError::InvalidConfiguration` if the TOML is invalid.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str).map_err(|e| CivilisError::InvalidConfiguration(e.to_string()))
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Apply `CIVILIS_EMBEDDING_MODEL` / `CIVILIS_MODEL_CACHE` from the
    /// process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary key lookup.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(model) = lookup(ENV_EMBEDDING_MODEL).filter(|m| !m.is_empty()) {
            self.embedding.model = model;
        }
        if let Some(cache) = lookup(ENV_MODEL_CACHE).filter(|c| !c.is_empty()) {
            self.embedding.cache_dir = Some(PathBuf::from(cache));
        }
    }

    /// Check every section.
    ///
    /// # Errors
    /// Returns `CivilisError::InvalidConfiguration` naming the first bad value.
    pub fn validate(&self) -> Result<()> {
        self.simulation.validate()?;
        self.memory.validate()?;
        self.embedding.validate()?;
        self.knowledge.validate()
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// General system settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Population and round settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Number of agents (and network nodes).
    #[serde(default = "default_10")]
    pub num_agents: usize,
    /// Number of diffusion rounds.
    #[serde(default = "default_100")]
    pub rounds: usize,
    /// Network topology.
    #[serde(default)]
    pub network_type: NetworkType,
    /// Seed for the graph and every random draw. Drawn at random when absent.
    #[serde(default)]
    pub seed: Option<u64>,
    /// Fraction of the population that speaks each round.
    #[serde(default = "default_speaker_fraction")]
    pub speaker_fraction: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            num_agents: 10,
            rounds: 100,
            network_type: NetworkType::default(),
            seed: None,
            speaker_fraction: 0.3,
        }
    }
}

impl SimulationConfig {
    /// Config for `num_agents` agents over `rounds` rounds with a fixed seed.
    #[must_use]
    pub fn new(num_agents: usize, rounds: usize, seed: u64) -> Self {
        Self {
            num_agents,
            rounds,
            seed: Some(seed),
            ..Self::default()
        }
    }

    /// # Errors
    /// Returns `CivilisError::InvalidConfiguration` for an empty population,
    /// zero rounds or a speaker fraction outside (0, 1].
    pub fn validate(&self) -> Result<()> {
        if self.num_agents < 1 {
            return Err(CivilisError::InvalidConfiguration(format!(
                "num_agents must be at least 1 (got {})",
                self.num_agents
            )));
        }
        if self.rounds < 1 {
            return Err(CivilisError::InvalidConfiguration(format!(
                "rounds must be at least 1 (got {})",
                self.rounds
            )));
        }
        if !(self.speaker_fraction > 0.0 && self.speaker_fraction <= 1.0) {
            return Err(CivilisError::InvalidConfiguration(format!(
                "speaker_fraction must be in (0, 1] (got {})",
                self.speaker_fraction
            )));
        }
        Ok(())
    }
}

/// Per-agent memory capacity and mastery configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Hard cap on insights per agent.
    #[serde(default = "default_200")]
    pub max_insights: usize,
    /// Strength at which a near-exact match counts as mastered.
    #[serde(default = "default_4")]
    pub insight_threshold: u32,
    /// Similarity cutoff for the mastery check.
    #[serde(default = "default_mastery_threshold")]
    pub mastery_threshold: f32,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            max_insights: 200,
            insight_threshold: 4,
            mastery_threshold: 0.95,
        }
    }
}

impl MemoryConfig {
    /// # Errors
    /// Returns `CivilisError::InvalidConfiguration` for a zero capacity or
    /// threshold, or a similarity cutoff outside [-1, 1].
    pub fn validate(&self) -> Result<()> {
        if self.max_insights < 1 {
            return Err(CivilisError::InvalidConfiguration(
                "max_insights must be at least 1".to_string(),
            ));
        }
        if self.insight_threshold < 1 {
            return Err(CivilisError::InvalidConfiguration(
                "insight_threshold must be at least 1".to_string(),
            ));
        }
        if !(-1.0..=1.0).contains(&self.mastery_threshold) {
            return Err(CivilisError::InvalidConfiguration(format!(
                "mastery_threshold must be in [-1, 1] (got {})",
                self.mastery_threshold
            )));
        }
        Ok(())
    }
}

/// Embedding backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Backend: "hash", "stub", "onnx".
    #[serde(default = "default_backend")]
    pub backend: String,
    /// Model name or local path (ONNX backend only).
    #[serde(default = "default_embedding_model")]
    pub model: String,
    /// Embedding vector dimensions (hash and stub backends).
    #[serde(default = "default_384")]
    pub dimensions: usize,
    /// Model download cache directory.
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            backend: "hash".to_string(),
            model: "sentence-transformers/all-MiniLM-L6-v2".to_string(),
            dimensions: 384,
            cache_dir: None,
        }
    }
}

impl EmbeddingConfig {
    /// # Errors
    /// Returns `CivilisError::InvalidConfiguration` for zero dimensions.
    pub fn validate(&self) -> Result<()> {
        if self.dimensions < 1 {
            return Err(CivilisError::InvalidConfiguration(
                "embedding dimensions must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// The statements agents start with and pass around.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeConfig {
    /// Common knowledge every agent is seeded with.
    #[serde(default = "default_common_knowledge")]
    pub common: Vec<String>,
    /// The one statement nobody starts with.
    #[serde(default = "default_exploratory")]
    pub exploratory: String,
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            common: default_common_knowledge(),
            exploratory: default_exploratory(),
        }
    }
}

impl KnowledgeConfig {
    /// Common knowledge followed by the exploratory statement.
    #[must_use]
    pub fn message_pool(&self) -> Vec<String> {
        let mut pool = self.common.clone();
        pool.push(self.exploratory.clone());
        pool
    }

    /// # Errors
    /// Returns `CivilisError::InvalidConfiguration` when no common knowledge is set.
    pub fn validate(&self) -> Result<()> {
        if self.common.is_empty() {
            return Err(CivilisError::InvalidConfiguration(
                "knowledge.common must contain at least one statement".to_string(),
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Serde default helpers
// ---------------------------------------------------------------------------

fn default_log_level() -> String { "info".to_string() }
fn default_backend() -> String { "hash".to_string() }
fn default_embedding_model() -> String { "sentence-transformers/all-MiniLM-L6-v2".to_string() }
fn default_exploratory() -> String { "The stars may guide travelers across the sea.".to_string() }
fn default_common_knowledge() -> Vec<String> {
    vec![
        "Fire is dangerous.".to_string(),
        "Water is essential for life.".to_string(),
        "Sharing food builds trust.".to_string(),
    ]
}
fn default_speaker_fraction() -> f64 { 0.3 }
fn default_mastery_threshold() -> f32 { 0.95 }
fn default_4() -> u32 { 4 }
fn default_10() -> usize { 10 }
fn default_100() -> usize { 100 }
fn default_200() -> usize { 200 }
fn default_384() -> usize { 384 }

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
