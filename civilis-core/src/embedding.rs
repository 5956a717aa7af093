//! Vector embedding abstraction layer.
//!
//! Provides a trait-based interface for turning statements into vectors
//! used by [`VectorMemory`](crate::memory::VectorMemory) for deduplicated
//! similarity search.
//!
//! The production implementation uses ONNX Runtime (via `fastembed-rs`)
//! with the `all-MiniLM-L6-v2` model, behind the `onnx` feature.  A
//! deterministic feature-hashing provider is the default and is what the
//! tests run against.

use std::sync::Arc;

use crate::config::EmbeddingConfig;
use crate::error::{CivilisError, Result};
use crate::types::Embedding;

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Generate vector embeddings from text.
///
/// Implementations must be deterministic for identical input within one
/// process and must always return `dimensions()` components.
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single text string.
    ///
    /// # Errors
    ///
    /// Returns [`CivilisError::EmbeddingUnavailable`] if the model fails to
    /// produce an embedding.
    fn embed(&self, text: &str) -> Result<Embedding>;

    /// Embed a batch of texts.
    ///
    /// Default implementation calls `embed` in a loop.
    ///
    /// # Errors
    ///
    /// Returns an error if any embedding in the batch fails.
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>> {
        texts.iter().map(|t| self.embed(t)).collect()
    }

    /// The dimensionality of embeddings produced by this provider.
    fn dimensions(&self) -> usize;

    /// A human-readable name for the model (e.g. `"all-MiniLM-L6-v2"`).
    fn model_name(&self) -> &str;
}

// ---------------------------------------------------------------------------
// Cosine similarity
// ---------------------------------------------------------------------------

/// Compute the cosine similarity between two embedding vectors.
///
/// Returns a value in \[-1.0, 1.0\].  Returns `0.0` if either vector
/// has zero magnitude or the dimensions differ.
#[must_use]
pub fn cosine_similarity(a: &Embedding, b: &Embedding) -> f32 {
    checked_similarity(a, b).unwrap_or(0.0)
}

/// Cosine similarity, or `None` when it is undefined: either vector has
/// zero magnitude or the dimensions differ.
///
/// Retrieval uses this so that undefined pairs never pass a threshold.
#[must_use]
#[allow(clippy::float_cmp)]
pub fn checked_similarity(a: &Embedding, b: &Embedding) -> Option<f32> {
    if a.0.len() != b.0.len() {
        return None;
    }

    let mut dot = 0.0_f32;
    let mut mag_a = 0.0_f32;
    let mut mag_b = 0.0_f32;

    for (x, y) in a.0.iter().zip(b.0.iter()) {
        dot += x * y;
        mag_a += x * x;
        mag_b += y * y;
    }

    if mag_a == 0.0 || mag_b == 0.0 {
        return None;
    }

    Some(dot / (mag_a.sqrt() * mag_b.sqrt()))
}

// ---------------------------------------------------------------------------
// Feature-hashing provider (default)
// ---------------------------------------------------------------------------

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

fn fnv1a(bytes: &[u8]) -> u64 {
    bytes
        .iter()
        .fold(FNV_OFFSET, |hash, b| (hash ^ u64::from(*b)).wrapping_mul(FNV_PRIME))
}

/// Bag-of-words embedding via signed feature hashing.
///
/// Each lower-cased alphanumeric token lands in one of `dimensions`
/// buckets with a sign taken from its hash, and the result is
/// L2-normalised.  Identical text always yields the identical vector,
/// across processes and platforms, and statements sharing words score a
/// positive similarity.  Text without any token embeds to the zero vector.
pub struct HashEmbeddingProvider {
    dims: usize,
}

impl HashEmbeddingProvider {
    /// Create a new hashing provider with the given dimensionality.
    #[must_use]
    pub fn new(dimensions: usize) -> Self {
        Self {
            dims: dimensions.max(1),
        }
    }
}

impl Default for HashEmbeddingProvider {
    fn default() -> Self {
        Self::new(384)
    }
}

impl EmbeddingProvider for HashEmbeddingProvider {
    fn embed(&self, text: &str) -> Result<Embedding> {
        let mut raw = vec![0.0_f32; self.dims];
        let lowered = text.to_lowercase();

        for token in lowered.split(|c: char| !c.is_alphanumeric()).filter(|t| !t.is_empty()) {
            let hash = fnv1a(token.as_bytes());
            #[allow(clippy::cast_possible_truncation)]
            let bucket = (hash % self.dims as u64) as usize;
            let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
            raw[bucket] += sign;
        }

        let mag: f32 = raw.iter().map(|x| x * x).sum::<f32>().sqrt();
        if mag < f32::EPSILON {
            return Ok(Embedding(raw));
        }
        Ok(Embedding(raw.into_iter().map(|x| x / mag).collect()))
    }

    fn dimensions(&self) -> usize {
        self.dims
    }

    fn model_name(&self) -> &str {
        "feature-hash"
    }
}

// ---------------------------------------------------------------------------
// Stub / Zero-cost provider
// ---------------------------------------------------------------------------

/// A stub embedding provider that returns zero-vectors.
///
/// Every similarity against a zero vector is 0, so queries with a
/// positive threshold never match.
pub struct StubEmbeddingProvider {
    dims: usize,
}

impl StubEmbeddingProvider {
    /// Create a new stub provider with the given dimensionality.
    #[must_use]
    pub fn new(dimensions: usize) -> Self {
        Self { dims: dimensions }
    }
}

impl Default for StubEmbeddingProvider {
    fn default() -> Self {
        Self::new(384)
    }
}

impl EmbeddingProvider for StubEmbeddingProvider {
    fn embed(&self, _text: &str) -> Result<Embedding> {
        Ok(Embedding(vec![0.0; self.dims]))
    }

    fn dimensions(&self) -> usize {
        self.dims
    }

    fn model_name(&self) -> &str {
        "stub-zero-vector"
    }
}

// ---------------------------------------------------------------------------
// ONNX provider
// ---------------------------------------------------------------------------

/// Production embedding provider: `all-MiniLM-L6-v2` through ONNX Runtime.
///
/// The model (~80 MB) is downloaded into `cache_dir` on first use.
#[cfg(feature = "onnx")]
pub struct OnnxEmbeddingProvider {
    model: parking_lot::Mutex<fastembed::TextEmbedding>,
    name: String,
}

#[cfg(feature = "onnx")]
impl OnnxEmbeddingProvider {
    /// Output width of all-MiniLM-L6-v2.
    pub const DIMENSIONS: usize = 384;

    /// Load the ONNX model named by `config.model`.
    ///
    /// # Errors
    ///
    /// Returns [`CivilisError::InvalidConfiguration`] for a model other than
    /// all-MiniLM-L6-v2 and [`CivilisError::EmbeddingUnavailable`] if the
    /// model cannot be loaded.
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};

        if !config.model.ends_with("all-MiniLM-L6-v2") {
            return Err(CivilisError::InvalidConfiguration(format!(
                "Unsupported ONNX embedding model: {}",
                config.model
            )));
        }

        let mut options =
            InitOptions::new(EmbeddingModel::AllMiniLML6V2).with_show_download_progress(false);
        if let Some(dir) = &config.cache_dir {
            options = options.with_cache_dir(dir.clone());
        }

        let model = TextEmbedding::try_new(options).map_err(|e| {
            CivilisError::EmbeddingUnavailable(format!("failed to load {}: {e}", config.model))
        })?;
        tracing::info!(model = %config.model, dims = Self::DIMENSIONS, "Embedding model loaded");

        Ok(Self {
            model: parking_lot::Mutex::new(model),
            name: config.model.clone(),
        })
    }
}

#[cfg(feature = "onnx")]
impl EmbeddingProvider for OnnxEmbeddingProvider {
    fn embed(&self, text: &str) -> Result<Embedding> {
        let mut vectors = self
            .model
            .lock()
            .embed(vec![text], None)
            .map_err(|e| CivilisError::EmbeddingUnavailable(e.to_string()))?;
        vectors.pop().map(Embedding).ok_or_else(|| {
            CivilisError::EmbeddingUnavailable("model returned no embedding".to_string())
        })
    }

    fn dimensions(&self) -> usize {
        Self::DIMENSIONS
    }

    fn model_name(&self) -> &str {
        &self.name
    }
}

// ---------------------------------------------------------------------------
// Factory
// ---------------------------------------------------------------------------

/// Build the embedding provider selected by `config.backend`.
///
/// Call this once at the composition root and share the result.
///
/// # Errors
///
/// Returns [`CivilisError::InvalidConfiguration`] for an unknown backend
/// name, or for `"onnx"` when built without the `onnx` feature.
pub fn embedding_backend(config: &EmbeddingConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    config.validate()?;
    match config.backend.as_str() {
        "hash" => Ok(Arc::new(HashEmbeddingProvider::new(config.dimensions))),
        "stub" => Ok(Arc::new(StubEmbeddingProvider::new(config.dimensions))),
        "onnx" => onnx_backend(config),
        other => Err(CivilisError::InvalidConfiguration(format!(
            "Unsupported embedding backend: {other}"
        ))),
    }
}

#[cfg(feature = "onnx")]
fn onnx_backend(config: &EmbeddingConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    Ok(Arc::new(OnnxEmbeddingProvider::new(config)?))
}

#[cfg(not(feature = "onnx"))]
fn onnx_backend(_config: &EmbeddingConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    Err(CivilisError::InvalidConfiguration(
        "the onnx embedding backend requires building with `--features onnx`".to_string(),
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_identical_vectors() {
        let a = Embedding(vec![1.0, 0.0, 0.0]);
        let b = Embedding(vec![1.0, 0.0, 0.0]);
        let sim = cosine_similarity(&a, &b);
        assert!((sim - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_orthogonal_vectors() {
        let a = Embedding(vec![1.0, 0.0]);
        let b = Embedding(vec![0.0, 1.0]);
        assert!(cosine_similarity(&a, &b).abs() < 1e-6);
    }

    #[test]
    fn cosine_opposite_vectors() {
        let a = Embedding(vec![1.0, 0.0]);
        let b = Embedding(vec![-1.0, 0.0]);
        assert!((cosine_similarity(&a, &b) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_zero_vector_is_zero() {
        let a = Embedding(vec![0.0, 0.0]);
        let b = Embedding(vec![1.0, 0.0]);
        assert_eq!(cosine_similarity(&a, &b), 0.0);
        assert_eq!(cosine_similarity(&a, &a), 0.0);
    }

    #[test]
    fn cosine_small_vectors_are_not_degenerate() {
        let a = Embedding(vec![1e-4, 0.0]);
        let b = Embedding(vec![1e-4, 0.0]);
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 1e-5);

        let c = Embedding(vec![0.0, 3e-5]);
        assert!(cosine_similarity(&a, &c).abs() < 1e-6);
        assert!(checked_similarity(&a, &c).is_some());
    }

    #[test]
    fn checked_similarity_undefined_cases() {
        let zero = Embedding(vec![0.0, 0.0]);
        let unit = Embedding(vec![1.0, 0.0]);
        assert_eq!(checked_similarity(&zero, &unit), None);
        assert_eq!(checked_similarity(&unit, &zero), None);
        assert_eq!(checked_similarity(&unit, &Embedding(vec![1.0, 0.0, 0.0])), None);
        assert_eq!(checked_similarity(&unit, &unit), Some(1.0));
    }

    #[test]
    fn cosine_mismatched_dimensions() {
        let a = Embedding(vec![1.0, 0.0]);
        let b = Embedding(vec![1.0, 0.0, 0.0]);
        assert_eq!(cosine_similarity(&a, &b), 0.0);
    }

    #[test]
    fn hash_provider_is_deterministic() {
        let provider = HashEmbeddingProvider::new(64);
        let a = provider.embed("Fire is dangerous.").expect("embed");
        let b = provider.embed("Fire is dangerous.").expect("embed");
        assert_eq!(a, b);
        assert_eq!(a.dimensions(), 64);
    }

    #[test]
    fn hash_provider_returns_unit_vectors() {
        let provider = HashEmbeddingProvider::new(64);
        let emb = provider.embed("Water is essential for life.").expect("embed");
        assert!((emb.norm() - 1.0).abs() < 1e-4, "got magnitude {}", emb.norm());
    }

    #[test]
    fn hash_provider_ignores_case_and_punctuation() {
        let provider = HashEmbeddingProvider::default();
        let a = provider.embed("Fire is dangerous.").expect("embed");
        let b = provider.embed("fire, is DANGEROUS").expect("embed");
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn hash_provider_related_statements_score_higher() {
        let provider = HashEmbeddingProvider::default();
        let fire = provider.embed("Fire is dangerous.").expect("embed");
        let hot = provider.embed("Fire is hot and dangerous.").expect("embed");
        let food = provider.embed("Sharing food builds trust.").expect("embed");
        assert!(cosine_similarity(&fire, &hot) > cosine_similarity(&fire, &food));
    }

    #[test]
    fn hash_provider_empty_text_is_zero_vector() {
        let provider = HashEmbeddingProvider::new(8);
        let emb = provider.embed("  ... ").expect("embed");
        assert!(emb.0.iter().all(|&x| x == 0.0));
    }

    #[test]
    fn stub_provider_returns_zeros() {
        let provider = StubEmbeddingProvider::new(4);
        let emb = provider.embed("hello").expect("embed");
        assert_eq!(emb.0.len(), 4);
        assert!(emb.0.iter().all(|&x| x == 0.0));
    }

    #[test]
    fn batch_embed_works() {
        let provider = HashEmbeddingProvider::new(8);
        let results = provider.embed_batch(&["hello", "world", "test"]).expect("batch");
        assert_eq!(results.len(), 3);
    }

    #[test]
    fn factory_builds_hash_backend() {
        let provider = embedding_backend(&EmbeddingConfig::default()).expect("backend");
        assert_eq!(provider.model_name(), "feature-hash");
        assert_eq!(provider.dimensions(), 384);
    }

    #[test]
    fn factory_rejects_unknown_backend() {
        let config = EmbeddingConfig {
            backend: "word2vec".to_string(),
            ..EmbeddingConfig::default()
        };
        assert!(matches!(
            embedding_backend(&config),
            Err(CivilisError::InvalidConfiguration(_))
        ));
    }

    #[cfg(not(feature = "onnx"))]
    #[test]
    fn factory_rejects_onnx_without_feature() {
        let config = EmbeddingConfig {
            backend: "onnx".to_string(),
            ..EmbeddingConfig::default()
        };
        assert!(matches!(
            embedding_backend(&config),
            Err(CivilisError::InvalidConfiguration(_))
        ));
    }
}
