//! Embedding provider trait for generating vector embeddings from text.

use async_trait::async_trait;

use crate::error::Result;

/// A provider that generates vector embeddings from text input.
///
/// Implementations wrap specific embedding backends (Ollama, OpenAI, etc.)
/// behind a unified async interface. The default
/// [`embed_batch`](EmbeddingProvider::embed_batch) implementation calls
/// [`embed`](EmbeddingProvider::embed) sequentially; backends that support
/// native batching should override it.
///
/// Every vector returned by one provider instance must have the same length.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate an embedding vector for a single text input.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embedding vectors for a batch of text inputs.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text).await?);
        }
        Ok(results)
    }

    /// Short provider name used in logs and error messages.
    fn name(&self) -> &str {
        "embedding"
    }
}

/// Deterministic bag-of-words embeddings that need no model or network.
///
/// Each lower-cased alphanumeric token is hashed (FNV-1a) into one of
/// `dimensions` buckets and the resulting count vector is L2-normalised, so
/// texts sharing words have a positive cosine similarity. Useful for tests,
/// demos, and offline smoke runs.
#[derive(Debug, Clone)]
pub struct HashEmbeddingProvider {
    dimensions: usize,
}

impl HashEmbeddingProvider {
    /// Create a provider producing vectors of the given length.
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions: dimensions.max(1) }
    }

    /// Length of every vector this provider returns.
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn bucket(&self, token: &str) -> usize {
        let hash = token
            .bytes()
            .fold(0xcbf2_9ce4_8422_2325_u64, |acc, b| (acc ^ u64::from(b)).wrapping_mul(0x100_0000_01b3));
        (hash % self.dimensions as u64) as usize
    }

    /// Embed synchronously; the async trait methods delegate here.
    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];
        let lowered = text.to_lowercase();
        for token in lowered.split(|c: char| !c.is_alphanumeric()).filter(|t| !t.is_empty()) {
            vector[self.bucket(token)] += 1.0;
        }
        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|x| *x /= norm);
        }
        vector
    }
}

impl Default for HashEmbeddingProvider {
    fn default() -> Self {
        Self::new(256)
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.embed_text(text))
    }

    fn name(&self) -> &str {
        "hash"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dot(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    #[test]
    fn hash_embeddings_are_deterministic_and_normalised() {
        let provider = HashEmbeddingProvider::new(64);
        let a = provider.embed_text("Where is the campus?");
        let b = provider.embed_text("where IS the campus");
        assert_eq!(a.len(), 64);
        assert_eq!(a, b);
        let norm = dot(&a, &a).sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn shared_words_score_higher() {
        let provider = HashEmbeddingProvider::default();
        let query = provider.embed_text("placement officer");
        let related = provider.embed_text("The training and placement officer is Dr. Hebri");
        let unrelated = provider.embed_text("Aeronautical engineering faculty list");
        assert!(dot(&query, &related) > dot(&query, &unrelated));
    }

    #[test]
    fn empty_text_is_zero_vector() {
        let provider = HashEmbeddingProvider::new(8);
        assert!(provider.embed_text("  ...  ").iter().all(|x| *x == 0.0));
    }

    #[tokio::test]
    async fn default_batch_embeds_each_text() {
        let provider = HashEmbeddingProvider::new(16);
        let batch = provider.embed_batch(&["one", "two", "three"]).await.unwrap();
        assert_eq!(batch.len(), 3);
        assert_eq!(batch[1], provider.embed_text("two"));
    }
}
