// Retrieval: embed the hypothesis and query the vector index
use std::sync::Arc;
use tracing::debug;

use crate::errors::{ClinicalError, Result};
use crate::providers::{EmbeddingProvider, VectorIndex};
use crate::types::RetrievalResult;

/// Number of neighbours fetched per query
pub const TOP_K: usize = 5;

/// Embeds hypothesis text and fetches the nearest indexed cases.
///
/// Every call is a fresh embed + query round trip; nothing is cached.
pub struct Retriever {
    embedder: Arc<dyn EmbeddingProvider>,
    top_k: usize,
}

impl Retriever {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self::with_top_k(embedder, TOP_K)
    }

    pub fn with_top_k(embedder: Arc<dyn EmbeddingProvider>, top_k: usize) -> Self {
        Self { embedder, top_k }
    }

    /// Results keep the index's rank order (descending similarity). The
    /// sequence may be empty or shorter than `top_k`.
    pub async fn retrieve(
        &self,
        hypothesis: &str,
        index: &dyn VectorIndex,
    ) -> Result<Vec<RetrievalResult>> {
        let embedder = Arc::clone(&self.embedder);
        let text = hypothesis.to_string();
        let vector = tokio::task::spawn_blocking(move || embedder.embed(&text))
            .await
            .map_err(|e| ClinicalError::embedding(format!("Embedding task failed: {}", e)))??;

        if vector.len() != index.dimension() {
            return Err(ClinicalError::DimensionMismatch {
                expected: index.dimension(),
                actual: vector.len(),
            });
        }

        let results = index.query(&vector, self.top_k).await?;
        debug!(
            index = index.name(),
            hits = results.len(),
            best = results.first().map(|r| r.similarity),
            "retrieved cases"
        );
        Ok(results)
    }
}
