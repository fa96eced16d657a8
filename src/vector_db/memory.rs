// In-process vector store with brute-force similarity search
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::errors::{ClinicalError, Result};
use crate::providers::{DeleteOutcome, IndexSpec, Metric, VectorIndex, VectorStore};
use crate::types::{CaseRecord, RetrievalResult};

/// Vector store kept entirely in memory.
///
/// Exact search over every record; adequate for tests and small offline
/// corpora. Index handles share storage with the store, so records upserted
/// through one handle are visible through any other.
#[derive(Default)]
pub struct InMemoryVectorStore {
    indexes: RwLock<HashMap<String, Arc<InMemoryIndex>>>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn create_index(&self, spec: &IndexSpec) -> Result<()> {
        let mut indexes = self.indexes.write().await;
        if indexes.contains_key(&spec.name) {
            return Err(ClinicalError::vector_store(format!(
                "Index {} already exists",
                spec.name
            )));
        }
        indexes.insert(spec.name.clone(), Arc::new(InMemoryIndex::new(spec)));
        Ok(())
    }

    async fn delete_index_if_exists(&self, name: &str) -> Result<DeleteOutcome> {
        let removed = self.indexes.write().await.remove(name);
        Ok(match removed {
            Some(_) => DeleteOutcome::Deleted,
            None => DeleteOutcome::NotFound,
        })
    }

    async fn open_index(&self, name: &str) -> Result<Arc<dyn VectorIndex>> {
        let indexes = self.indexes.read().await;
        let index = indexes
            .get(name)
            .ok_or_else(|| ClinicalError::IndexNotFound(name.to_string()))?;
        Ok(Arc::clone(index) as Arc<dyn VectorIndex>)
    }
}

/// One in-memory index
pub struct InMemoryIndex {
    name: String,
    dimension: usize,
    metric: Metric,
    records: RwLock<HashMap<String, CaseRecord>>,
}

impl InMemoryIndex {
    fn new(spec: &IndexSpec) -> Self {
        Self {
            name: spec.name.clone(),
            dimension: spec.dimension,
            metric: spec.metric,
            records: RwLock::new(HashMap::new()),
        }
    }

    fn check_dimension(&self, actual: usize) -> Result<()> {
        if actual != self.dimension {
            return Err(ClinicalError::DimensionMismatch {
                expected: self.dimension,
                actual,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl VectorIndex for InMemoryIndex {
    fn name(&self) -> &str {
        &self.name
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn upsert(&self, batch: Vec<CaseRecord>) -> Result<()> {
        for record in &batch {
            self.check_dimension(record.vector.len())?;
        }

        let mut records = self.records.write().await;
        for record in batch {
            records.insert(record.id.clone(), record);
        }
        Ok(())
    }

    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<RetrievalResult>> {
        self.check_dimension(vector.len())?;

        let records = self.records.read().await;
        let mut scored: Vec<RetrievalResult> = records
            .values()
            .map(|record| RetrievalResult {
                id: record.id.clone(),
                similarity: similarity(self.metric, vector, &record.vector),
                metadata: record.metadata.clone(),
            })
            .collect();

        // Ties fall back to id order so repeated queries are stable
        scored.sort_by(|a, b| {
            b.similarity
                .total_cmp(&a.similarity)
                .then_with(|| a.id.cmp(&b.id))
        });
        scored.truncate(top_k);
        Ok(scored)
    }
}

/// Higher is more similar for every metric
fn similarity(metric: Metric, a: &[f32], b: &[f32]) -> f32 {
    match metric {
        Metric::Cosine => cosine_similarity(a, b),
        Metric::Dot => a.iter().zip(b).map(|(x, y)| x * y).sum(),
        Metric::Euclid => {
            let dist: f32 = a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum::<f32>().sqrt();
            -dist
        }
    }
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CaseMetadata;

    fn record(id: &str, vector: Vec<f32>) -> CaseRecord {
        CaseRecord {
            id: id.to_string(),
            vector,
            metadata: CaseMetadata {
                text: format!("text {}", id),
                ..Default::default()
            },
        }
    }

    async fn store_with_index() -> (InMemoryVectorStore, Arc<dyn VectorIndex>) {
        let store = InMemoryVectorStore::new();
        store.create_index(&IndexSpec::cosine("cases", 2)).await.unwrap();
        let index = store.open_index("cases").await.unwrap();
        (store, index)
    }

    #[tokio::test]
    async fn test_query_orders_by_descending_similarity() {
        let (_store, index) = store_with_index().await;
        index
            .upsert(vec![
                record("far", vec![0.0, 1.0]),
                record("near", vec![1.0, 0.1]),
                record("exact", vec![1.0, 0.0]),
            ])
            .await
            .unwrap();

        let results = index.query(&[1.0, 0.0], 5).await.unwrap();
        let ids: Vec<&str> = results.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["exact", "near", "far"]);
        assert!((results[0].similarity - 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_query_truncates_to_top_k() {
        let (_store, index) = store_with_index().await;
        let batch = (0..8).map(|i| record(&format!("c{}", i), vec![1.0, i as f32])).collect();
        index.upsert(batch).await.unwrap();

        let results = index.query(&[1.0, 0.0], 5).await.unwrap();
        assert_eq!(results.len(), 5);
    }

    #[tokio::test]
    async fn test_upsert_replaces_by_id() {
        let (_store, index) = store_with_index().await;
        index.upsert(vec![record("a", vec![1.0, 0.0])]).await.unwrap();
        index.upsert(vec![record("a", vec![0.0, 1.0])]).await.unwrap();

        let results = index.query(&[0.0, 1.0], 5).await.unwrap();
        assert_eq!(results.len(), 1);
        assert!((results[0].similarity - 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_large_upsert_keeps_last_write_per_id() {
        let (_store, index) = store_with_index().await;
        let batch: Vec<CaseRecord> = (0..20_000)
            .map(|i| record(&format!("c{}", i % 10_000), vec![1.0, (i / 10_000) as f32]))
            .collect();
        index.upsert(batch).await.unwrap();

        let results = index.query(&[0.0, 1.0], 20_000).await.unwrap();
        assert_eq!(results.len(), 10_000);
        // Second half of the batch carried [1, 1]
        assert!(results.iter().all(|r| (r.similarity - std::f32::consts::FRAC_1_SQRT_2).abs() < 1e-6));
    }

    #[tokio::test]
    async fn test_dimension_mismatch_rejected() {
        let (_store, index) = store_with_index().await;
        let err = index.upsert(vec![record("a", vec![1.0, 0.0, 0.0])]).await.unwrap_err();
        assert!(matches!(err, ClinicalError::DimensionMismatch { expected: 2, actual: 3 }));
    }

    #[tokio::test]
    async fn test_delete_if_exists_is_typed() {
        let (store, _index) = store_with_index().await;
        assert_eq!(store.delete_index_if_exists("cases").await.unwrap(), DeleteOutcome::Deleted);
        assert_eq!(store.delete_index_if_exists("cases").await.unwrap(), DeleteOutcome::NotFound);
        assert!(matches!(
            store.open_index("cases").await,
            Err(ClinicalError::IndexNotFound(_))
        ));
    }

    #[test]
    fn test_cosine_zero_vector() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }
}
