// Qdrant-backed vector store for the case corpus
use async_trait::async_trait;
use qdrant_client::{
    client::QdrantClient,
    qdrant::{
        value::Kind, vectors_config::Config, with_payload_selector::SelectorOptions,
        CreateCollection, Datatype, Distance, PointStruct, SearchPoints, Value as QdrantValue,
        VectorParams, VectorsConfig, WithPayloadSelector,
    },
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::errors::{ClinicalError, Result};
use crate::providers::{DeleteOutcome, IndexSpec, Metric, Precision, VectorIndex, VectorStore};
use crate::types::{CaseMetadata, CaseRecord, RetrievalResult, UNKNOWN_SOURCE};

/// Default Qdrant gRPC endpoint
pub const DEFAULT_QDRANT_URL: &str = "http://localhost:6334";

/// Payload key holding the original case id
const CASE_ID_KEY: &str = "case_id";

/// Vector store client backed by a Qdrant server
pub struct QdrantVectorStore {
    client: Arc<QdrantClient>,
    url: String,
}

impl QdrantVectorStore {
    /// Connect to a Qdrant server. No request is issued until first use.
    pub fn connect(url: &str) -> Result<Self> {
        let client = QdrantClient::from_url(url)
            .build()
            .map_err(|e| ClinicalError::vector_store(format!("Failed to create Qdrant client: {}", e)))?;

        Ok(Self {
            client: Arc::new(client),
            url: url.to_string(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Check if Qdrant answers a collections listing
    pub async fn health_check(&self) -> bool {
        self.client.list_collections().await.is_ok()
    }

    async fn exists(&self, name: &str) -> Result<bool> {
        let collections = self.client
            .list_collections()
            .await
            .map_err(|e| ClinicalError::vector_store(format!("Failed to list collections: {}", e)))?;

        Ok(collections.collections.iter().any(|c| c.name == name))
    }

    async fn collection_dimension(&self, name: &str) -> Result<usize> {
        let info = self.client
            .collection_info(name)
            .await
            .map_err(|e| ClinicalError::vector_store(format!("Failed to get collection info: {}", e)))?;

        info.result
            .and_then(|r| r.config)
            .and_then(|c| c.params)
            .and_then(|p| p.vectors_config)
            .and_then(|v| v.config)
            .and_then(|config| match config {
                Config::Params(params) => Some(params.size as usize),
                _ => None,
            })
            .ok_or_else(|| {
                ClinicalError::vector_store(format!("Collection {} has no single vector config", name))
            })
    }
}

#[async_trait]
impl VectorStore for QdrantVectorStore {
    async fn create_index(&self, spec: &IndexSpec) -> Result<()> {
        let distance = match spec.metric {
            Metric::Cosine => Distance::Cosine,
            Metric::Dot => Distance::Dot,
            Metric::Euclid => Distance::Euclid,
        };
        let datatype = match spec.precision {
            Precision::Float32 => Datatype::Float32,
            Precision::Float16 => Datatype::Float16,
        };

        self.client
            .create_collection(&CreateCollection {
                collection_name: spec.name.clone(),
                vectors_config: Some(VectorsConfig {
                    config: Some(Config::Params(VectorParams {
                        size: spec.dimension as u64,
                        distance: distance.into(),
                        datatype: Some(datatype.into()),
                        ..Default::default()
                    })),
                }),
                ..Default::default()
            })
            .await
            .map_err(|e| {
                ClinicalError::vector_store(format!("Failed to create collection {}: {}", spec.name, e))
            })?;

        info!(index = %spec.name, dimension = spec.dimension, "created index");
        Ok(())
    }

    async fn delete_index_if_exists(&self, name: &str) -> Result<DeleteOutcome> {
        if !self.exists(name).await? {
            return Ok(DeleteOutcome::NotFound);
        }

        self.client
            .delete_collection(name)
            .await
            .map_err(|e| ClinicalError::vector_store(format!("Failed to delete collection {}: {}", name, e)))?;

        info!(index = name, "deleted existing index");
        Ok(DeleteOutcome::Deleted)
    }

    async fn open_index(&self, name: &str) -> Result<Arc<dyn VectorIndex>> {
        if !self.exists(name).await? {
            return Err(ClinicalError::IndexNotFound(name.to_string()));
        }
        let dimension = self.collection_dimension(name).await?;

        Ok(Arc::new(QdrantIndex {
            client: Arc::clone(&self.client),
            name: name.to_string(),
            dimension,
        }))
    }
}

/// Handle to one Qdrant collection
pub struct QdrantIndex {
    client: Arc<QdrantClient>,
    name: String,
    dimension: usize,
}

#[async_trait]
impl VectorIndex for QdrantIndex {
    fn name(&self) -> &str {
        &self.name
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn upsert(&self, records: Vec<CaseRecord>) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        let count = records.len();
        let points = records
            .into_iter()
            .map(|record| {
                if record.vector.len() != self.dimension {
                    return Err(ClinicalError::DimensionMismatch {
                        expected: self.dimension,
                        actual: record.vector.len(),
                    });
                }
                let payload = metadata_to_payload(&record.id, record.metadata);
                Ok(PointStruct::new(point_uuid(&record.id), record.vector, payload))
            })
            .collect::<Result<Vec<_>>>()?;

        self.client
            .upsert_points_blocking(&self.name, None, points, None)
            .await
            .map_err(|e| ClinicalError::vector_store(format!("Failed to upsert points: {}", e)))?;

        debug!(index = %self.name, count, "upserted batch");
        Ok(())
    }

    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<RetrievalResult>> {
        let search_result = self.client
            .search_points(&SearchPoints {
                collection_name: self.name.clone(),
                vector: vector.to_vec(),
                limit: top_k as u64,
                with_payload: Some(WithPayloadSelector {
                    selector_options: Some(SelectorOptions::Enable(true)),
                }),
                ..Default::default()
            })
            .await
            .map_err(|e| ClinicalError::vector_store(format!("Failed to search points: {}", e)))?;

        let results = search_result
            .result
            .into_iter()
            .map(|point| {
                let mut payload = point.payload;
                let id = payload
                    .remove(CASE_ID_KEY)
                    .and_then(|v| qdrant_value_to_string(&v))
                    .unwrap_or_default();
                RetrievalResult {
                    id,
                    similarity: point.score,
                    metadata: payload_to_metadata(&payload),
                }
            })
            .collect();

        Ok(results)
    }
}

/// Case ids such as `medqa_12` are not valid Qdrant point ids, so each maps
/// to a stable UUIDv5. Re-upserting the same case id replaces the point.
pub fn point_uuid(case_id: &str) -> String {
    Uuid::new_v5(&Uuid::NAMESPACE_OID, case_id.as_bytes()).to_string()
}

fn metadata_to_payload(case_id: &str, metadata: CaseMetadata) -> HashMap<String, QdrantValue> {
    let mut payload = HashMap::new();
    payload.insert(CASE_ID_KEY.to_string(), QdrantValue::from(case_id.to_string()));
    payload.insert("text".to_string(), QdrantValue::from(metadata.text));
    payload.insert("question".to_string(), QdrantValue::from(metadata.question));
    payload.insert("answer".to_string(), QdrantValue::from(metadata.answer));
    payload.insert("source".to_string(), QdrantValue::from(metadata.source));
    payload
}

fn payload_to_metadata(payload: &HashMap<String, QdrantValue>) -> CaseMetadata {
    let field = |key: &str| payload.get(key).and_then(qdrant_value_to_string);

    CaseMetadata {
        text: field("text").unwrap_or_default(),
        question: field("question").unwrap_or_default(),
        answer: field("answer").unwrap_or_default(),
        source: field("source").unwrap_or_else(|| UNKNOWN_SOURCE.to_string()),
    }
}

fn qdrant_value_to_string(value: &QdrantValue) -> Option<String> {
    value.kind.as_ref().and_then(|kind| match kind {
        Kind::StringValue(s) => Some(s.clone()),
        Kind::IntegerValue(i) => Some(i.to_string()),
        Kind::DoubleValue(f) => Some(f.to_string()),
        _ => None,
    })
}
